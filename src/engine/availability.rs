use chrono::NaiveDateTime;
use ulid::Ulid;

use crate::model::*;

// ── Availability ─────────────────────────────────────────────────

/// First reservation that keeps `table_id` from being free over `window`.
///
/// A reservation blocks only if it is assigned to the table, is not
/// cancelled, is not `exclude`, has a parseable start time and overlaps the
/// window. Unparseable start times fail open: the record is skipped instead
/// of freezing the table.
pub fn blocking_reservation<'a>(
    reservations: &'a [Reservation],
    table_id: TableId,
    window: &Span,
    exclude: Option<Ulid>,
) -> Option<&'a Reservation> {
    reservations.iter().find(|r| {
        if !r.holds_table(table_id) || exclude == Some(r.id) {
            return false;
        }
        match r.span() {
            Some(existing) => existing.overlaps(window),
            None => {
                tracing::debug!(
                    reservation = %r.id,
                    time = %r.time,
                    "skipping reservation with unparseable start time"
                );
                false
            }
        }
    })
}

/// Whether `table_id` is free throughout
/// `[requested_start, requested_start + duration_minutes)`.
pub fn is_available(
    reservations: &[Reservation],
    table_id: TableId,
    requested_start: NaiveDateTime,
    duration_minutes: u32,
    exclude: Option<Ulid>,
) -> bool {
    let window = Span::from_minutes(requested_start, duration_minutes);
    blocking_reservation(reservations, table_id, &window, exclude).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(raw: &str) -> NaiveDateTime {
        parse_time(raw).unwrap()
    }

    fn booked(table_id: TableId, time: &str, status: ReservationStatus) -> Reservation {
        Reservation {
            id: Ulid::new(),
            contact: Contact::default(),
            party_size: 2,
            time: time.to_string(),
            duration_minutes: Some(120),
            status,
            table_id: Some(table_id),
            last_modified: t("2024-08-01 09:00"),
        }
    }

    #[test]
    fn empty_book_is_available() {
        assert!(is_available(&[], 1, t("2024-08-08 19:00"), 120, None));
    }

    #[test]
    fn overlapping_reservation_blocks() {
        let rs = vec![booked(1, "2024-08-08 18:00", ReservationStatus::Open)];
        assert!(!is_available(&rs, 1, t("2024-08-08 19:00"), 120, None));
        assert!(!is_available(&rs, 1, t("2024-08-08 17:00"), 120, None));
        // Different table is unaffected.
        assert!(is_available(&rs, 2, t("2024-08-08 19:00"), 120, None));
    }

    #[test]
    fn touching_windows_do_not_conflict() {
        // Existing 17:00–19:00; request 19:00–21:00.
        let rs = vec![booked(1, "2024-08-08 17:00", ReservationStatus::Open)];
        assert!(is_available(&rs, 1, t("2024-08-08 19:00"), 120, None));
        // Request 15:00–17:00 ends exactly when the existing one starts.
        assert!(is_available(&rs, 1, t("2024-08-08 15:00"), 120, None));
        assert!(!is_available(&rs, 1, t("2024-08-08 15:01"), 120, None));
    }

    #[test]
    fn cancelled_reservation_does_not_block() {
        let rs = vec![booked(1, "2024-08-08 19:00", ReservationStatus::Cancelled)];
        assert!(is_available(&rs, 1, t("2024-08-08 19:00"), 120, None));
    }

    #[test]
    fn seated_and_completed_still_block() {
        for status in [ReservationStatus::Seated, ReservationStatus::Completed] {
            let rs = vec![booked(1, "2024-08-08 19:00", status)];
            assert!(!is_available(&rs, 1, t("2024-08-08 20:00"), 60, None));
        }
    }

    #[test]
    fn excluded_reservation_is_ignored() {
        let r = booked(1, "2024-08-08 19:00", ReservationStatus::Open);
        let id = r.id;
        let rs = vec![r];
        assert!(!is_available(&rs, 1, t("2024-08-08 19:30"), 120, None));
        assert!(is_available(&rs, 1, t("2024-08-08 19:30"), 120, Some(id)));
    }

    #[test]
    fn unparseable_time_fails_open() {
        let rs = vec![booked(1, "someday", ReservationStatus::Open)];
        assert!(is_available(&rs, 1, t("2024-08-08 19:00"), 120, None));
    }

    #[test]
    fn missing_duration_uses_default() {
        let mut r = booked(1, "2024-08-08 19:00", ReservationStatus::Open);
        r.duration_minutes = None;
        let rs = vec![r];
        assert!(!is_available(&rs, 1, t("2024-08-08 20:59"), 30, None));
        assert!(is_available(&rs, 1, t("2024-08-08 21:00"), 30, None));
    }

    #[test]
    fn zero_duration_request() {
        let rs = vec![booked(1, "2024-08-08 19:00", ReservationStatus::Open)];
        assert!(!is_available(&rs, 1, t("2024-08-08 20:00"), 0, None));
        assert!(is_available(&rs, 1, t("2024-08-08 19:00"), 0, None));
        assert!(is_available(&rs, 1, t("2024-08-08 21:00"), 0, None));
    }

    #[test]
    fn blocking_reservation_reports_the_conflict() {
        let a = booked(1, "2024-08-08 12:00", ReservationStatus::Open);
        let b = booked(1, "2024-08-08 19:00", ReservationStatus::Open);
        let b_id = b.id;
        let rs = vec![a, b];
        let window = Span::from_minutes(t("2024-08-08 20:00"), 60);
        assert_eq!(blocking_reservation(&rs, 1, &window, None).map(|r| r.id), Some(b_id));
    }
}
