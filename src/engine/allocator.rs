use chrono::NaiveDateTime;
use ulid::Ulid;

use crate::model::*;

use super::availability::is_available;

/// Tables that could seat `party_size` at all, best fit first: ascending
/// capacity, then ascending id. Out-of-service tables are excluded; no other
/// status is consulted since it describes now, not the requested window.
pub fn candidates(tables: &[Table], party_size: u32) -> Vec<&Table> {
    let mut fits: Vec<&Table> = tables
        .iter()
        .filter(|t| t.capacity >= party_size && !t.is_out_of_service())
        .collect();
    fits.sort_by_key(|t| (t.capacity, t.id));
    fits
}

/// Pick the smallest table that seats `party_size` and is free for the whole
/// requested window. `None` is a normal outcome.
pub fn find_table(
    tables: &[Table],
    reservations: &[Reservation],
    party_size: u32,
    requested_start: NaiveDateTime,
    duration_minutes: u32,
    exclude: Option<Ulid>,
) -> Option<TableId> {
    candidates(tables, party_size)
        .into_iter()
        .find(|t| is_available(reservations, t.id, requested_start, duration_minutes, exclude))
        .map(|t| t.id)
}
