use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::model::*;

/// Derive every table's status at `now` from the reservation list.
///
/// Out-of-service tables are returned untouched. Everything else starts from
/// `Free`; each live, assigned reservation then marks its table `Occupied`
/// (seated, or `now` inside its window) or `Reserved` (window still ahead).
/// If two reservations somehow claim one table, the later one in
/// `reservations` wins.
pub fn recompute(mut tables: Vec<Table>, reservations: &[Reservation], now: NaiveDateTime) -> Vec<Table> {
    let mut index: HashMap<TableId, usize> = HashMap::with_capacity(tables.len());
    for (pos, table) in tables.iter_mut().enumerate() {
        index.entry(table.id).or_insert(pos);
        if !table.is_out_of_service() {
            table.status = TableStatus::Free;
        }
    }

    for r in reservations {
        let Some(table_id) = r.table_id else { continue };
        if matches!(r.status, ReservationStatus::Cancelled | ReservationStatus::Completed) {
            continue;
        }
        let Some(&pos) = index.get(&table_id) else { continue };
        let table = &mut tables[pos];
        if table.is_out_of_service() {
            continue;
        }
        let Some(span) = r.span() else { continue };

        if r.status == ReservationStatus::Seated || span.contains_instant(now) {
            table.status = TableStatus::Occupied;
        } else if now < span.start {
            table.status = TableStatus::Reserved;
        }
    }

    tables
}

/// A table whose derived status differs between two recomputations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub table_id: TableId,
    pub from: TableStatus,
    pub to: TableStatus,
}

/// Status transitions from `before` to `after`, matched by table id. Tables
/// present on only one side are not reported.
pub fn status_changes(before: &[Table], after: &[Table]) -> Vec<StatusChange> {
    let previous: HashMap<TableId, TableStatus> = before.iter().map(|t| (t.id, t.status)).collect();
    after
        .iter()
        .filter_map(|t| {
            let from = *previous.get(&t.id)?;
            (from != t.status).then_some(StatusChange {
                table_id: t.id,
                from,
                to: t.status,
            })
        })
        .collect()
}
