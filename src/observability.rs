use std::net::SocketAddr;

use metrics_exporter_prometheus::BuildError;

use crate::model::TableStatus;
use crate::request::Arrival;

// ── Booking flow ────────────────────────────────────────────────

/// Counter: reservations created. Labels: arrival, outcome.
pub const RESERVATIONS_TOTAL: &str = "covers_reservations_total";

/// Counter: bookings for which no table was free.
pub const ALLOCATION_MISSES_TOTAL: &str = "covers_allocation_misses_total";

/// Counter: reservation status changes. Labels: status.
pub const STATUS_CHANGES_TOTAL: &str = "covers_status_changes_total";

/// Counter: orders recorded.
pub const ORDERS_TOTAL: &str = "covers_orders_total";

/// Counter: rejected operations. Labels: operation.
pub const REJECTIONS_TOTAL: &str = "covers_rejections_total";

// ── Floor state ─────────────────────────────────────────────────

/// Counter: derived table status transitions. Labels: to.
pub const TABLE_TRANSITIONS_TOTAL: &str = "covers_table_transitions_total";

/// Gauge: tables currently in each status. Labels: status.
pub const TABLES_BY_STATUS: &str = "covers_tables_by_status";

/// Histogram: time to recompute all table statuses, in seconds.
pub const RECOMPUTE_DURATION_SECONDS: &str = "covers_recompute_duration_seconds";

/// Histogram: snapshot commit duration in seconds.
pub const STORE_COMMIT_DURATION_SECONDS: &str = "covers_store_commit_duration_seconds";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

pub fn arrival_label(arrival: &Arrival) -> &'static str {
    match arrival {
        Arrival::At(_) => "booked",
        Arrival::WalkIn => "walk_in",
    }
}

pub fn status_label(status: TableStatus) -> &'static str {
    match status {
        TableStatus::Free => "free",
        TableStatus::Reserved => "reserved",
        TableStatus::Occupied => "occupied",
        TableStatus::OutOfService => "out_of_service",
    }
}

/// Publish per-status table counts.
pub fn record_table_gauges<'a>(tables: impl IntoIterator<Item = &'a crate::model::Table>) {
    let mut counts = [0usize; 4];
    for table in tables {
        counts[table.status as usize] += 1;
    }
    for status in [
        TableStatus::Free,
        TableStatus::Reserved,
        TableStatus::Occupied,
        TableStatus::OutOfService,
    ] {
        metrics::gauge!(TABLES_BY_STATUS, "status" => status_label(status))
            .set(counts[status as usize] as f64);
    }
}
