mod allocator;
mod availability;
mod error;
mod mutations;
mod queries;
mod recompute;
mod store;

pub use allocator::{candidates, find_table};
pub use availability::{blocking_reservation, is_available};
pub use error::{EngineError, StoreError};
pub use recompute::{StatusChange, recompute, status_changes};
pub use store::{FileStore, InMemoryStore, Store};

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDateTime;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::observability;

/// Owns the floor snapshot and serializes every read-modify-write.
///
/// Each mutation works on a clone of the snapshot: apply the change,
/// recompute table statuses, commit through the store, and only then swap
/// the clone in. Readers never see a half-applied change, and a failed
/// commit leaves memory as it was.
pub struct Engine {
    state: Mutex<FloorState>,
    store: Arc<dyn Store>,
    pub notify: Arc<NotifyHub>,
    clock: Arc<dyn Clock>,
    default_duration: u32,
}

impl Engine {
    /// Load the floor from `store` and derive statuses for the current time.
    pub async fn open(
        store: Arc<dyn Store>,
        notify: Arc<NotifyHub>,
        clock: Arc<dyn Clock>,
        default_duration: u32,
    ) -> Result<Self, EngineError> {
        let mut state = store.load().await?;
        let now = clock.now();
        state.tables = recompute(std::mem::take(&mut state.tables), &state.reservations, now);
        info!(
            tables = state.tables.len(),
            reservations = state.reservations.len(),
            "floor loaded"
        );
        observability::record_table_gauges(&state.tables);

        Ok(Self {
            state: Mutex::new(state),
            store,
            notify,
            clock,
            default_duration,
        })
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn default_duration(&self) -> u32 {
        self.default_duration
    }

    /// Apply `change` to a copy of the floor, recompute, commit, publish.
    ///
    /// `change` receives the working copy and the instant the operation is
    /// evaluated at. Events it returns are broadcast after the commit, along
    /// with any table status transitions.
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut FloorState, NaiveDateTime) -> Result<(T, Vec<FloorEvent>), EngineError>,
    ) -> Result<T, EngineError> {
        let mut guard = self.state.lock().await;
        let now = self.clock.now();

        let mut next = guard.clone();
        let (out, events) = change(&mut next, now)?;
        next.tables = timed_recompute(std::mem::take(&mut next.tables), &next.reservations, now);

        self.store.commit(&next).await?;

        let changes = status_changes(&guard.tables, &next.tables);
        *guard = next;
        self.publish(&guard.tables, changes, events);
        Ok(out)
    }

    /// Re-derive statuses at the current instant and publish any
    /// transitions. The new statuses are also committed, but a failed commit
    /// only logs: derived statuses are recomputed on load anyway.
    pub async fn refresh(&self) -> Vec<StatusChange> {
        let mut guard = self.state.lock().await;
        self.refresh_locked(&mut guard).await
    }

    async fn refresh_locked(&self, guard: &mut FloorState) -> Vec<StatusChange> {
        let now = self.clock.now();
        let tables = timed_recompute(guard.tables.clone(), &guard.reservations, now);
        let changes = status_changes(&guard.tables, &tables);
        if changes.is_empty() {
            return changes;
        }

        guard.tables = tables;
        self.publish(&guard.tables, changes.clone(), Vec::new());
        if let Err(e) = self.store.commit(guard).await {
            warn!(error = %e, "could not persist refreshed table statuses");
        }
        changes
    }

    fn publish(&self, tables: &[Table], changes: Vec<StatusChange>, events: Vec<FloorEvent>) {
        for change in &changes {
            info!(
                table = change.table_id,
                from = %change.from,
                to = %change.to,
                "table status changed"
            );
            metrics::counter!(
                observability::TABLE_TRANSITIONS_TOTAL,
                "to" => observability::status_label(change.to)
            )
            .increment(1);
        }
        if !changes.is_empty() {
            observability::record_table_gauges(tables);
        }

        for event in events {
            self.notify.send(event);
        }
        for change in changes {
            self.notify.send(FloorEvent::TableStatusChanged {
                table_id: change.table_id,
                from: change.from,
                to: change.to,
            });
        }
    }
}

fn timed_recompute(tables: Vec<Table>, reservations: &[Reservation], now: NaiveDateTime) -> Vec<Table> {
    let started = Instant::now();
    let tables = recompute(tables, reservations, now);
    metrics::histogram!(observability::RECOMPUTE_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    tables
}
