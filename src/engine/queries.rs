use chrono::NaiveDateTime;
use ulid::Ulid;

use crate::model::*;

use super::allocator::find_table;
use super::availability::is_available;
use super::{Engine, EngineError};

impl Engine {
    /// All tables with statuses derived for the current instant.
    pub async fn tables(&self) -> Vec<Table> {
        let mut guard = self.state.lock().await;
        self.refresh_locked(&mut guard).await;
        guard.tables.clone()
    }

    pub async fn table(&self, id: TableId) -> Result<Table, EngineError> {
        let mut guard = self.state.lock().await;
        self.refresh_locked(&mut guard).await;
        guard.table(id).cloned().ok_or(EngineError::TableNotFound(id))
    }

    pub async fn reservations(&self) -> Vec<Reservation> {
        let mut guard = self.state.lock().await;
        self.refresh_locked(&mut guard).await;
        guard.reservations.clone()
    }

    pub async fn reservation(&self, id: Ulid) -> Result<Reservation, EngineError> {
        let guard = self.state.lock().await;
        guard
            .reservation(id)
            .cloned()
            .ok_or(EngineError::ReservationNotFound(id))
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.state.lock().await.orders.clone()
    }

    pub async fn menu(&self) -> Vec<MenuItem> {
        self.state.lock().await.menu.clone()
    }

    /// Full consistent copy of the floor as last committed.
    pub async fn snapshot(&self) -> FloorState {
        self.state.lock().await.clone()
    }

    /// Whether `table_id` is free over `[start, start + duration)`.
    pub async fn check_availability(
        &self,
        table_id: TableId,
        start: NaiveDateTime,
        duration_minutes: Option<u32>,
        exclude: Option<Ulid>,
    ) -> Result<bool, EngineError> {
        let guard = self.state.lock().await;
        let table = guard.table(table_id).ok_or(EngineError::TableNotFound(table_id))?;
        if table.is_out_of_service() {
            return Ok(false);
        }
        let duration = duration_minutes.unwrap_or(self.default_duration);
        Ok(is_available(&guard.reservations, table_id, start, duration, exclude))
    }

    /// Which table a booking would get right now, without booking it.
    pub async fn suggest_table(
        &self,
        party_size: u32,
        start: NaiveDateTime,
        duration_minutes: Option<u32>,
    ) -> Option<TableId> {
        let guard = self.state.lock().await;
        let duration = duration_minutes.unwrap_or(self.default_duration);
        find_table(&guard.tables, &guard.reservations, party_size, start, duration, None)
    }
}
