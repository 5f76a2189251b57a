use tracing::{info, warn};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;
use crate::request::{Amendment, Arrival, BookingRequest, OrderRequest, ValidationError, validate_capacity, validate_location, validate_table_id};

use super::allocator::find_table;
use super::{Engine, EngineError};

impl Engine {
    /// Book a table for a party. Walk-ins are seated immediately at the
    /// current time. When no table fits, the reservation is still created,
    /// unassigned.
    pub async fn create_reservation(&self, request: BookingRequest) -> Result<Reservation, EngineError> {
        if request.party_size == 0 || request.party_size > MAX_PARTY_SIZE {
            return Err(ValidationError::InvalidPartySize(request.party_size.to_string()).into());
        }
        let duration = self.default_duration;
        let arrival = request.arrival;

        let reservation = self
            .mutate(|state, now| {
                if state.live_reservations() >= MAX_RESERVATIONS {
                    return Err(EngineError::LimitExceeded("too many reservations"));
                }
                let (start, status) = match arrival {
                    Arrival::At(t) => (t, ReservationStatus::Open),
                    Arrival::WalkIn => (now, ReservationStatus::Seated),
                };
                let table_id = find_table(
                    &state.tables,
                    &state.reservations,
                    request.party_size,
                    start,
                    duration,
                    None,
                );

                let reservation = Reservation {
                    id: Ulid::new(),
                    contact: request.contact,
                    party_size: request.party_size,
                    time: format_time(start),
                    duration_minutes: Some(duration),
                    status,
                    table_id,
                    last_modified: now,
                };
                state.reservations.push(reservation.clone());

                let events = table_id
                    .map(|table_id| FloorEvent::ReservationAssigned {
                        reservation_id: reservation.id,
                        table_id,
                    })
                    .into_iter()
                    .collect();
                Ok((reservation, events))
            })
            .await
            .inspect_err(|e| reject("create_reservation", e))?;

        let outcome = if reservation.table_id.is_some() { "assigned" } else { "unassigned" };
        metrics::counter!(
            observability::RESERVATIONS_TOTAL,
            "arrival" => observability::arrival_label(&arrival),
            "outcome" => outcome
        )
        .increment(1);

        match reservation.table_id {
            Some(table_id) => info!(
                reservation = %reservation.id,
                table = table_id,
                party = reservation.party_size,
                time = %reservation.time,
                status = %reservation.status,
                "reservation created"
            ),
            None => {
                metrics::counter!(observability::ALLOCATION_MISSES_TOTAL).increment(1);
                warn!(
                    reservation = %reservation.id,
                    party = reservation.party_size,
                    time = %reservation.time,
                    "no table free for requested window; reservation left unassigned"
                );
            }
        }
        Ok(reservation)
    }

    /// Move a reservation along its lifecycle. Cancelling also releases the
    /// table assignment.
    pub async fn update_status(&self, id: Ulid, status: ReservationStatus) -> Result<Reservation, EngineError> {
        let updated = self
            .mutate(|state, now| {
                let reservation = state
                    .reservation_mut(id)
                    .ok_or(EngineError::ReservationNotFound(id))?;
                if !reservation.status.can_become(status) {
                    return Err(EngineError::InvalidTransition {
                        id,
                        from: reservation.status,
                        to: status,
                    });
                }

                reservation.status = status;
                let mut events = Vec::new();
                if status == ReservationStatus::Cancelled
                    && let Some(table_id) = reservation.table_id.take()
                {
                    events.push(FloorEvent::ReservationReleased {
                        reservation_id: id,
                        table_id,
                    });
                }
                if let Some(table_id) = reservation.table_id {
                    events.push(FloorEvent::ReservationStatusChanged {
                        reservation_id: id,
                        table_id,
                        status,
                    });
                }
                reservation.last_modified = now;
                Ok((reservation.clone(), events))
            })
            .await
            .inspect_err(|e| reject("update_status", e))?;

        metrics::counter!(observability::STATUS_CHANGES_TOTAL, "status" => status.as_str()).increment(1);
        info!(reservation = %id, status = %status, "reservation status updated");
        Ok(updated)
    }

    pub async fn cancel_reservation(&self, id: Ulid) -> Result<Reservation, EngineError> {
        self.update_status(id, ReservationStatus::Cancelled).await
    }

    /// Change the time and/or party size of an open reservation. The table is
    /// re-chosen from scratch, ignoring the reservation's own current slot.
    pub async fn amend_reservation(&self, id: Ulid, amendment: Amendment) -> Result<Reservation, EngineError> {
        if let Some(size) = amendment.party_size
            && (size == 0 || size > MAX_PARTY_SIZE)
        {
            return Err(ValidationError::InvalidPartySize(size.to_string()).into());
        }
        let amended = self
            .mutate(|state, now| {
                let current = state.reservation(id).ok_or(EngineError::ReservationNotFound(id))?;
                if current.status != ReservationStatus::Open {
                    return Err(ValidationError::NotAmendable.into());
                }
                let start = match amendment.time {
                    Some(t) => t,
                    None => current
                        .start()
                        .ok_or_else(|| ValidationError::InvalidTime(current.time.clone()))?,
                };
                let party_size = amendment.party_size.unwrap_or(current.party_size);
                let duration = current.effective_duration();
                let previous_table = current.table_id;

                let table_id = find_table(&state.tables, &state.reservations, party_size, start, duration, Some(id));

                let reservation = state
                    .reservation_mut(id)
                    .ok_or(EngineError::ReservationNotFound(id))?;
                reservation.time = format_time(start);
                reservation.party_size = party_size;
                reservation.duration_minutes = Some(duration);
                reservation.table_id = table_id;
                reservation.last_modified = now;

                let mut events = Vec::new();
                if previous_table != table_id {
                    if let Some(old) = previous_table {
                        events.push(FloorEvent::ReservationReleased {
                            reservation_id: id,
                            table_id: old,
                        });
                    }
                    if let Some(new) = table_id {
                        events.push(FloorEvent::ReservationAssigned {
                            reservation_id: id,
                            table_id: new,
                        });
                    }
                }
                Ok((reservation.clone(), events))
            })
            .await
            .inspect_err(|e| reject("amend_reservation", e))?;

        if amended.table_id.is_none() {
            metrics::counter!(observability::ALLOCATION_MISSES_TOTAL).increment(1);
            warn!(reservation = %id, time = %amended.time, "amended reservation has no table");
        } else {
            info!(reservation = %id, table = ?amended.table_id, time = %amended.time, "reservation amended");
        }
        Ok(amended)
    }

    /// Record an order against a reservation. Prices come from the menu.
    pub async fn record_order(&self, request: OrderRequest) -> Result<Order, EngineError> {
        let order = self
            .mutate(|state, now| {
                let reservation = state
                    .reservation(request.reservation_id)
                    .ok_or(EngineError::ReservationNotFound(request.reservation_id))?;
                let table_id = reservation.table_id;

                if request.lines.is_empty() {
                    return Err(ValidationError::EmptyOrder.into());
                }
                if request.lines.len() > MAX_ORDER_LINES {
                    return Err(ValidationError::TooLong("order").into());
                }
                let mut lines = Vec::with_capacity(request.lines.len());
                for (name, quantity) in &request.lines {
                    if *quantity == 0 || *quantity > MAX_LINE_QUANTITY {
                        return Err(ValidationError::InvalidOrderLine(format!("{name}|{quantity}")).into());
                    }
                    let item = state
                        .menu_item(name)
                        .ok_or_else(|| ValidationError::UnknownMenuItem(name.clone()))?;
                    lines.push(OrderLine {
                        name: item.name.clone(),
                        category: item.category.clone(),
                        price: item.price,
                        quantity: *quantity,
                        line_total: item.price * Cents::from(*quantity),
                    });
                }
                let total = lines.iter().map(|l| l.line_total).sum();

                let order = Order {
                    id: Ulid::new(),
                    reservation_id: request.reservation_id,
                    table_id,
                    lines,
                    total,
                    created_at: now,
                };
                state.orders.push(order.clone());

                let events = table_id
                    .map(|table_id| FloorEvent::OrderRecorded {
                        order_id: order.id,
                        reservation_id: order.reservation_id,
                        table_id,
                        total,
                    })
                    .into_iter()
                    .collect();
                Ok((order, events))
            })
            .await
            .inspect_err(|e| reject("record_order", e))?;

        metrics::counter!(observability::ORDERS_TOTAL).increment(1);
        info!(
            order = %order.id,
            reservation = %order.reservation_id,
            total = %format_cents(order.total),
            "order recorded"
        );
        Ok(order)
    }

    pub async fn add_table(&self, id: TableId, capacity: u32, location: String) -> Result<Table, EngineError> {
        let id = validate_table_id(id)?;
        let capacity = validate_capacity(capacity)?;
        let location = validate_location(location)?;

        let table = self
            .mutate(|state, _| {
                if state.table(id).is_some() {
                    return Err(EngineError::TableExists(id));
                }
                if state.tables.len() >= MAX_TABLES {
                    return Err(EngineError::LimitExceeded("too many tables"));
                }
                state.tables.push(Table::new(id, capacity, location));
                Ok((id, Vec::new()))
            })
            .await
            .inspect_err(|e| reject("add_table", e))?;

        info!(table = id, capacity, "table added");
        self.table(table).await
    }

    /// Take a table out of service, or hand it back to derived status.
    pub async fn set_out_of_service(&self, id: TableId, out_of_service: bool) -> Result<Table, EngineError> {
        self.mutate(|state, _| {
            let table = state.table_mut(id).ok_or(EngineError::TableNotFound(id))?;
            // Recomputation re-derives the real status right after.
            table.status = if out_of_service {
                TableStatus::OutOfService
            } else {
                TableStatus::Free
            };
            Ok(((), Vec::new()))
        })
        .await
        .inspect_err(|e| reject("set_out_of_service", e))?;

        info!(table = id, out_of_service, "table service flag changed");
        self.table(id).await
    }

    /// Seed an empty floor with the sample tables and menu. Returns whether
    /// anything was written.
    pub async fn seed_if_empty(&self, seed: FloorState) -> Result<bool, EngineError> {
        self.mutate(|state, _| {
            if !state.is_empty() {
                return Ok((false, Vec::new()));
            }
            *state = seed;
            Ok((true, Vec::new()))
        })
        .await
    }
}

fn reject(operation: &'static str, error: &EngineError) {
    if error.is_rejection() {
        metrics::counter!(observability::REJECTIONS_TOTAL, "operation" => operation).increment(1);
        tracing::debug!(operation, %error, "rejected");
    } else {
        tracing::error!(operation, %error, "operation failed");
    }
}
