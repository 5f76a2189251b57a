//! Boundary validation: raw text fields in, validated requests out.
//!
//! Everything here runs before the engine touches state, so the pure core
//! never sees a non-positive party size or an ill-formed time.

use chrono::NaiveDateTime;
use serde::Deserialize;
use thiserror::Error;
use ulid::Ulid;

use crate::limits::*;
use crate::model::{Contact, ReservationStatus, TableId, parse_time};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("party size must be a positive integer, got {0:?}")]
    InvalidPartySize(String),
    #[error("time must look like YYYY-MM-DD HH:MM, got {0:?}")]
    InvalidTime(String),
    #[error("unknown reservation status {0:?}; expected Open, Seated, Completed or Cancelled")]
    UnknownStatus(String),
    #[error("invalid reservation id {0:?}")]
    InvalidId(String),
    #[error("order line must look like name|quantity, got {0:?}")]
    InvalidOrderLine(String),
    #[error("unknown menu item {0:?}")]
    UnknownMenuItem(String),
    #[error("an order needs at least one item")]
    EmptyOrder,
    #[error("{0} is too long")]
    TooLong(&'static str),
    #[error("{field} must be between 1 and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },
    #[error("only open reservations can be amended")]
    NotAmendable,
}

/// When the party wants the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    At(NaiveDateTime),
    /// Seat now; the engine supplies the current time.
    WalkIn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub contact: Contact,
    pub party_size: u32,
    pub arrival: Arrival,
}

/// Booking form as it arrives from a handler: every field optional text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationForm {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub preference: Option<String>,
    pub notes: Option<String>,
    pub party_size: Option<String>,
    pub time: Option<String>,
}

impl ReservationForm {
    pub fn into_booking(self, walk_in: bool) -> Result<BookingRequest, ValidationError> {
        let name = required(self.name, "name")?;
        let phone = required(self.phone, "phone")?;
        let party_size = parse_party_size(&required(self.party_size, "party size")?)?;

        let arrival = if walk_in {
            Arrival::WalkIn
        } else {
            Arrival::At(parse_requested_time(&required(self.time, "time")?)?)
        };

        let contact = Contact {
            name: bounded(name, MAX_NAME_LEN, "name")?,
            phone: bounded(phone, MAX_PHONE_LEN, "phone")?,
            email: bounded(self.email.unwrap_or_default(), MAX_EMAIL_LEN, "email")?,
            preference: bounded(self.preference.unwrap_or_default(), MAX_NOTE_LEN, "preference")?,
            notes: bounded(self.notes.unwrap_or_default(), MAX_NOTE_LEN, "notes")?,
        };

        Ok(BookingRequest {
            contact,
            party_size,
            arrival,
        })
    }
}

/// New time and/or party size for an open reservation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Amendment {
    pub time: Option<NaiveDateTime>,
    pub party_size: Option<u32>,
}

impl Amendment {
    pub fn parse(time: Option<&str>, party_size: Option<&str>) -> Result<Self, ValidationError> {
        Ok(Self {
            time: time.map(parse_requested_time).transpose()?,
            party_size: party_size.map(parse_party_size).transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_none() && self.party_size.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub reservation_id: Ulid,
    /// `(menu item name, quantity)`; names are checked against the menu by the engine.
    pub lines: Vec<(String, u32)>,
}

/// Order form: a reservation id and `name|quantity` lines.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderForm {
    pub reservation_id: Option<String>,
    #[serde(default)]
    pub items: Vec<String>,
}

impl OrderForm {
    pub fn into_order(self) -> Result<OrderRequest, ValidationError> {
        let reservation_id = parse_reservation_id(&required(self.reservation_id, "reservation id")?)?;
        if self.items.is_empty() {
            return Err(ValidationError::EmptyOrder);
        }
        if self.items.len() > MAX_ORDER_LINES {
            return Err(ValidationError::TooLong("order"));
        }
        let lines = self
            .items
            .iter()
            .map(|raw| parse_order_line(raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(OrderRequest {
            reservation_id,
            lines,
        })
    }
}

pub fn parse_party_size(raw: &str) -> Result<u32, ValidationError> {
    let trimmed = raw.trim();
    let size: u32 = trimmed
        .parse()
        .map_err(|_| ValidationError::InvalidPartySize(raw.to_string()))?;
    if size == 0 {
        return Err(ValidationError::InvalidPartySize(raw.to_string()));
    }
    if size > MAX_PARTY_SIZE {
        return Err(ValidationError::OutOfRange {
            field: "party size",
            value: size,
            max: MAX_PARTY_SIZE,
        });
    }
    Ok(size)
}

pub fn parse_requested_time(raw: &str) -> Result<NaiveDateTime, ValidationError> {
    parse_time(raw).ok_or_else(|| ValidationError::InvalidTime(raw.to_string()))
}

pub fn parse_status(raw: &str) -> Result<ReservationStatus, ValidationError> {
    raw.trim()
        .parse()
        .map_err(|_| ValidationError::UnknownStatus(raw.to_string()))
}

pub fn parse_reservation_id(raw: &str) -> Result<Ulid, ValidationError> {
    Ulid::from_string(raw.trim()).map_err(|_| ValidationError::InvalidId(raw.to_string()))
}

pub fn parse_duration(raw: &str) -> Result<u32, ValidationError> {
    let minutes: u32 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::OutOfRange {
            field: "duration",
            value: 0,
            max: MAX_DURATION_MINUTES,
        })?;
    check_range("duration", minutes, MAX_DURATION_MINUTES)
}

pub fn validate_capacity(capacity: u32) -> Result<u32, ValidationError> {
    check_range("capacity", capacity, MAX_TABLE_CAPACITY)
}

pub fn validate_location(location: String) -> Result<String, ValidationError> {
    bounded(location, MAX_LOCATION_LEN, "location")
}

pub fn validate_table_id(id: TableId) -> Result<TableId, ValidationError> {
    if id == 0 {
        return Err(ValidationError::OutOfRange {
            field: "table id",
            value: id,
            max: u32::MAX,
        });
    }
    Ok(id)
}

/// `"Tiramisu|2"` → `("Tiramisu", 2)`.
pub fn parse_order_line(raw: &str) -> Result<(String, u32), ValidationError> {
    let invalid = || ValidationError::InvalidOrderLine(raw.to_string());
    let (name, quantity) = raw.split_once('|').ok_or_else(invalid)?;
    let name = name.trim();
    let quantity: u32 = quantity.trim().parse().map_err(|_| invalid())?;
    if name.is_empty() || quantity == 0 {
        return Err(invalid());
    }
    let quantity = check_range("quantity", quantity, MAX_LINE_QUANTITY)?;
    Ok((name.to_string(), quantity))
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(field)),
    }
}

fn bounded(value: String, max: usize, field: &'static str) -> Result<String, ValidationError> {
    if value.len() > max {
        return Err(ValidationError::TooLong(field));
    }
    Ok(value)
}

fn check_range(field: &'static str, value: u32, max: u32) -> Result<u32, ValidationError> {
    if value == 0 || value > max {
        return Err(ValidationError::OutOfRange { field, value, max });
    }
    Ok(value)
}
