use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::limits::DEFAULT_DURATION_MINUTES;

pub type TableId = u32;

/// Money in minor units (cents).
pub type Cents = u64;

/// Canonical text form for stored times.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

static TIME_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})(?:T|\s+)(\d{2}):(\d{2})$").expect("static regex")
});

/// Parse `YYYY-MM-DD HH:MM` (or `T` as separator). Returns `None` for anything
/// that is not a real calendar instant in that shape.
pub fn parse_time(raw: &str) -> Option<NaiveDateTime> {
    let caps = TIME_SHAPE.captures(raw.trim())?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    let year = i32::try_from(num(1)?).ok()?;
    NaiveDate::from_ymd_opt(year, num(2)?, num(3)?)?.and_hms_opt(num(4)?, num(5)?, 0)
}

pub fn format_time(t: NaiveDateTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

/// Half-open overlap test: `[a_start, a_end)` and `[b_start, b_end)` overlap
/// unless one ends at or before the other begins.
pub fn overlaps(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    !(a_end <= b_start || a_start >= b_end)
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Span {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        debug_assert!(start <= end, "Span start must not be after end");
        Self { start, end }
    }

    pub fn from_minutes(start: NaiveDateTime, minutes: u32) -> Self {
        Self::new(start, start + Duration::minutes(i64::from(minutes)))
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }

    pub fn contains_instant(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t < self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", format_time(self.start), format_time(self.end))
    }
}

// ── Tables ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableStatus {
    Free,
    Reserved,
    Occupied,
    /// Set from outside; recomputation never touches it.
    OutOfService,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Free => "Free",
            TableStatus::Reserved => "Reserved",
            TableStatus::Occupied => "Occupied",
            TableStatus::OutOfService => "OutOfService",
        }
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub capacity: u32,
    pub location: String,
    pub status: TableStatus,
}

impl Table {
    pub fn new(id: TableId, capacity: u32, location: impl Into<String>) -> Self {
        Self {
            id,
            capacity,
            location: location.into(),
            status: TableStatus::Free,
        }
    }

    pub fn is_out_of_service(&self) -> bool {
        self.status == TableStatus::OutOfService
    }
}

// ── Reservations ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    Open,
    Seated,
    Completed,
    Cancelled,
}

impl ReservationStatus {
    pub const ALL: [ReservationStatus; 4] = [
        ReservationStatus::Open,
        ReservationStatus::Seated,
        ReservationStatus::Completed,
        ReservationStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Open => "Open",
            ReservationStatus::Seated => "Seated",
            ReservationStatus::Completed => "Completed",
            ReservationStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Completed | ReservationStatus::Cancelled)
    }

    /// Lifecycle: `Open → Seated → Completed`, `Cancelled` from any
    /// non-terminal state. Re-applying the current status is allowed.
    pub fn can_become(&self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Open, Seated) | (Open, Completed) | (Open, Cancelled) | (Seated, Completed) | (Seated, Cancelled)
        )
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown reservation status: {:?}", self.0)
    }
}

impl FromStr for ReservationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReservationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Free-text fields carried through from the booking form unmodified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub preference: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub contact: Contact,
    pub party_size: u32,
    /// Start time as stored. May be unparseable in old or hand-edited data.
    pub time: String,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    pub status: ReservationStatus,
    /// `None` means no table was free at booking time (or it was cancelled).
    pub table_id: Option<TableId>,
    pub last_modified: NaiveDateTime,
}

impl Reservation {
    pub fn start(&self) -> Option<NaiveDateTime> {
        parse_time(&self.time)
    }

    pub fn effective_duration(&self) -> u32 {
        self.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES)
    }

    /// `[start, start + duration)`, or `None` when the stored time is unparseable.
    pub fn span(&self) -> Option<Span> {
        self.start()
            .map(|start| Span::from_minutes(start, self.effective_duration()))
    }

    pub fn end_time(&self) -> Option<String> {
        self.span().map(|s| format_time(s.end))
    }

    pub fn holds_table(&self, table_id: TableId) -> bool {
        self.table_id == Some(table_id) && self.status != ReservationStatus::Cancelled
    }
}

// ── Menu & orders ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub category: String,
    pub price: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub name: String,
    pub category: String,
    pub price: Cents,
    pub quantity: u32,
    pub line_total: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Ulid,
    pub reservation_id: Ulid,
    pub table_id: Option<TableId>,
    pub lines: Vec<OrderLine>,
    pub total: Cents,
    pub created_at: NaiveDateTime,
}

pub fn format_cents(amount: Cents) -> String {
    format!("{}.{:02}", amount / 100, amount % 100)
}

// ── Snapshot ─────────────────────────────────────────────────────

/// Everything the engine reads and commits as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorState {
    pub tables: Vec<Table>,
    pub reservations: Vec<Reservation>,
    pub orders: Vec<Order>,
    pub menu: Vec<MenuItem>,
}

impl FloorState {
    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == id)
    }

    pub fn table_mut(&mut self, id: TableId) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.id == id)
    }

    pub fn reservation(&self, id: Ulid) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == id)
    }

    pub fn reservation_mut(&mut self, id: Ulid) -> Option<&mut Reservation> {
        self.reservations.iter_mut().find(|r| r.id == id)
    }

    /// Reservations still open or seated. Finished history is not counted.
    pub fn live_reservations(&self) -> usize {
        self.reservations.iter().filter(|r| !r.status.is_terminal()).count()
    }

    pub fn menu_item(&self, name: &str) -> Option<&MenuItem> {
        self.menu.iter().find(|m| m.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.reservations.is_empty() && self.menu.is_empty()
    }

    /// A small floor to start from: two window deuces, two center four-tops
    /// and a patio six-top, plus a short menu.
    pub fn sample() -> Self {
        let item = |name: &str, category: &str, price: Cents| MenuItem {
            name: name.to_string(),
            category: category.to_string(),
            price,
        };
        Self {
            tables: vec![
                Table::new(1, 2, "Window"),
                Table::new(2, 2, "Window"),
                Table::new(3, 4, "Center"),
                Table::new(4, 4, "Center"),
                Table::new(5, 6, "Patio"),
            ],
            reservations: Vec::new(),
            orders: Vec::new(),
            menu: vec![
                item("Seared Salmon", "Main", 2450),
                item("Garden Salad", "Starter", 850),
                item("Ribeye Steak", "Main", 3600),
                item("Tiramisu", "Dessert", 750),
                item("Fresh Lemonade", "Drink", 450),
            ],
        }
    }
}

// ── Events ───────────────────────────────────────────────────────

/// Broadcast to per-table subscribers after a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FloorEvent {
    TableStatusChanged {
        table_id: TableId,
        from: TableStatus,
        to: TableStatus,
    },
    ReservationAssigned {
        reservation_id: Ulid,
        table_id: TableId,
    },
    ReservationReleased {
        reservation_id: Ulid,
        table_id: TableId,
    },
    ReservationStatusChanged {
        reservation_id: Ulid,
        table_id: TableId,
        status: ReservationStatus,
    },
    OrderRecorded {
        order_id: Ulid,
        reservation_id: Ulid,
        table_id: TableId,
        total: Cents,
    },
}

impl FloorEvent {
    pub fn table_id(&self) -> TableId {
        match self {
            FloorEvent::TableStatusChanged { table_id, .. }
            | FloorEvent::ReservationAssigned { table_id, .. }
            | FloorEvent::ReservationReleased { table_id, .. }
            | FloorEvent::ReservationStatusChanged { table_id, .. }
            | FloorEvent::OrderRecorded { table_id, .. } => *table_id,
        }
    }
}
