/// Seating window assumed when a reservation carries no duration.
pub const DEFAULT_DURATION_MINUTES: u32 = 120;

/// Longest seating window a booking may ask for (one day).
pub const MAX_DURATION_MINUTES: u32 = 24 * 60;

pub const MAX_PARTY_SIZE: u32 = 500;
pub const MAX_TABLE_CAPACITY: u32 = 500;
pub const MAX_TABLES: usize = 1_000;
/// Open or seated reservations at once.
pub const MAX_RESERVATIONS: usize = 100_000;

pub const MAX_NAME_LEN: usize = 128;
pub const MAX_PHONE_LEN: usize = 64;
pub const MAX_EMAIL_LEN: usize = 256;
pub const MAX_NOTE_LEN: usize = 1_024;
pub const MAX_LOCATION_LEN: usize = 64;

pub const MAX_ORDER_LINES: usize = 100;
pub const MAX_LINE_QUANTITY: u32 = 1_000;

/// Largest snapshot the file store will try to decode.
pub const MAX_SNAPSHOT_BYTES: usize = 256 * 1024 * 1024;
