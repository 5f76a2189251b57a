use std::io;

use thiserror::Error;
use ulid::Ulid;

use crate::model::{ReservationStatus, TableId};
use crate::request::ValidationError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("reservation not found: {0}")]
    ReservationNotFound(Ulid),
    #[error("table not found: {0}")]
    TableNotFound(TableId),
    #[error("table already exists: {0}")]
    TableExists(TableId),
    #[error("reservation {id} is {from}; cannot become {to}")]
    InvalidTransition {
        id: Ulid,
        from: ReservationStatus,
        to: ReservationStatus,
    },
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Rejections the caller can fix by changing the request.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, EngineError::Store(_))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("encode: {0}")]
    Encode(#[from] bincode::Error),
    #[error("corrupt snapshot: {0}")]
    Corrupt(&'static str),
}
