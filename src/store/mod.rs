//! Write interface of the analytical (target) store.
//!
//! The pipeline only needs three primitives: read the whole signal registry,
//! batch-insert new signal names, and upsert facts by `(timestamp, signal_id)`.

use core::fmt;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::db::models::{NewFact, Signal};

pub mod postgres;

#[cfg(test)]
pub mod memory;

#[derive(Debug)]
pub enum StoreError {
    /// Unique constraint hit by a concurrent writer; recoverable by re-reading.
    Conflict(String),
    Connection(String),
    Database(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Conflict(s) => write!(f, "conflict: {}", s),
            StoreError::Connection(s) => write!(f, "connection error: {}", s),
            StoreError::Database(s) => write!(f, "database error: {}", s),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<DieselError> for StoreError {
    fn from(value: DieselError) -> Self {
        match value {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Conflict(info.message().to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
                StoreError::Connection(info.message().to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

pub trait TargetStore {
    /// Every registered signal, in one round-trip.
    fn load_signals(&mut self) -> Result<Vec<Signal>, StoreError>;

    /// Insert `names` in one batch and return the rows this call created.
    /// Names that already exist are either skipped (absent from the result)
    /// or reported as `StoreError::Conflict`, depending on the backend.
    fn insert_signals(&mut self, names: &[String]) -> Result<Vec<Signal>, StoreError>;

    /// Insert-or-overwrite `facts` atomically; returns the number of rows affected.
    fn upsert_facts(&mut self, facts: &[NewFact]) -> Result<usize, StoreError>;
}
