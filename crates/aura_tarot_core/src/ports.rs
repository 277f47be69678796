//! crates/aura_tarot_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! The session layer only ever talks to these traits, so the same code runs
//! against the in-memory store in tests and the file-backed store in the service.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use crate::domain::InterpretationRequest;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Already exists: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Storage failure: {0}")]
    Storage(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// A synchronous string key-value store, the only persistence medium of the app.
///
/// A missing key is `Ok(None)`, never an error.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> PortResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> PortResult<()>;

    fn remove(&self, key: &str) -> PortResult<()>;
}

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The current calendar date in the device's local time zone.
    fn today(&self) -> NaiveDate;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[async_trait]
pub trait InterpretationService: Send + Sync {
    /// Produces a Markdown interpretation for the drawn cards.
    async fn interpret(&self, request: &InterpretationRequest) -> PortResult<String>;
}
