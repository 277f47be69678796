//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use aura_tarot_core::{InterpretationService, TarotSession};
use std::sync::Arc;
use tokio::sync::Mutex;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// There is exactly one session per process. Every request takes the lock, so
/// identity changes and the store re-keying that follows them are never
/// observed half done.
pub struct AppState {
    pub session: Mutex<TarotSession>,
    pub interpreter: Arc<dyn InterpretationService>,
}

impl AppState {
    pub fn new(session: TarotSession, interpreter: Arc<dyn InterpretationService>) -> Self {
        Self {
            session: Mutex::new(session),
            interpreter,
        }
    }
}
