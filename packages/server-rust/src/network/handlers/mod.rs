//! HTTP handler definitions for the notes server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for convenient access
//! when building the router.

pub mod health;
pub mod notes;

pub use health::{health_handler, liveness_handler, readiness_handler};
pub use notes::{create_note, delete_note, get_note, list_notes, update_note};

use std::sync::Arc;
use std::time::Instant;

use super::{NetworkConfig, ShutdownController};
use crate::storage::NoteStore;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references to shared resources so cloning is cheap. Built
/// once at startup; nothing in it is recreated per request.
#[derive(Clone)]
pub struct AppState {
    /// Note persistence backend.
    pub store: Arc<dyn NoteStore>,
    /// Graceful shutdown controller with health state.
    pub shutdown: Arc<ShutdownController>,
    /// Network configuration (bind address, timeouts, body limit).
    pub config: Arc<NetworkConfig>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn NoteStore>, config: NetworkConfig) -> Self {
        Self {
            store,
            shutdown: Arc::new(ShutdownController::new()),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }
}
