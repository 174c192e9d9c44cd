//! HTTP gateway for the trigger service.
//!
//! Each sibling module exports a subrouter; this gateway merges them and owns
//! the shared [`AppState`] (EMBP: `main.rs` only sees [`router`]).

use std::sync::Arc;

use axum::{http::StatusCode, response::IntoResponse, Json, Router};
use serde_json::json;
use tokio::sync::watch;

use crate::channels::PgActivityLog;
use crate::models::ThresholdConfig;
use crate::monitor::Monitor;
use crate::store::PgStore;

mod activity;
mod health;
mod readings;
mod thresholds;
mod tokens;
mod values;

// ---

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: PgStore,
    pub activity_log: PgActivityLog,
    pub monitor: Arc<Monitor>,
    /// Publishes threshold edits to the monitor.
    pub thresholds: Arc<watch::Sender<ThresholdConfig>>,
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(readings::router())
        .merge(thresholds::router())
        .merge(tokens::router())
        .merge(values::router())
        .merge(activity::router())
        .merge(health::router())
        .with_state(state)
}

/// JSON error body shared by the handlers.
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}
