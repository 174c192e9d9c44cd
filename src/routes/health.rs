// src/routes/health.rs
//! Service health check endpoint.
//!
//! This module defines the `/health` route used by container orchestrators
//! and the host application to verify that the trigger service is running.
//! It follows the Explicit Module Boundary Pattern (EMBP):
//! - Internal to this file: endpoint handler(s) and related types
//! - Exports to the gateway (`mod.rs`): a subrouter containing the `/health` route

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    cooldown_secs: u64,
}

/// Handle `GET /health`.
///
/// Does not touch the database or any delivery channel.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cooldown_secs: state.monitor.cooldown().as_secs(),
    })
}

/// Create a subrouter containing the `/health` route.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
