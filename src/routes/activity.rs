//! Read side of the activity log (the app's logs screen).

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::error;

use super::{error_response, AppState};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/activity", get(handler))
}

/// Query parameters for `/activity`
#[derive(Debug, Deserialize)]
struct ActivityQuery {
    limit: Option<u32>,
}

async fn handler(Query(params): Query<ActivityQuery>, State(state): State<AppState>) -> Response {
    // ---
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    match state.activity_log.recent(limit).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => {
            error!("Failed to read activity log: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read activity log")
        }
    }
}
