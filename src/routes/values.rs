//! Scalar write path for bookkeeping values outside the alert core, such as
//! `last_water_change`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::put,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::{error_response, AppState};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/values/{path}", put(handler))
}

#[derive(Debug, Deserialize)]
struct SetValue {
    value: f64,
}

async fn handler(
    Path(path): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<SetValue>,
) -> Response {
    // ---
    let valid_path = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '/');
    if !valid_path {
        return error_response(StatusCode::BAD_REQUEST, format!("invalid path {path:?}"));
    }
    if !req.value.is_finite() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "value must be finite");
    }

    match state.store.set_scalar(&path, req.value).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "path": path, "value": req.value }))).into_response(),
        Err(e) => {
            error!("Failed to write {}: {}", path, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to write value")
        }
    }
}
