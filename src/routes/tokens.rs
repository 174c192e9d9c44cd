//! Device-token registry used to address push alerts.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use super::{error_response, AppState};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/tokens", post(register))
        .route("/tokens/{user_id}", delete(unregister))
}

#[derive(Debug, Deserialize)]
struct RegisterToken {
    user_id: String,
    token: String,
    platform: Option<String>,
}

async fn register(State(state): State<AppState>, Json(req): Json<RegisterToken>) -> Response {
    // ---
    let user_id = req.user_id.trim();
    let token = req.token.trim();
    if user_id.is_empty() || token.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "user_id and token are required");
    }

    match state.store.register_token(user_id, token, req.platform.as_deref()).await {
        Ok(()) => {
            info!("Registered push token for user {}", user_id);
            (StatusCode::OK, Json(json!({ "success": true }))).into_response()
        }
        Err(e) => {
            error!("Failed to register push token: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to register token")
        }
    }
}

async fn unregister(Path(user_id): Path<String>, State(state): State<AppState>) -> Response {
    // ---
    match state.store.unregister_token(&user_id).await {
        Ok(removed) => {
            info!("Unregistered push token for user {} (existed: {})", user_id, removed);
            (StatusCode::OK, Json(json!({ "success": true, "removed": removed }))).into_response()
        }
        Err(e) => {
            error!("Failed to unregister push token: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to unregister token")
        }
    }
}
