//! Settings edits: the validated write path for [`ThresholdConfig`].
//!
//! This is the edit boundary where `min < max` is enforced. Accepted edits
//! are persisted first and then published to the monitor, which reads the
//! newest snapshot on its next evaluation.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::{error, info};

use super::{error_response, AppState};
use crate::models::{SensorKind, ThresholdConfig};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/thresholds", get(get_thresholds).put(put_thresholds))
}

async fn get_thresholds(State(state): State<AppState>) -> Json<ThresholdConfig> {
    Json(state.monitor.thresholds())
}

async fn put_thresholds(State(state): State<AppState>, Json(cfg): Json<ThresholdConfig>) -> Response {
    // ---
    if let Err(e) = cfg.validate() {
        info!("PUT /thresholds rejected: {}", e);
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string());
    }

    if let Err(e) = state.store.save_thresholds(&cfg).await {
        error!("Failed to save thresholds: {}", e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save thresholds");
    }

    info!(
        "Thresholds updated: pH {}, water level {} (low below {})",
        cfg.range_for(SensorKind::Ph),
        cfg.range_for(SensorKind::WaterLevel),
        cfg.low_water_level()
    );
    state.thresholds.send_replace(cfg.clone());
    (StatusCode::OK, Json(cfg)).into_response()
}
