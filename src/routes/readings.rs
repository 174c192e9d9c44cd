//! Reading-store change notifications.
//!
//! `POST /readings/{kind}` receives the new scalar for `ph` or `water_level`
//! and runs it through the monitor. A null value means the sensor
//! disconnected and is ignored.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, info};

use super::{error_response, AppState};
use crate::error::AlertError;
use crate::models::{RawReadingEvent, SensorKind};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/readings/{kind}", post(handler))
}

async fn handler(
    Path(kind): Path<String>,
    State(state): State<AppState>,
    Json(event): Json<RawReadingEvent>,
) -> Response {
    // ---
    let kind: SensorKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => return error_response(StatusCode::NOT_FOUND, e.to_string()),
    };

    let Some(reading) = event.to_reading(kind, Utc::now()) else {
        debug!("POST /readings/{} - null value (sensor disconnected), ignoring", kind.path());
        return (StatusCode::ACCEPTED, Json(json!({ "alert": null }))).into_response();
    };

    debug!("POST /readings/{} - value {}", kind.path(), reading.value);

    match state.monitor.handle(reading).await {
        Ok(Some(alert)) => {
            info!(
                "Alert {} dispatched: {} delivered, {} failed",
                alert.decision.id,
                alert.dispatch.delivered(),
                alert.dispatch.failed()
            );
            (StatusCode::OK, Json(json!({ "alert": alert }))).into_response()
        }
        Ok(None) => (StatusCode::OK, Json(json!({ "alert": null }))).into_response(),
        Err(e @ AlertError::InvalidReading { .. }) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        Err(e) => {
            error!("Failed to handle {} reading: {}", kind, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
