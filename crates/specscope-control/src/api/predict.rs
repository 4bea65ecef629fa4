//! Single-reading inference.
//!
//! GET  / - service status
//! POST /predict - classify one reading

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use specscope_common::models::{FeatureVector, Prediction};

use crate::api::error::ApiError;
use crate::state::AppState;

pub const STATUS_MESSAGE: &str = "This is the RF Prediction API. Use POST /predict.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(status))
        .route("/predict", post(predict))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub message: &'static str,
}

async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: STATUS_MESSAGE,
    })
}

/// Request body; field order matches the classifier input.
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub frequency: f64,
    pub power: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub hour: i64,
}

impl From<PredictRequest> for FeatureVector {
    fn from(req: PredictRequest) -> Self {
        FeatureVector {
            frequency: req.frequency,
            power: req.power,
            latitude: req.latitude,
            longitude: req.longitude,
            hour: req.hour,
        }
    }
}

async fn predict(
    State(state): State<AppState>,
    Json(body): Json<PredictRequest>,
) -> Result<Json<Prediction>, ApiError> {
    if !(0..24).contains(&body.hour) {
        return Err(ApiError::bad_request("hour must be between 0 and 23"));
    }
    let features = FeatureVector::from(body);
    let prediction = state.predictor().predict(&features);
    tracing::debug!(
        frequency = features.frequency,
        power = features.power,
        interference = prediction.interference,
        confidence = prediction.confidence,
        "prediction"
    );
    Ok(Json(prediction))
}
