//! Simulated spectrum views.
//!
//! GET /data - raw simulated sweep
//! GET /interference - sweep readings flagged by the spike/overlap rule
//! GET /ml-interference - sweep readings classified by the model

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Timelike;
use serde::Serialize;

use specscope_common::models::{FeatureVector, RawReading};

use crate::api::error::ApiError;
use crate::state::AppState;

pub const DATA_SAMPLES: usize = 500;
pub const ML_SAMPLES: usize = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/data", get(data))
        .route("/interference", get(interference))
        .route("/ml-interference", get(ml_interference))
}

/// Pull readings off the async runtime; the source may run a subprocess.
async fn sample(state: &AppState, samples: usize) -> Result<Vec<RawReading>, ApiError> {
    let source = state.source();
    let readings = tokio::task::spawn_blocking(move || source.readings(samples))
        .await
        .map_err(|e| ApiError::internal(format!("data source task failed: {e}")))??;
    Ok(readings)
}

async fn data(State(state): State<AppState>) -> Result<Json<Vec<RawReading>>, ApiError> {
    Ok(Json(sample(&state, DATA_SAMPLES).await?))
}

async fn interference(State(state): State<AppState>) -> Result<Json<Vec<RawReading>>, ApiError> {
    let readings = sample(&state, DATA_SAMPLES).await?;
    let flagged = state.detector().detect(&readings);
    tracing::debug!(total = readings.len(), flagged = flagged.len(), "rule-based detection");
    Ok(Json(flagged))
}

#[derive(Debug, Serialize)]
pub struct ClassifiedReading {
    pub timestamp: Option<String>,
    pub frequency: f64,
    pub power: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub interference: bool,
    pub confidence: f64,
}

async fn ml_interference(
    State(state): State<AppState>,
) -> Result<Json<Vec<ClassifiedReading>>, ApiError> {
    let readings = sample(&state, ML_SAMPLES).await?;
    let hour = i64::from(chrono::Local::now().hour());

    let mut skipped = 0usize;
    let mut out = Vec::with_capacity(readings.len());
    for reading in readings {
        let (Some(frequency), Some(power), Some(latitude), Some(longitude)) = (
            reading.frequency,
            reading.power,
            reading.latitude,
            reading.longitude,
        ) else {
            skipped += 1;
            continue;
        };
        let prediction = state.predictor().predict(&FeatureVector {
            frequency,
            power,
            latitude,
            longitude,
            hour,
        });
        out.push(ClassifiedReading {
            timestamp: reading.timestamp,
            frequency,
            power,
            latitude,
            longitude,
            interference: prediction.interference,
            confidence: prediction.confidence,
        });
    }
    if skipped > 0 {
        tracing::warn!(skipped, "readings without a complete feature vector were skipped");
    }
    Ok(Json(out))
}
