//! REST handlers.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::AppState;
use super::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhReading {
    #[serde(rename = "pH")]
    pub ph: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashCountReport {
    pub count: i64,
}

/// Acknowledgement echoing the logged payload.
#[derive(Debug, Serialize)]
pub struct Logged<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T> Logged<T> {
    fn success(data: T) -> Json<Self> {
        Json(Self {
            status: "success",
            data,
        })
    }
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Trash Detection API" }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn status() -> Json<Value> {
    Json(json!({ "status": "Monitoring" }))
}

pub async fn trash_count(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "count": state.total.get() }))
}

pub async fn log_ph(
    payload: Result<Json<PhReading>, JsonRejection>,
) -> Result<Json<Logged<PhReading>>, ApiError> {
    let Json(reading) = payload?;
    info!("pH data received: {}", reading.ph);
    Ok(Logged::success(reading))
}

pub async fn log_trash_count(
    payload: Result<Json<TrashCountReport>, JsonRejection>,
) -> Result<Json<Logged<TrashCountReport>>, ApiError> {
    let Json(report) = payload?;
    info!("Received trash count data: {}", report.count);
    Ok(Logged::success(report))
}
