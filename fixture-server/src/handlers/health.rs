//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{CrossHealthResponse, Direction, Target};
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
}

/// Liveness of the fixture server itself
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

/// Health of the cross-dataset model API: which models are loaded and how
/// many demo samples each dataset holds
pub async fn cross_dataset(State(state): State<AppState>) -> Json<CrossHealthResponse> {
    let fixture = &state.fixture;

    let models = Target::ALL
        .iter()
        .map(|target| {
            let directions = Direction::ALL
                .iter()
                .filter(|d| fixture.model(*target, **d).is_ok())
                .map(|d| d.as_str())
                .collect();
            (target.as_str(), directions)
        })
        .collect();

    let samples = BTreeMap::from([
        ("wesad", fixture.cross_dataset.wesad.samples.len()),
        ("kemocon", fixture.cross_dataset.kemocon.samples.len()),
    ]);

    Json(CrossHealthResponse {
        status: "ok",
        models,
        samples,
    })
}
