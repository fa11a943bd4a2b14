//! Prediction API backend
//!
//! Typed HTTP client of the NeuroFeel API plus the [`PredictionApi`] seam the
//! prediction flows and the batch orchestrator are written against.

mod client;
pub mod dashboard;
pub mod types;

use async_trait::async_trait;

pub use client::ApiClient;
pub use dashboard::*;
pub use types::*;

use crate::logic::error::ApiResult;

/// Calls the prediction flows depend on. Implemented by [`ApiClient`];
/// tests substitute scripted fakes.
#[async_trait]
pub trait PredictionApi: Send + Sync {
    /// Sample pool sizes of both datasets
    async fn available_samples(&self) -> ApiResult<AvailableSamples>;

    /// One cross-dataset prediction
    async fn predict(&self, request: &PredictionRequest) -> ApiResult<PredictionResult>;

    /// All four WESAD model scores for one subject sample
    async fn predict_wesad(&self, request: &WesadPredictionRequest) -> ApiResult<WesadPrediction>;
}
