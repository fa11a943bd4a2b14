//! Prediction Module - Single predictions and batch runs
//!
//! ## Structure
//! - `flow.rs` - single-prediction flows with observable loading/error state
//! - `batch.rs` - paced sequential batch orchestrator
//! - `pacing.rs` - pause policy between batch requests
//! - `stats.rs` - aggregate accuracy of a batch run

pub mod batch;
pub mod flow;
pub mod pacing;
pub mod stats;

#[cfg(test)]
mod tests;

pub use batch::{BatchFailure, BatchOrchestrator, BatchRun};
pub use flow::{CrossDatasetFlow, FlowRequest, FlowState, PredictionFlow, WesadFlow};
pub use pacing::PacingPolicy;
pub use stats::BatchStats;
