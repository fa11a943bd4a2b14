//! Batch Orchestrator - Paced sequential predictions
//!
//! Runs up to `batch_limit` predictions of one transfer direction, one at a
//! time in sample order, pausing between requests. Per-sample failures are
//! logged and recorded; they never stop the run. The session store sees
//! `StartBatch` before the first request and `BatchFinished` after the last.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::pacing::PacingPolicy;
use super::stats::BatchStats;
use crate::logic::backend::{Direction, PredictionApi, PredictionRequest, PredictionResult};
use crate::logic::config::ClientConfig;
use crate::logic::error::{ApiError, ApiResult};
use crate::logic::session::{Action, SessionStore};

// ============================================================================
// RUN
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub sample_index: u32,
    pub error: String,
}

/// Outcome of one batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRun {
    pub direction: Direction,
    /// Samples the run set out to predict
    pub requested: u32,
    /// Successful predictions in sample order
    pub results: Vec<PredictionResult>,
    pub failures: Vec<BatchFailure>,
    pub stats: BatchStats,
    /// Stopped early by the cancellation token
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchRun {
    /// Requests that were issued and resolved
    pub fn attempted(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at.signed_duration_since(self.started_at)
    }
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

pub struct BatchOrchestrator {
    api: Arc<dyn PredictionApi>,
    store: SessionStore,
    limit: usize,
    pacing: PacingPolicy,
}

impl BatchOrchestrator {
    pub fn new(api: Arc<dyn PredictionApi>, store: SessionStore, config: &ClientConfig) -> Self {
        Self {
            api,
            store,
            limit: config.batch_limit,
            pacing: config.pacing.clone(),
        }
    }

    pub fn with_pacing(mut self, pacing: PacingPolicy) -> Self {
        self.pacing = pacing;
        self
    }

    /// Samples a run over `available` samples will request
    pub fn sample_ceiling(&self, available: u32) -> u32 {
        let limit = u32::try_from(self.limit).unwrap_or(u32::MAX);
        available.min(limit)
    }

    pub async fn run(&self, direction: Direction, available: u32) -> BatchRun {
        self.run_with(direction, available, &CancellationToken::new()).await
    }

    /// Run over the first `available` samples of `direction`. Cancelling
    /// returns the partial run with `cancelled` set.
    pub async fn run_with(
        &self,
        direction: Direction,
        available: u32,
        cancel: &CancellationToken,
    ) -> BatchRun {
        self.store.dispatch(Action::StartBatch(direction));
        self.execute(direction, available, cancel).await
    }

    /// Look up the sample pool of `direction`, then run over it. A failed
    /// lookup finishes the batch slot and returns the error.
    pub async fn run_for(&self, direction: Direction, cancel: &CancellationToken) -> ApiResult<BatchRun> {
        self.store.dispatch(Action::StartBatch(direction));

        let lookup = tokio::select! {
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            samples = self.api.available_samples() => samples,
        };

        match lookup {
            Ok(samples) => Ok(self.execute(direction, samples.samples_for(direction), cancel).await),
            Err(e) => {
                log::warn!("Batch for {} aborted, sample lookup failed: {}", direction, e);
                self.store.dispatch(Action::BatchAborted(e.to_string()));
                Err(e)
            }
        }
    }

    async fn execute(&self, direction: Direction, available: u32, cancel: &CancellationToken) -> BatchRun {
        let started_at = Utc::now();
        let ceiling = self.sample_ceiling(available);
        log::info!("Batch prediction started: {} ({} samples)", direction, ceiling);

        let mut results = Vec::with_capacity(ceiling as usize);
        let mut failures = Vec::new();
        let mut consecutive_failures = 0u32;
        let mut cancelled = false;

        for index in 0..ceiling {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let request = PredictionRequest::both(direction, index);
            let outcome = tokio::select! {
                _ = cancel.cancelled() => Err(ApiError::Cancelled),
                result = self.api.predict(&request) => result,
            };

            match outcome {
                Ok(result) => {
                    results.push(result);
                    consecutive_failures = 0;
                }
                Err(ApiError::Cancelled) => {
                    cancelled = true;
                    break;
                }
                Err(e) => {
                    log::warn!("Error predicting sample {}: {}", index, e);
                    failures.push(BatchFailure {
                        sample_index: index,
                        error: e.to_string(),
                    });
                    consecutive_failures += 1;
                }
            }

            if index + 1 < ceiling && self.pacing.wait(consecutive_failures, cancel).await.is_err() {
                cancelled = true;
                break;
            }
        }

        let stats = BatchStats::from_results(&results);
        let run = BatchRun {
            direction,
            requested: ceiling,
            results,
            failures,
            stats,
            cancelled,
            started_at,
            finished_at: Utc::now(),
        };

        if cancelled {
            log::info!("Batch prediction cancelled after {} of {} samples", run.attempted(), ceiling);
        } else {
            log::info!(
                "Batch prediction finished: {} ok, {} failed",
                run.results.len(),
                run.failures.len()
            );
        }

        self.store.dispatch(Action::BatchFinished(run.clone()));
        run
    }
}
