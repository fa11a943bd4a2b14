//! Single-prediction flows
//!
//! One flow per model family. A flow exposes its `loading`/`error` state
//! through a watch channel. Requests may overlap: `loading` stays set while
//! any of them is in flight, and only the most recently issued request
//! settles `error` and `last_result`. Every successful prediction is recorded
//! in the session history; failures are kept in `error` until cleared or until
//! the next request.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::logic::backend::{
    PredictionApi, PredictionRequest, PredictionResult, WesadPrediction, WesadPredictionRequest,
};
use crate::logic::error::{ApiError, ApiResult};
use crate::logic::history::PredictionRecord;
use crate::logic::session::{Action, SessionStore};

// ============================================================================
// REQUESTS
// ============================================================================

/// A request a [`PredictionFlow`] can execute
#[async_trait]
pub trait FlowRequest: Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    /// Flow name used in log lines
    const NAME: &'static str;

    async fn execute(&self, api: &dyn PredictionApi) -> ApiResult<Self::Output>;

    /// History record of a successful prediction
    fn record(&self, output: &Self::Output) -> PredictionRecord;
}

#[async_trait]
impl FlowRequest for PredictionRequest {
    type Output = PredictionResult;
    const NAME: &'static str = "cross-dataset";

    async fn execute(&self, api: &dyn PredictionApi) -> ApiResult<PredictionResult> {
        api.predict(self).await
    }

    fn record(&self, output: &PredictionResult) -> PredictionRecord {
        PredictionRecord::CrossDataset(output.clone())
    }
}

#[async_trait]
impl FlowRequest for WesadPredictionRequest {
    type Output = WesadPrediction;
    const NAME: &'static str = "wesad";

    async fn execute(&self, api: &dyn PredictionApi) -> ApiResult<WesadPrediction> {
        api.predict_wesad(self).await
    }

    fn record(&self, output: &WesadPrediction) -> PredictionRecord {
        PredictionRecord::Wesad {
            subject_id: self.subject_id,
            sample_index: self.sample_index,
            prediction: output.clone(),
        }
    }
}

// ============================================================================
// FLOW
// ============================================================================

#[derive(Debug, Clone)]
pub struct FlowState<T> {
    pub loading: bool,
    pub error: Option<String>,
    pub last_result: Option<T>,
    /// Requests started but not yet settled
    pub in_flight: usize,
    /// Id of the most recently issued request
    latest: u64,
}

impl<T> Default for FlowState<T> {
    fn default() -> Self {
        Self {
            loading: false,
            error: None,
            last_result: None,
            in_flight: 0,
            latest: 0,
        }
    }
}

pub struct PredictionFlow<R: FlowRequest> {
    api: Arc<dyn PredictionApi>,
    store: SessionStore,
    state: watch::Sender<FlowState<R::Output>>,
}

pub type CrossDatasetFlow = PredictionFlow<PredictionRequest>;
pub type WesadFlow = PredictionFlow<WesadPredictionRequest>;

impl<R: FlowRequest> PredictionFlow<R> {
    pub fn new(api: Arc<dyn PredictionApi>, store: SessionStore) -> Self {
        let (state, _rx) = watch::channel(FlowState::default());
        Self { api, store, state }
    }

    pub async fn make_prediction(&self, request: R) -> ApiResult<R::Output> {
        self.make_prediction_with(request, &CancellationToken::new()).await
    }

    /// Like [`make_prediction`](Self::make_prediction); `cancel` aborts the
    /// in-flight request
    pub async fn make_prediction_with(
        &self,
        request: R,
        cancel: &CancellationToken,
    ) -> ApiResult<R::Output> {
        let mut id = 0;
        self.state.send_modify(|s| {
            s.latest += 1;
            id = s.latest;
            s.in_flight += 1;
            s.loading = true;
            s.error = None;
        });

        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            result = request.execute(self.api.as_ref()) => result,
        };

        match &outcome {
            Ok(output) => self.store.dispatch(Action::RecordPrediction(request.record(output))),
            Err(e) => log::warn!("{} prediction failed: {}", R::NAME, e),
        }

        self.state.send_modify(|s| {
            s.in_flight = s.in_flight.saturating_sub(1);
            s.loading = s.in_flight > 0;
            if s.latest != id {
                log::debug!("{} request {} superseded by {}", R::NAME, id, s.latest);
                return;
            }
            match &outcome {
                Ok(output) => s.last_result = Some(output.clone()),
                Err(e) => s.error = Some(e.to_string()),
            }
        });

        outcome
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    pub fn last_result(&self) -> Option<R::Output> {
        self.state.borrow().last_result.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowState<R::Output>> {
        self.state.subscribe()
    }
}
