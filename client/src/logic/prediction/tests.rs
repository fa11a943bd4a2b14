//! Flow and batch orchestrator tests against a scripted API

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::logic::backend::*;
use crate::logic::config::ClientConfig;
use crate::logic::error::{ApiError, ApiResult};
use crate::logic::history::{PredictionRecord, PredictionSource};
use crate::logic::session::SessionStore;

// ============================================================================
// SCRIPTED API
// ============================================================================

#[derive(Default)]
struct ScriptedApi {
    available: u32,
    failing: HashSet<u32>,
    arousal_wrong: HashSet<u32>,
    valence_wrong: HashSet<u32>,
    latency: Duration,
    /// Requests wait here before answering when set
    gate: Option<Arc<Notify>>,
    /// Only these indices wait on `gate`; empty means all of them
    gated: HashSet<u32>,
    samples_error: Option<ApiError>,
    /// (sample index, start, end) per predict call
    calls: Mutex<Vec<(u32, Instant, Instant)>>,
}

impl ScriptedApi {
    fn with_samples(available: u32) -> Self {
        Self {
            available,
            ..Self::default()
        }
    }

    fn call_indices(&self) -> Vec<u32> {
        self.calls.lock().iter().map(|(i, _, _)| *i).collect()
    }
}

fn prediction(correct: bool, truth: Level) -> DimensionPrediction {
    let class = match (correct, truth) {
        (true, t) => t,
        (false, Level::High) => Level::Low,
        (false, Level::Low) => Level::High,
    };
    DimensionPrediction {
        class,
        confidence: 0.7,
        probability: if class == Level::High { 0.7 } else { 0.3 },
    }
}

fn wesad_score(emotion_id: usize) -> EmotionScore {
    EmotionScore {
        emotion_id,
        emotion_name: EMOTION_CLASSES[emotion_id].to_string(),
        probabilities: EMOTION_CLASSES
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), if i == emotion_id { 0.7 } else { 0.1 }))
            .collect(),
        confidence: 0.7,
    }
}

#[async_trait]
impl PredictionApi for ScriptedApi {
    async fn available_samples(&self) -> ApiResult<AvailableSamples> {
        if let Some(e) = &self.samples_error {
            return Err(e.clone());
        }
        Ok(AvailableSamples {
            wesad_samples: self.available,
            kemocon_samples: self.available,
            wesad_subjects: vec![2, 3],
            kemocon_participants: vec![1, 4],
            feature_lists: BTreeMap::new(),
        })
    }

    async fn predict(&self, request: &PredictionRequest) -> ApiResult<PredictionResult> {
        let start = Instant::now();
        if let Some(gate) = &self.gate {
            if self.gated.is_empty() || self.gated.contains(&request.sample_index) {
                gate.notified().await;
            }
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.calls.lock().push((request.sample_index, start, Instant::now()));

        let index = request.sample_index;
        if self.failing.contains(&index) || index >= self.available {
            return Err(ApiError::Status {
                status: 500,
                detail: format!("Prediction error for sample {}", index),
            });
        }

        let truth = GroundTruth {
            arousal: if index % 2 == 0 { Level::High } else { Level::Low },
            valence: Level::High,
        };
        Ok(PredictionResult {
            direction: request.direction,
            sample_index: index,
            subject_id: Some(index + 1),
            arousal: Some(prediction(!self.arousal_wrong.contains(&index), truth.arousal)),
            valence: Some(prediction(!self.valence_wrong.contains(&index), truth.valence)),
            ground_truth: truth,
            features_used: BTreeMap::from([("hr_mean".to_string(), 70.0 + index as f64)]),
            confidence: BTreeMap::new(),
        })
    }

    async fn predict_wesad(&self, request: &WesadPredictionRequest) -> ApiResult<WesadPrediction> {
        if request.subject_id == 99 {
            return Err(ApiError::Status {
                status: 404,
                detail: "Test data for subject SS99 not found".to_string(),
            });
        }
        Ok(WesadPrediction {
            base_model: wesad_score(0),
            personal_model: wesad_score(2),
            ensemble_model: wesad_score(2),
            adaptive_model: wesad_score(2),
            accuracy: WesadAccuracy {
                true_emotion_id: 2,
                true_emotion: "Amusement".to_string(),
                base_correct: 0,
                personal_correct: 1,
                ensemble_correct: 1,
                adaptive_correct: 1,
            },
        })
    }
}

fn orchestrator(api: Arc<ScriptedApi>, store: SessionStore) -> BatchOrchestrator {
    BatchOrchestrator::new(api, store, &ClientConfig::with_api_url("http://unused"))
        .with_pacing(PacingPolicy::none())
}

// ============================================================================
// BATCH
// ============================================================================

#[tokio::test]
async fn test_batch_accuracy_over_successes() {
    let api = Arc::new(ScriptedApi {
        failing: HashSet::from([3, 7]),
        arousal_wrong: HashSet::from([1, 5]),
        valence_wrong: HashSet::from([8]),
        ..ScriptedApi::with_samples(12)
    });
    let store = SessionStore::default();

    let run = orchestrator(api.clone(), store.clone())
        .run(Direction::WesadToKemocon, 12)
        .await;

    assert_eq!(run.requested, 10);
    assert_eq!(run.stats.total, 8);
    assert_eq!(run.stats.arousal_accuracy, 0.75);
    assert_eq!(run.stats.valence_accuracy, 0.875);
    assert_eq!(run.stats.overall_accuracy, Some(0.8125));
    assert_eq!(
        run.failures.iter().map(|f| f.sample_index).collect::<Vec<_>>(),
        vec![3, 7]
    );
    assert!(run.failures[0].error.contains("500"));
    assert!(!run.cancelled);
    assert_eq!(api.call_indices(), (0..10).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_batch_all_failed() {
    let api = Arc::new(ScriptedApi {
        failing: (0..4).collect(),
        ..ScriptedApi::with_samples(4)
    });

    let run = orchestrator(api, SessionStore::default())
        .run(Direction::KemoconToWesad, 4)
        .await;

    assert_eq!(run.stats.total, 0);
    assert_eq!(run.stats.arousal_accuracy, 0.0);
    assert_eq!(run.stats.valence_accuracy, 0.0);
    assert_eq!(run.stats.overall_accuracy, Some(0.0));
    assert_eq!(run.failures.len(), 4);
}

#[tokio::test]
async fn test_batch_results_in_sample_order() {
    let api = Arc::new(ScriptedApi {
        failing: HashSet::from([1]),
        ..ScriptedApi::with_samples(5)
    });

    let run = orchestrator(api, SessionStore::default())
        .run(Direction::WesadToKemocon, 3)
        .await;

    assert_eq!(run.requested, 3);
    assert_eq!(
        run.results.iter().map(|r| r.sample_index).collect::<Vec<_>>(),
        vec![0, 2]
    );
    assert_eq!(run.stats.total, run.results.len());
}

#[tokio::test(start_paused = true)]
async fn test_batch_requests_sequential_and_paced() {
    let api = Arc::new(ScriptedApi {
        latency: Duration::from_millis(50),
        failing: HashSet::from([2]),
        ..ScriptedApi::with_samples(6)
    });
    let batch = orchestrator(api.clone(), SessionStore::default())
        .with_pacing(PacingPolicy::fixed(Duration::from_millis(300)));

    let started = Instant::now();
    batch.run(Direction::WesadToKemocon, 6).await;

    let calls = api.calls.lock().clone();
    assert_eq!(calls.len(), 6);
    for pair in calls.windows(2) {
        let (prev_index, _, prev_end) = pair[0];
        let (next_index, next_start, _) = pair[1];
        assert_eq!(next_index, prev_index + 1);
        assert!(next_start >= prev_end + Duration::from_millis(300));
    }
    // no pause after the last request
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(6 * 50 + 5 * 300));
    assert!(elapsed < Duration::from_millis(6 * 50 + 6 * 300));
}

#[tokio::test(start_paused = true)]
async fn test_batch_cancel_returns_partial_run() {
    let api = Arc::new(ScriptedApi::with_samples(10));
    let store = SessionStore::default();
    let batch = orchestrator(api.clone(), store.clone())
        .with_pacing(PacingPolicy::fixed(Duration::from_millis(300)));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(700)).await;
        trigger.cancel();
    });

    let run = batch.run_with(Direction::WesadToKemocon, 10, &cancel).await;

    assert!(run.cancelled);
    assert_eq!(run.results.len(), 3);
    assert_eq!(run.requested, 10);
    assert_eq!(api.call_indices(), vec![0, 1, 2]);
    assert!(!store.is_batch_loading());
    assert_eq!(store.last_batch(), Some(run));
}

#[tokio::test]
async fn test_batch_publishes_to_store_not_history() {
    let api = Arc::new(ScriptedApi::with_samples(3));
    let store = SessionStore::default();
    let mut rx = store.subscribe();

    let run = orchestrator(api, store.clone())
        .run(Direction::KemoconToWesad, 3)
        .await;

    assert!(rx.has_changed().unwrap());
    let state = rx.borrow_and_update().clone();
    assert!(!state.batch.loading);
    assert_eq!(state.batch.last_run, Some(run));
    assert_eq!(state.revision, 2);
    assert!(state.history.is_empty());
}

#[tokio::test]
async fn test_batch_loading_while_running() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(ScriptedApi {
        gate: Some(gate.clone()),
        ..ScriptedApi::with_samples(1)
    });
    let store = SessionStore::default();
    let batch = orchestrator(api, store.clone());

    let handle = tokio::spawn(async move { batch.run(Direction::WesadToKemocon, 1).await });
    let mut rx = store.subscribe();
    while !rx.borrow_and_update().batch.loading {
        rx.changed().await.unwrap();
    }

    gate.notify_one();
    let run = handle.await.unwrap();
    assert_eq!(run.stats.total, 1);
    assert!(!store.is_batch_loading());
}

#[tokio::test]
async fn test_run_for_uses_sample_pool() {
    let api = Arc::new(ScriptedApi::with_samples(4));
    let run = orchestrator(api, SessionStore::default())
        .run_for(Direction::KemoconToWesad, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.requested, 4);
    assert_eq!(run.stats.total, 4);
}

#[tokio::test]
async fn test_run_for_lookup_failure_clears_loading() {
    let api = Arc::new(ScriptedApi {
        samples_error: Some(ApiError::Status { status: 503, detail: "Models not loaded".into() }),
        ..ScriptedApi::with_samples(4)
    });
    let store = SessionStore::default();

    let err = orchestrator(api.clone(), store.clone())
        .run_for(Direction::WesadToKemocon, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    let batch = store.snapshot().batch;
    assert!(!batch.loading);
    assert!(batch.error.unwrap().contains("Models not loaded"));
    assert!(api.call_indices().is_empty());
}

#[test]
fn test_sample_ceiling() {
    let api = Arc::new(ScriptedApi::default());
    let batch = orchestrator(api, SessionStore::default());
    assert_eq!(batch.sample_ceiling(3), 3);
    assert_eq!(batch.sample_ceiling(250), 10);
}

// ============================================================================
// FLOWS
// ============================================================================

#[tokio::test]
async fn test_flow_success_records_history() {
    let store = SessionStore::default();
    let flow = CrossDatasetFlow::new(Arc::new(ScriptedApi::with_samples(5)), store.clone());

    let result = flow
        .make_prediction(PredictionRequest::both(Direction::WesadToKemocon, 2))
        .await
        .unwrap();

    assert_eq!(result.sample_index, 2);
    assert!(!flow.is_loading());
    assert_eq!(flow.error(), None);
    assert_eq!(flow.last_result(), Some(result.clone()));

    let history = store.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].source, PredictionSource::CrossDataset);
    assert_eq!(history[0].record, PredictionRecord::CrossDataset(result));
}

#[tokio::test]
async fn test_flow_failure_sets_error_without_history() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(ScriptedApi {
        failing: HashSet::from([4]),
        gate: Some(gate.clone()),
        ..ScriptedApi::with_samples(5)
    });
    let store = SessionStore::default();
    let flow = Arc::new(CrossDatasetFlow::new(api, store.clone()));
    let mut rx = flow.subscribe();

    let task = {
        let flow = flow.clone();
        tokio::spawn(async move {
            flow.make_prediction(PredictionRequest::both(Direction::WesadToKemocon, 4))
                .await
        })
    };

    while !rx.borrow_and_update().loading {
        rx.changed().await.unwrap();
    }
    assert!(flow.is_loading());

    gate.notify_one();
    let err = task.await.unwrap().unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert!(!flow.is_loading());
    assert_eq!(flow.error(), Some(err.to_string()));
    assert!(store.history().is_empty());

    flow.clear_error();
    assert_eq!(flow.error(), None);
}

#[tokio::test]
async fn test_flow_overlapping_requests() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(ScriptedApi {
        failing: HashSet::from([1]),
        gate: Some(gate.clone()),
        gated: HashSet::from([0]),
        ..ScriptedApi::with_samples(5)
    });
    let store = SessionStore::default();
    let flow = Arc::new(CrossDatasetFlow::new(api, store.clone()));
    let mut rx = flow.subscribe();

    let slow = {
        let flow = flow.clone();
        tokio::spawn(async move {
            flow.make_prediction(PredictionRequest::both(Direction::WesadToKemocon, 0))
                .await
        })
    };
    while !rx.borrow_and_update().loading {
        rx.changed().await.unwrap();
    }

    let fast = flow
        .make_prediction(PredictionRequest::both(Direction::WesadToKemocon, 1))
        .await;
    assert!(fast.is_err());
    assert!(flow.is_loading());
    assert_eq!(flow.subscribe().borrow().in_flight, 1);
    let fast_error = flow.error();
    assert!(fast_error.is_some());

    gate.notify_one();
    let slow_result = slow.await.unwrap().unwrap();

    assert!(!flow.is_loading());
    assert_eq!(flow.subscribe().borrow().in_flight, 0);
    // the later request settled the visible state
    assert_eq!(flow.error(), fast_error);
    assert!(flow.last_result().is_none());
    // the stale success still lands in history
    let history = store.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].record, PredictionRecord::CrossDataset(slow_result));
}

#[tokio::test]
async fn test_flow_new_request_clears_error() {
    let api = Arc::new(ScriptedApi {
        failing: HashSet::from([1]),
        ..ScriptedApi::with_samples(5)
    });
    let flow = CrossDatasetFlow::new(api, SessionStore::default());

    assert!(flow
        .make_prediction(PredictionRequest::both(Direction::KemoconToWesad, 1))
        .await
        .is_err());
    assert!(flow.error().is_some());

    flow.make_prediction(PredictionRequest::both(Direction::KemoconToWesad, 0))
        .await
        .unwrap();
    assert_eq!(flow.error(), None);
}

#[tokio::test]
async fn test_flow_cancelled() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(ScriptedApi {
        gate: Some(gate),
        ..ScriptedApi::with_samples(5)
    });
    let store = SessionStore::default();
    let flow = CrossDatasetFlow::new(api, store.clone());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = flow
        .make_prediction_with(PredictionRequest::both(Direction::WesadToKemocon, 0), &cancel)
        .await
        .unwrap_err();

    assert_eq!(err, ApiError::Cancelled);
    assert!(!flow.is_loading());
    assert!(store.history().is_empty());
}

#[tokio::test]
async fn test_flows_share_history_capped() {
    let api: Arc<ScriptedApi> = Arc::new(ScriptedApi::with_samples(10));
    let store = SessionStore::new(5);
    let cross = CrossDatasetFlow::new(api.clone(), store.clone());
    let wesad = WesadFlow::new(api, store.clone());

    for index in 0..4 {
        cross
            .make_prediction(PredictionRequest::both(Direction::WesadToKemocon, index))
            .await
            .unwrap();
    }
    let scored = wesad
        .make_prediction(WesadPredictionRequest { subject_id: 2, sample_index: 1 })
        .await
        .unwrap();
    assert!(scored.is_correct(WesadModel::Personal));
    cross
        .make_prediction(PredictionRequest::both(Direction::WesadToKemocon, 9))
        .await
        .unwrap();

    let history = store.history();
    assert_eq!(history.len(), 5);
    assert_eq!(history[0].source, PredictionSource::CrossDataset);
    assert_eq!(history[1].source, PredictionSource::Wesad);
    assert!(matches!(
        &history[1].record,
        PredictionRecord::Wesad { subject_id: 2, sample_index: 1, .. }
    ));
    let sequences: Vec<u64> = history.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![5, 4, 3, 2, 1]);
}

#[tokio::test]
async fn test_wesad_flow_failure() {
    let store = SessionStore::default();
    let flow = WesadFlow::new(Arc::new(ScriptedApi::default()), store.clone());

    let err = flow
        .make_prediction(WesadPredictionRequest { subject_id: 99, sample_index: 0 })
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert!(flow.error().unwrap().contains("SS99"));
    assert!(store.history().is_empty());
}
