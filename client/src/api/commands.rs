//! CLI Commands - One function per `neurofeel` subcommand
//!
//! Commands return serializable views; rendering happens in `render.rs`.

use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::context::AppContext;
use crate::logic::backend::*;
use crate::logic::history::{HistoryEntry, PredictionRecord, PredictionSource};
use crate::logic::prediction::BatchRun;
use crate::logic::ranking::{rank_features, RankedFeature, DEFAULT_TOP_FEATURES};
use crate::logic::session::Action;

// ============================================================================
// VIEWS
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SampleView {
    pub details: SampleDetails,
    pub top_features: Vec<RankedFeature>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionView {
    pub result: PredictionResult,
    pub top_features: Vec<RankedFeature>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WesadView {
    pub request: WesadPredictionRequest,
    pub prediction: WesadPrediction,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureView {
    pub target: Dimension,
    pub mapping: Vec<FeatureMappingEntry>,
    pub top_features: Vec<RankedFeature>,
}

/// Per-subject evaluation, or the cross-subject summary when no subject is
/// given
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EvaluationView {
    Subject(EvaluationResult),
    Overall(OverallPerformance),
}

/// History entry as displayed
#[derive(Debug, Clone, Serialize)]
pub struct HistoryRow {
    pub sequence: u64,
    pub source: PredictionSource,
    pub when: String,
    pub summary: String,
}

impl HistoryRow {
    pub fn from_entry(entry: &HistoryEntry, now: chrono::DateTime<Utc>) -> Self {
        Self {
            sequence: entry.sequence,
            source: entry.source,
            when: entry.relative_time(now),
            summary: summarize(&entry.record),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DemoReport {
    pub predictions: usize,
    pub failures: Vec<String>,
    pub history: Vec<HistoryRow>,
}

fn mark(correct: bool) -> &'static str {
    if correct { "✓" } else { "✗" }
}

fn summarize(record: &PredictionRecord) -> String {
    match record {
        PredictionRecord::CrossDataset(result) => {
            let dims: Vec<String> = Dimension::ALL
                .iter()
                .filter_map(|d| {
                    result
                        .prediction(*d)
                        .map(|p| format!("{} {} {}", d, p.class, mark(result.is_correct(*d))))
                })
                .collect();
            format!("{} #{}: {}", result.direction, result.sample_index, dims.join(", "))
        }
        PredictionRecord::Wesad {
            subject_id,
            sample_index,
            prediction,
        } => format!(
            "subject {} #{}: {} (personal {}, true {})",
            subject_id,
            sample_index,
            prediction.personal_model.emotion_name,
            mark(prediction.is_correct(WesadModel::Personal)),
            prediction.accuracy.true_emotion
        ),
    }
}

// ============================================================================
// CROSS-DATASET MODEL
// ============================================================================

pub async fn health(ctx: &AppContext) -> Result<CrossHealth, String> {
    ctx.dashboard.health().await.map_err(|e| e.to_string())
}

pub async fn samples(ctx: &AppContext) -> Result<AvailableSamples, String> {
    ctx.dashboard.samples().await.map_err(|e| e.to_string())
}

pub async fn sample_details(ctx: &AppContext, direction: Direction, index: u32) -> Result<SampleView, String> {
    let details = ctx
        .dashboard
        .sample_details(direction, index)
        .await
        .map_err(|e| e.to_string())?;
    let top_features = rank_features(&details.features, DEFAULT_TOP_FEATURES);

    Ok(SampleView { details, top_features })
}

pub async fn predict(ctx: &AppContext, request: PredictionRequest) -> Result<PredictionView, String> {
    ctx.store.dispatch(Action::SelectDirection(request.direction));
    ctx.store.dispatch(Action::SelectSample(request.sample_index));

    let result = ctx
        .cross_flow
        .make_prediction(request)
        .await
        .map_err(|e| e.to_string())?;
    let top_features = rank_features(&result.features_used, DEFAULT_TOP_FEATURES);

    Ok(PredictionView { result, top_features })
}

pub async fn predict_wesad(ctx: &AppContext, request: WesadPredictionRequest) -> Result<WesadView, String> {
    ctx.store.dispatch(Action::SelectSubject(request.subject_id));

    let prediction = ctx
        .wesad_flow
        .make_prediction(request)
        .await
        .map_err(|e| e.to_string())?;

    Ok(WesadView { request, prediction })
}

/// Batch over the sample pool of `direction`; `cancel` stops it early
pub async fn batch(ctx: &AppContext, direction: Direction, cancel: &CancellationToken) -> Result<BatchRun, String> {
    ctx.store.dispatch(Action::SelectDirection(direction));
    ctx.batch
        .run_for(direction, cancel)
        .await
        .map_err(|e| e.to_string())
}

pub async fn models(ctx: &AppContext) -> Result<ModelInfo, String> {
    ctx.dashboard.model_info().await.map_err(|e| e.to_string())
}

// ============================================================================
// DASHBOARD
// ============================================================================

pub async fn overview(ctx: &AppContext) -> Result<Overview, String> {
    ctx.dashboard.overview().await.map_err(|e| e.to_string())
}

pub async fn confusion_matrices(ctx: &AppContext, target: Dimension) -> Result<ConfusionMatrices, String> {
    ctx.dashboard
        .confusion_matrices(target)
        .await
        .map_err(|e| e.to_string())
}

pub async fn domain_gap(ctx: &AppContext, target: Dimension) -> Result<DomainGap, String> {
    ctx.dashboard.domain_gap(target).await.map_err(|e| e.to_string())
}

pub async fn feature_mapping(ctx: &AppContext, target: Dimension, top_n: usize) -> Result<FeatureView, String> {
    let mapping = ctx
        .dashboard
        .feature_mapping(target)
        .await
        .map_err(|e| e.to_string())?;
    let top_features = rank_features(&mapping_importances(&mapping), top_n);

    Ok(FeatureView {
        target,
        mapping,
        top_features,
    })
}

pub async fn class_distribution(ctx: &AppContext) -> Result<ClassDistribution, String> {
    ctx.dashboard
        .class_distribution()
        .await
        .map_err(|e| e.to_string())
}

pub async fn wesad_subjects(ctx: &AppContext) -> Result<Vec<SubjectInfo>, String> {
    ctx.dashboard.wesad_subjects().await.map_err(|e| e.to_string())
}

pub async fn evaluate(ctx: &AppContext, subject_id: Option<u32>) -> Result<EvaluationView, String> {
    let view = match subject_id {
        Some(id) => {
            ctx.store.dispatch(Action::SelectSubject(id));
            EvaluationView::Subject(ctx.dashboard.wesad_evaluation(id).await.map_err(|e| e.to_string())?)
        }
        None => EvaluationView::Overall(
            ctx.dashboard
                .wesad_overall_performance()
                .await
                .map_err(|e| e.to_string())?,
        ),
    };
    Ok(view)
}

// ============================================================================
// DEMO SESSION
// ============================================================================

/// Scripted session: `per_direction` single predictions in each direction
/// plus one WESAD prediction per subject (up to two), then the history
pub async fn demo(ctx: &AppContext, per_direction: u32) -> Result<DemoReport, String> {
    let samples = ctx.dashboard.samples().await.map_err(|e| e.to_string())?;
    let mut predictions = 0;
    let mut failures = Vec::new();

    for direction in Direction::ALL {
        for index in 0..per_direction.min(samples.samples_for(direction)) {
            match predict(ctx, PredictionRequest::both(direction, index)).await {
                Ok(_) => predictions += 1,
                Err(e) => failures.push(format!("{} #{}: {}", direction, index, e)),
            }
        }
    }

    match ctx.dashboard.wesad_subjects().await {
        Ok(subjects) => {
            for subject in subjects.iter().filter(|s| s.num_samples > 0).take(2) {
                let request = WesadPredictionRequest {
                    subject_id: subject.subject_id,
                    sample_index: 0,
                };
                match predict_wesad(ctx, request).await {
                    Ok(_) => predictions += 1,
                    Err(e) => failures.push(format!("subject {}: {}", subject.subject_id, e)),
                }
            }
        }
        Err(e) => failures.push(format!("subjects: {}", e)),
    }

    Ok(DemoReport {
        predictions,
        failures,
        history: history(ctx),
    })
}

pub fn history(ctx: &AppContext) -> Vec<HistoryRow> {
    let now = Utc::now();
    ctx.store
        .history()
        .iter()
        .map(|entry| HistoryRow::from_entry(entry, now))
        .collect()
}
