//! WESAD personalised model handlers
//!
//! Each recorded sample carries the base and personal model probabilities.
//! The ensemble and adaptive scores are derived from those two the same way
//! the live API combines them.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::collections::BTreeMap;

use crate::models::{
    EmotionScore, EvaluationResponse, Improvements, OverallPerformanceResponse, PerModel,
    PerSubjectPerformance, PerformanceMetrics, SubjectInfo, WesadAccuracy, WesadPredictQuery,
    WesadPredictionResponse, WesadSubjectFixture, EMOTION_CLASSES,
};
use crate::{AppError, AppResult, AppState};

/// Minimum confidence for the adaptive selector to trust a model outright
const ADAPTIVE_THRESHOLD: f64 = 0.65;

/// List subjects with test data
pub async fn subjects(State(state): State<AppState>) -> Json<Vec<SubjectInfo>> {
    let mut subjects: Vec<SubjectInfo> = state
        .fixture
        .wesad
        .subjects
        .iter()
        .map(|subject| {
            let class_distribution = EMOTION_CLASSES
                .iter()
                .enumerate()
                .map(|(id, name)| {
                    let count = subject.samples.iter().filter(|s| s.label == id).count();
                    (*name, count)
                })
                .collect();

            SubjectInfo {
                subject_id: subject.subject_id,
                num_samples: subject.samples.len(),
                class_distribution,
            }
        })
        .collect();

    subjects.sort_by_key(|s| s.subject_id);
    Json(subjects)
}

/// Predict one sample of a subject with all four models
pub async fn predict(
    State(state): State<AppState>,
    Path(subject_id): Path<u32>,
    Query(query): Query<WesadPredictQuery>,
) -> AppResult<Json<WesadPredictionResponse>> {
    let subject = state.fixture.wesad_subject(subject_id).ok_or_else(|| {
        AppError::NotFound(format!("Test data for subject SS{} not found", subject_id))
    })?;

    let sample_count = subject.samples.len();
    let sample = usize::try_from(query.sample_index)
        .ok()
        .and_then(|index| subject.samples.get(index))
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "Invalid sample index. Must be between 0 and {}",
                sample_count as i64 - 1
            ))
        })?;

    let base = &sample.base_probabilities;
    let personal = &sample.personal_probabilities;
    let ensemble = ensemble(base, personal, subject.ensemble_weight);
    let adaptive = adaptive(base, personal);

    let label = sample.label;
    let correct = |probs: &[f64]| u8::from(argmax(probs) == label);

    Ok(Json(WesadPredictionResponse {
        accuracy: WesadAccuracy {
            true_emotion_id: label,
            true_emotion: EMOTION_CLASSES[label],
            base_correct: correct(base),
            personal_correct: correct(personal),
            ensemble_correct: correct(&ensemble),
            adaptive_correct: correct(&adaptive),
        },
        base_model: score(base),
        personal_model: score(personal),
        ensemble_model: score(&ensemble),
        adaptive_model: score(&adaptive),
    }))
}

/// Score all four models on every recorded sample of a subject
pub async fn evaluate(
    State(state): State<AppState>,
    Path(subject_id): Path<u32>,
) -> AppResult<Json<EvaluationResponse>> {
    let subject = state.fixture.wesad_subject(subject_id).ok_or_else(|| {
        AppError::NotFound(format!("Test data for subject SS{} not found", subject_id))
    })?;

    Ok(Json(evaluation(subject)))
}

/// Mean accuracy and macro F1 across all subjects
pub async fn overall_performance(State(state): State<AppState>) -> Json<OverallPerformanceResponse> {
    let mut subjects: Vec<&WesadSubjectFixture> = state.fixture.wesad.subjects.iter().collect();
    subjects.sort_by_key(|s| s.subject_id);

    let evaluations: Vec<EvaluationResponse> = subjects.iter().map(|s| evaluation(s)).collect();
    let column = |pick: fn(&EvaluationResponse) -> f64| -> Vec<f64> {
        evaluations.iter().map(pick).collect()
    };

    let metrics = PerformanceMetrics {
        base_accuracy: column(|e| e.accuracy.base),
        personal_accuracy: column(|e| e.accuracy.personal),
        ensemble_accuracy: column(|e| e.accuracy.ensemble),
        adaptive_accuracy: column(|e| e.accuracy.adaptive),
        base_f1: column(|e| e.f1_score.base),
        personal_f1: column(|e| e.f1_score.personal),
        ensemble_f1: column(|e| e.f1_score.ensemble),
        adaptive_f1: column(|e| e.f1_score.adaptive),
    };
    let mean_metrics = metrics.map(|values| mean(values));

    Json(OverallPerformanceResponse {
        improvements: Improvements {
            personal_vs_base: mean_metrics.personal_accuracy - mean_metrics.base_accuracy,
            ensemble_vs_base: mean_metrics.ensemble_accuracy - mean_metrics.base_accuracy,
            adaptive_vs_base: mean_metrics.adaptive_accuracy - mean_metrics.base_accuracy,
        },
        mean_metrics,
        per_subject: PerSubjectPerformance {
            subject_ids: subjects.iter().map(|s| s.subject_id).collect(),
            metrics,
        },
    })
}

// ============================================================================
// EVALUATION
// ============================================================================

pub fn evaluation(subject: &WesadSubjectFixture) -> EvaluationResponse {
    let labels: Vec<usize> = subject.samples.iter().map(|s| s.label).collect();

    let mut predicted: PerModel<Vec<usize>> = PerModel::default();
    for sample in &subject.samples {
        let base = &sample.base_probabilities;
        let personal = &sample.personal_probabilities;
        predicted.base.push(argmax(base));
        predicted.personal.push(argmax(personal));
        predicted.ensemble.push(argmax(&ensemble(base, personal, subject.ensemble_weight)));
        predicted.adaptive.push(argmax(&adaptive(base, personal)));
    }

    EvaluationResponse {
        subject_id: subject.subject_id,
        accuracy: predicted.map(|p| accuracy(&labels, p)),
        f1_score: predicted.map(|p| macro_f1(&labels, p)),
        confusion_matrix: predicted.map(|p| confusion_matrix(&labels, p)),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let hits = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    hits as f64 / truth.len() as f64
}

/// Unweighted mean of per-class F1 over the classes that occur in either
/// the labels or the predictions
fn macro_f1(truth: &[usize], predicted: &[usize]) -> f64 {
    let mut classes: Vec<usize> = truth.iter().chain(predicted).copied().collect();
    classes.sort_unstable();
    classes.dedup();

    let scores: Vec<f64> = classes
        .iter()
        .map(|&class| {
            let mut tp = 0usize;
            let mut fp = 0usize;
            let mut fn_ = 0usize;
            for (&t, &p) in truth.iter().zip(predicted) {
                match (t == class, p == class) {
                    (true, true) => tp += 1,
                    (false, true) => fp += 1,
                    (true, false) => fn_ += 1,
                    (false, false) => {}
                }
            }
            let denominator = 2 * tp + fp + fn_;
            if denominator == 0 { 0.0 } else { (2 * tp) as f64 / denominator as f64 }
        })
        .collect();

    mean(&scores)
}

/// Rows are true classes, columns predicted classes
fn confusion_matrix(truth: &[usize], predicted: &[usize]) -> Vec<Vec<usize>> {
    let classes = EMOTION_CLASSES.len();
    let mut matrix = vec![vec![0; classes]; classes];
    for (&t, &p) in truth.iter().zip(predicted) {
        if t < classes && p < classes {
            matrix[t][p] += 1;
        }
    }
    matrix
}

// ============================================================================
// SCORING
// ============================================================================

fn argmax(probs: &[f64]) -> usize {
    probs
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn confidence(probs: &[f64]) -> f64 {
    probs.iter().copied().fold(0.0, f64::max)
}

fn score(probs: &[f64]) -> EmotionScore {
    let id = argmax(probs);
    EmotionScore {
        emotion_id: id,
        emotion_name: EMOTION_CLASSES[id],
        probabilities: EMOTION_CLASSES
            .iter()
            .zip(probs)
            .map(|(name, p)| (*name, *p))
            .collect::<BTreeMap<_, _>>(),
        confidence: probs[id],
    }
}

/// Weighted blend of the base and personal model
pub fn ensemble(base: &[f64], personal: &[f64], weight: f64) -> Vec<f64> {
    base.iter()
        .zip(personal)
        .map(|(b, p)| b * weight + p * (1.0 - weight))
        .collect()
}

/// Pick whichever model is confident enough, preferring the base model only
/// when it is both confident and more confident than the personal model
pub fn adaptive(base: &[f64], personal: &[f64]) -> Vec<f64> {
    let base_conf = confidence(base);
    let personal_conf = confidence(personal);

    let use_base = if base_conf >= ADAPTIVE_THRESHOLD && base_conf > personal_conf {
        true
    } else if personal_conf >= ADAPTIVE_THRESHOLD {
        false
    } else {
        base_conf > personal_conf
    };

    if use_base { base.to_vec() } else { personal.to_vec() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensemble_weighting() {
        let blended = ensemble(&[1.0, 0.0], &[0.0, 1.0], 0.25);
        assert_eq!(blended, vec![0.25, 0.75]);
    }

    #[test]
    fn test_adaptive_prefers_confident_personal() {
        let base = [0.6, 0.2, 0.1, 0.1];
        let personal = [0.1, 0.7, 0.1, 0.1];
        assert_eq!(adaptive(&base, &personal), personal.to_vec());
    }

    #[test]
    fn test_macro_f1_counts_predicted_only_classes() {
        // class 2 appears only as a wrong prediction
        let f1 = macro_f1(&[0, 0, 1], &[0, 2, 1]);
        assert!((f1 - (2.0 / 3.0 + 1.0 + 0.0) / 3.0).abs() < 1e-9);
        assert_eq!(macro_f1(&[], &[]), 0.0);
    }

    #[test]
    fn test_confusion_matrix_rows_are_truth() {
        let matrix = confusion_matrix(&[0, 1, 3], &[0, 2, 0]);
        assert_eq!(matrix[0], vec![1, 0, 0, 0]);
        assert_eq!(matrix[1], vec![0, 0, 1, 0]);
        assert_eq!(matrix[3], vec![1, 0, 0, 0]);
        assert_eq!(accuracy(&[0, 1, 3], &[0, 2, 0]), 1.0 / 3.0);
    }

    #[test]
    fn test_adaptive_falls_back_to_more_confident() {
        let base = [0.5, 0.3, 0.1, 0.1];
        let personal = [0.4, 0.4, 0.1, 0.1];
        assert_eq!(adaptive(&base, &personal), base.to_vec());
    }
}
