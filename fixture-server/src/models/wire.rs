//! Request/response bodies of the prediction API

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::fixture::{ClassCounts, EstimatorFixture};

// ============================================================================
// CROSS-DATASET MODEL API
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PredictionRequest {
    pub direction: String,
    pub sample_index: usize,
    #[serde(default = "default_target_dimension")]
    pub target_dimension: String,
}

fn default_target_dimension() -> String {
    "both".to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct DimensionPrediction {
    pub class: &'static str,
    pub probability: f64,
    pub confidence: f64,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub arousal: Option<DimensionPrediction>,
    pub valence: Option<DimensionPrediction>,
    pub features_used: BTreeMap<String, f64>,
    pub direction: String,
    pub sample_index: usize,
    pub subject_id: u32,
    pub ground_truth: BTreeMap<&'static str, &'static str>,
    pub confidence: BTreeMap<&'static str, f64>,
}

#[derive(Debug, Serialize)]
pub struct AvailableSamplesResponse {
    pub wesad_samples: usize,
    pub kemocon_samples: usize,
    pub wesad_subjects: Vec<u32>,
    pub kemocon_participants: Vec<u32>,
    pub feature_lists: BTreeMap<&'static str, Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct SampleDetailsResponse {
    pub direction: String,
    pub sample_index: usize,
    pub subject_id: u32,
    pub features: BTreeMap<String, f64>,
    pub arousal_binary: bool,
    pub valence_binary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arousal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion_label: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ModelSummary {
    pub threshold: f64,
    pub model_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub estimators: Vec<EstimatorFixture>,
}

#[derive(Debug, Serialize)]
pub struct CrossHealthResponse {
    pub status: &'static str,
    pub models: BTreeMap<&'static str, Vec<&'static str>>,
    pub samples: BTreeMap<&'static str, usize>,
}

// ============================================================================
// DASHBOARD API
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DirectionMatrices {
    pub confusion_matrix: Vec<Vec<u64>>,
    pub normalized_matrix: Vec<Vec<f64>>,
    pub class_names: [&'static str; 2],
}

#[derive(Debug, Serialize)]
pub struct ConfusionMatricesResponse {
    pub target: &'static str,
    pub wesad_to_kemocon: DirectionMatrices,
    pub kemocon_to_wesad: DirectionMatrices,
}

#[derive(Debug, Serialize)]
pub struct FeatureMappingEntry {
    pub wesad_feature: String,
    pub kemocon_feature: String,
    pub importance_score: f64,
    pub target: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ClassDistributionEntry {
    pub target: &'static str,
    pub dataset: String,
    pub low_count: u64,
    pub high_count: u64,
    pub ratio: f64,
}

impl ClassDistributionEntry {
    pub fn new(target: &'static str, dataset: &str, counts: ClassCounts) -> Self {
        Self {
            target,
            dataset: dataset.to_string(),
            low_count: counts.low,
            high_count: counts.high,
            ratio: counts.ratio,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClassDistributionResponse {
    pub targets: Vec<&'static str>,
    pub datasets: Vec<String>,
    pub data: Vec<ClassDistributionEntry>,
}

// ============================================================================
// WESAD MODEL API
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct WesadPredictQuery {
    #[serde(default)]
    pub sample_index: i64,
}

#[derive(Debug, Serialize)]
pub struct EmotionScore {
    pub emotion_id: usize,
    pub emotion_name: &'static str,
    pub probabilities: BTreeMap<&'static str, f64>,
    pub confidence: f64,
}

#[derive(Debug, Serialize)]
pub struct WesadAccuracy {
    pub true_emotion_id: usize,
    pub true_emotion: &'static str,
    pub base_correct: u8,
    pub personal_correct: u8,
    pub ensemble_correct: u8,
    pub adaptive_correct: u8,
}

#[derive(Debug, Serialize)]
pub struct WesadPredictionResponse {
    pub base_model: EmotionScore,
    pub personal_model: EmotionScore,
    pub ensemble_model: EmotionScore,
    pub adaptive_model: EmotionScore,
    pub accuracy: WesadAccuracy,
}

#[derive(Debug, Serialize)]
pub struct SubjectInfo {
    pub subject_id: u32,
    pub num_samples: usize,
    pub class_distribution: BTreeMap<&'static str, usize>,
}

/// One value per WESAD model
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerModel<T> {
    pub base: T,
    pub personal: T,
    pub ensemble: T,
    pub adaptive: T,
}

impl<T> PerModel<T> {
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> PerModel<U> {
        PerModel {
            base: f(&self.base),
            personal: f(&self.personal),
            ensemble: f(&self.ensemble),
            adaptive: f(&self.adaptive),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    pub subject_id: u32,
    pub accuracy: PerModel<f64>,
    pub f1_score: PerModel<f64>,
    pub confusion_matrix: PerModel<Vec<Vec<usize>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetrics<T> {
    pub base_accuracy: T,
    pub personal_accuracy: T,
    pub ensemble_accuracy: T,
    pub adaptive_accuracy: T,
    pub base_f1: T,
    pub personal_f1: T,
    pub ensemble_f1: T,
    pub adaptive_f1: T,
}

impl<T> PerformanceMetrics<T> {
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> PerformanceMetrics<U> {
        PerformanceMetrics {
            base_accuracy: f(&self.base_accuracy),
            personal_accuracy: f(&self.personal_accuracy),
            ensemble_accuracy: f(&self.ensemble_accuracy),
            adaptive_accuracy: f(&self.adaptive_accuracy),
            base_f1: f(&self.base_f1),
            personal_f1: f(&self.personal_f1),
            ensemble_f1: f(&self.ensemble_f1),
            adaptive_f1: f(&self.adaptive_f1),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Improvements {
    pub personal_vs_base: f64,
    pub ensemble_vs_base: f64,
    pub adaptive_vs_base: f64,
}

#[derive(Debug, Serialize)]
pub struct PerSubjectPerformance {
    pub subject_ids: Vec<u32>,
    pub metrics: PerformanceMetrics<Vec<f64>>,
}

#[derive(Debug, Serialize)]
pub struct OverallPerformanceResponse {
    pub mean_metrics: PerformanceMetrics<f64>,
    pub improvements: Improvements,
    pub per_subject: PerSubjectPerformance,
}

#[derive(Debug, Deserialize)]
pub struct TargetQuery {
    pub target: Option<String>,
}
