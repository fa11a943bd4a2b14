//! Prediction API wire types
//!
//! Every response type implements [`Validate`]; the client rejects bodies
//! that parse but break the contract instead of passing them on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// VALIDATION
// ============================================================================

/// Contract checks applied to every decoded response
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), String> {
        self.iter().try_for_each(Validate::validate)
    }
}

pub(crate) fn check_unit(name: &str, value: f64) -> Result<(), String> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(format!("{} must be within [0, 1], got {}", name, value))
    }
}

// ============================================================================
// ENUMS
// ============================================================================

/// Transfer direction: which dataset the model was trained on and which one
/// it is evaluated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    WesadToKemocon,
    KemoconToWesad,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::WesadToKemocon, Direction::KemoconToWesad];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::WesadToKemocon => "wesad_to_kemocon",
            Direction::KemoconToWesad => "kemocon_to_wesad",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::WesadToKemocon => "WESAD → K-EmoCon",
            Direction::KemoconToWesad => "K-EmoCon → WESAD",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "wesad_to_kemocon" | "w2k" => Ok(Direction::WesadToKemocon),
            "kemocon_to_wesad" | "k2w" => Ok(Direction::KemoconToWesad),
            other => Err(format!(
                "unknown direction '{}' (expected wesad_to_kemocon or kemocon_to_wesad)",
                other
            )),
        }
    }
}

/// Emotion dimension scored by the cross-dataset models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Arousal,
    Valence,
}

impl Dimension {
    pub const ALL: [Dimension; 2] = [Dimension::Arousal, Dimension::Valence];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Arousal => "arousal",
            Dimension::Valence => "valence",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arousal" => Ok(Dimension::Arousal),
            "valence" => Ok(Dimension::Valence),
            other => Err(format!("unknown dimension '{}' (expected arousal or valence)", other)),
        }
    }
}

/// Dimensions requested in a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetDimension {
    Arousal,
    Valence,
    #[default]
    Both,
}

impl TargetDimension {
    pub fn includes(&self, dimension: Dimension) -> bool {
        match self {
            TargetDimension::Both => true,
            TargetDimension::Arousal => dimension == Dimension::Arousal,
            TargetDimension::Valence => dimension == Dimension::Valence,
        }
    }
}

impl FromStr for TargetDimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "both" => Ok(TargetDimension::Both),
            other => other.parse::<Dimension>().map(|d| match d {
                Dimension::Arousal => TargetDimension::Arousal,
                Dimension::Valence => TargetDimension::Valence,
            }),
        }
    }
}

/// Binary class of one dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    High,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Level::Low => "low",
            Level::High => "high",
        })
    }
}

// ============================================================================
// CROSS-DATASET PREDICTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub direction: Direction,
    pub sample_index: u32,
    pub target_dimension: TargetDimension,
}

impl PredictionRequest {
    /// Request scoring both dimensions, as batch runs do
    pub fn both(direction: Direction, sample_index: u32) -> Self {
        Self {
            direction,
            sample_index,
            target_dimension: TargetDimension::Both,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionPrediction {
    pub class: Level,
    pub confidence: f64,
    pub probability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub arousal: Level,
    pub valence: Level,
}

impl GroundTruth {
    pub fn get(&self, dimension: Dimension) -> Level {
        match dimension {
            Dimension::Arousal => self.arousal,
            Dimension::Valence => self.valence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub direction: Direction,
    pub sample_index: u32,
    #[serde(default)]
    pub subject_id: Option<u32>,
    #[serde(default)]
    pub arousal: Option<DimensionPrediction>,
    #[serde(default)]
    pub valence: Option<DimensionPrediction>,
    pub ground_truth: GroundTruth,
    #[serde(default)]
    pub features_used: BTreeMap<String, f64>,
    #[serde(default)]
    pub confidence: BTreeMap<String, f64>,
}

impl PredictionResult {
    pub fn prediction(&self, dimension: Dimension) -> Option<&DimensionPrediction> {
        match dimension {
            Dimension::Arousal => self.arousal.as_ref(),
            Dimension::Valence => self.valence.as_ref(),
        }
    }

    /// Predicted class matches the ground truth. An unscored dimension is
    /// never correct.
    pub fn is_correct(&self, dimension: Dimension) -> bool {
        self.prediction(dimension)
            .map(|p| p.class == self.ground_truth.get(dimension))
            .unwrap_or(false)
    }

    pub fn scores_both(&self) -> bool {
        self.arousal.is_some() && self.valence.is_some()
    }

    /// The response belongs to `request`: same sample, same direction and
    /// every requested dimension scored
    pub fn check_matches(&self, request: &PredictionRequest) -> Result<(), String> {
        if self.direction != request.direction || self.sample_index != request.sample_index {
            return Err(format!(
                "response for {} sample {} does not match request for {} sample {}",
                self.direction, self.sample_index, request.direction, request.sample_index
            ));
        }
        for dimension in Dimension::ALL {
            if request.target_dimension.includes(dimension) && self.prediction(dimension).is_none() {
                return Err(format!("requested {} prediction is missing", dimension));
            }
        }
        Ok(())
    }
}

impl Validate for PredictionResult {
    fn validate(&self) -> Result<(), String> {
        for dimension in Dimension::ALL {
            if let Some(p) = self.prediction(dimension) {
                check_unit(&format!("{} probability", dimension), p.probability)?;
                check_unit(&format!("{} confidence", dimension), p.confidence)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// SAMPLES / HEALTH / MODELS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCounts {
    pub wesad: u32,
    pub kemocon: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossHealth {
    pub status: String,
    #[serde(default)]
    pub models: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub samples: Option<SampleCounts>,
    #[serde(default)]
    pub message: Option<String>,
}

impl CrossHealth {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

impl Validate for CrossHealth {
    fn validate(&self) -> Result<(), String> {
        if self.is_ok() && self.samples.is_none() {
            return Err("healthy response without sample counts".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableSamples {
    pub wesad_samples: u32,
    pub kemocon_samples: u32,
    #[serde(default)]
    pub wesad_subjects: Vec<u32>,
    #[serde(default)]
    pub kemocon_participants: Vec<u32>,
    #[serde(default)]
    pub feature_lists: BTreeMap<String, Vec<String>>,
}

impl AvailableSamples {
    /// Size of the evaluation pool of `direction`. A model trained on one
    /// dataset is evaluated on samples of the other.
    pub fn samples_for(&self, direction: Direction) -> u32 {
        match direction {
            Direction::WesadToKemocon => self.kemocon_samples,
            Direction::KemoconToWesad => self.wesad_samples,
        }
    }
}

impl Validate for AvailableSamples {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDetails {
    pub direction: Direction,
    pub sample_index: u32,
    #[serde(default)]
    pub subject_id: Option<u32>,
    pub features: BTreeMap<String, f64>,
    pub arousal_binary: bool,
    pub valence_binary: bool,
    #[serde(default)]
    pub arousal: Option<f64>,
    #[serde(default)]
    pub valence: Option<f64>,
    #[serde(default)]
    pub emotion_label: Option<String>,
}

impl Validate for SampleDetails {
    fn validate(&self) -> Result<(), String> {
        match self.features.iter().find(|(_, v)| !v.is_finite()) {
            Some((name, _)) => Err(format!("feature {} is not a finite number", name)),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimator {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub threshold: f64,
    pub model_type: String,
    #[serde(default)]
    pub estimators: Vec<Estimator>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub arousal: BTreeMap<Direction, ModelSummary>,
    pub valence: BTreeMap<Direction, ModelSummary>,
}

impl ModelInfo {
    pub fn get(&self, dimension: Dimension, direction: Direction) -> Option<&ModelSummary> {
        match dimension {
            Dimension::Arousal => self.arousal.get(&direction),
            Dimension::Valence => self.valence.get(&direction),
        }
    }
}

impl Validate for ModelInfo {
    fn validate(&self) -> Result<(), String> {
        for dimension in Dimension::ALL {
            for direction in Direction::ALL {
                if let Some(model) = self.get(dimension, direction) {
                    check_unit(&format!("{} {} threshold", dimension, direction), model.threshold)?;
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// WESAD PERSONALISED MODEL
// ============================================================================

/// The four WESAD emotion classes, in model output order
pub const EMOTION_CLASSES: [&str; 4] = ["Baseline", "Stress", "Amusement", "Meditation"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WesadPredictionRequest {
    pub subject_id: u32,
    pub sample_index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    pub emotion_id: usize,
    pub emotion_name: String,
    pub probabilities: BTreeMap<String, f64>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WesadAccuracy {
    pub true_emotion_id: usize,
    pub true_emotion: String,
    pub base_correct: u8,
    pub personal_correct: u8,
    pub ensemble_correct: u8,
    pub adaptive_correct: u8,
}

/// Models scored on every WESAD sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WesadModel {
    Base,
    Personal,
    Ensemble,
    Adaptive,
}

impl WesadModel {
    pub const ALL: [WesadModel; 4] = [
        WesadModel::Base,
        WesadModel::Personal,
        WesadModel::Ensemble,
        WesadModel::Adaptive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WesadModel::Base => "base",
            WesadModel::Personal => "personal",
            WesadModel::Ensemble => "ensemble",
            WesadModel::Adaptive => "adaptive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WesadPrediction {
    pub base_model: EmotionScore,
    pub personal_model: EmotionScore,
    pub ensemble_model: EmotionScore,
    pub adaptive_model: EmotionScore,
    pub accuracy: WesadAccuracy,
}

impl WesadPrediction {
    pub fn score(&self, model: WesadModel) -> &EmotionScore {
        match model {
            WesadModel::Base => &self.base_model,
            WesadModel::Personal => &self.personal_model,
            WesadModel::Ensemble => &self.ensemble_model,
            WesadModel::Adaptive => &self.adaptive_model,
        }
    }

    pub fn is_correct(&self, model: WesadModel) -> bool {
        let flag = match model {
            WesadModel::Base => self.accuracy.base_correct,
            WesadModel::Personal => self.accuracy.personal_correct,
            WesadModel::Ensemble => self.accuracy.ensemble_correct,
            WesadModel::Adaptive => self.accuracy.adaptive_correct,
        };
        flag != 0
    }
}

impl Validate for WesadPrediction {
    fn validate(&self) -> Result<(), String> {
        if self.accuracy.true_emotion_id >= EMOTION_CLASSES.len() {
            return Err(format!("unknown emotion id {}", self.accuracy.true_emotion_id));
        }
        for model in WesadModel::ALL {
            let score = self.score(model);
            if score.emotion_id >= EMOTION_CLASSES.len() {
                return Err(format!("{} model: unknown emotion id {}", model.as_str(), score.emotion_id));
            }
            check_unit(&format!("{} model confidence", model.as_str()), score.confidence)?;
            for (name, p) in &score.probabilities {
                check_unit(&format!("{} model {} probability", model.as_str(), name), *p)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectInfo {
    pub subject_id: u32,
    pub num_samples: u32,
    #[serde(default)]
    pub class_distribution: BTreeMap<String, u32>,
}

impl Validate for SubjectInfo {
    fn validate(&self) -> Result<(), String> {
        let counted: u32 = self.class_distribution.values().sum();
        if !self.class_distribution.is_empty() && counted != self.num_samples {
            return Err(format!(
                "subject {} class distribution sums to {} but reports {} samples",
                self.subject_id, counted, self.num_samples
            ));
        }
        Ok(())
    }
}

/// One value per WESAD model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerModel<T> {
    pub base: T,
    pub personal: T,
    pub ensemble: T,
    pub adaptive: T,
}

impl<T> PerModel<T> {
    pub fn get(&self, model: WesadModel) -> &T {
        match model {
            WesadModel::Base => &self.base,
            WesadModel::Personal => &self.personal,
            WesadModel::Ensemble => &self.ensemble,
            WesadModel::Adaptive => &self.adaptive,
        }
    }
}

/// All four models scored on every test sample of one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub subject_id: u32,
    pub accuracy: PerModel<f64>,
    pub f1_score: PerModel<f64>,
    /// Rows are true classes, columns predicted classes
    pub confusion_matrix: PerModel<Vec<Vec<u32>>>,
}

impl EvaluationResult {
    /// Number of test samples behind the metrics
    pub fn sample_count(&self) -> u32 {
        self.confusion_matrix.base.iter().flatten().sum()
    }
}

impl Validate for EvaluationResult {
    fn validate(&self) -> Result<(), String> {
        let classes = EMOTION_CLASSES.len();
        let expected = self.sample_count();
        for model in WesadModel::ALL {
            check_unit(&format!("{} accuracy", model.as_str()), *self.accuracy.get(model))?;
            check_unit(&format!("{} f1 score", model.as_str()), *self.f1_score.get(model))?;

            let matrix = self.confusion_matrix.get(model);
            if matrix.len() != classes || matrix.iter().any(|row| row.len() != classes) {
                return Err(format!(
                    "{} confusion matrix must be {}x{}",
                    model.as_str(),
                    classes,
                    classes
                ));
            }
            let counted: u32 = matrix.iter().flatten().sum();
            if counted != expected {
                return Err(format!(
                    "{} confusion matrix counts {} samples, base counts {}",
                    model.as_str(),
                    counted,
                    expected
                ));
            }
        }
        Ok(())
    }
}

/// Accuracy and macro F1 per model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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
    pub fn accuracy(&self, model: WesadModel) -> &T {
        match model {
            WesadModel::Base => &self.base_accuracy,
            WesadModel::Personal => &self.personal_accuracy,
            WesadModel::Ensemble => &self.ensemble_accuracy,
            WesadModel::Adaptive => &self.adaptive_accuracy,
        }
    }

    pub fn f1(&self, model: WesadModel) -> &T {
        match model {
            WesadModel::Base => &self.base_f1,
            WesadModel::Personal => &self.personal_f1,
            WesadModel::Ensemble => &self.ensemble_f1,
            WesadModel::Adaptive => &self.adaptive_f1,
        }
    }
}

/// Mean accuracy gain of each personalised model over the base model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Improvements {
    pub personal_vs_base: f64,
    pub ensemble_vs_base: f64,
    pub adaptive_vs_base: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerSubjectPerformance {
    pub subject_ids: Vec<u32>,
    pub metrics: PerformanceMetrics<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallPerformance {
    pub mean_metrics: PerformanceMetrics<f64>,
    pub improvements: Improvements,
    pub per_subject: PerSubjectPerformance,
}

impl Validate for OverallPerformance {
    fn validate(&self) -> Result<(), String> {
        let subjects = self.per_subject.subject_ids.len();
        for model in WesadModel::ALL {
            check_unit(&format!("{} mean accuracy", model.as_str()), *self.mean_metrics.accuracy(model))?;
            check_unit(&format!("{} mean f1", model.as_str()), *self.mean_metrics.f1(model))?;

            let metrics = &self.per_subject.metrics;
            for (kind, values) in [("accuracy", metrics.accuracy(model)), ("f1", metrics.f1(model))] {
                if values.len() != subjects {
                    return Err(format!(
                        "{} {} has {} values for {} subjects",
                        model.as_str(),
                        kind,
                        values.len(),
                        subjects
                    ));
                }
                for value in values {
                    check_unit(&format!("{} {}", model.as_str(), kind), *value)?;
                }
            }
        }
        Ok(())
    }
}
