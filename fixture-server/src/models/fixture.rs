//! Fixture document
//!
//! Recorded demo samples, per-sample model probabilities and the dashboard
//! payloads the replay backend serves. Loaded once at start-up.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::{AppError, AppResult};

/// Fixture bundled with the binary
pub const DEMO_FIXTURE: &str = include_str!("../../data/demo_fixture.json");

/// WESAD emotion classes, in model output order
pub const EMOTION_CLASSES: [&str; 4] = ["Baseline", "Stress", "Amusement", "Meditation"];

// ============================================================================
// DIRECTION / TARGET
// ============================================================================

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
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wesad_to_kemocon" => Ok(Direction::WesadToKemocon),
            "kemocon_to_wesad" => Ok(Direction::KemoconToWesad),
            other => Err(AppError::BadRequest(format!(
                "Invalid direction '{}'. Must be 'wesad_to_kemocon' or 'kemocon_to_wesad'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Arousal,
    Valence,
}

impl Target {
    pub const ALL: [Target; 2] = [Target::Arousal, Target::Valence];

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Arousal => "arousal",
            Target::Valence => "valence",
        }
    }
}

impl FromStr for Target {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arousal" => Ok(Target::Arousal),
            "valence" => Ok(Target::Valence),
            other => Err(AppError::BadRequest(format!("Invalid target dimension: {}", other))),
        }
    }
}

// ============================================================================
// DOCUMENT
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    pub cross_dataset: CrossDatasetFixture,
    pub wesad: WesadFixture,
    pub dashboards: DashboardFixture,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrossDatasetFixture {
    /// target -> direction -> model
    pub models: BTreeMap<Target, BTreeMap<Direction, ModelFixture>>,
    pub wesad: SamplePool,
    pub kemocon: SamplePool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFixture {
    pub threshold: f64,
    pub model_type: String,
    #[serde(default)]
    pub estimators: Vec<EstimatorFixture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorFixture {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplePool {
    pub arousal_features: Vec<String>,
    pub valence_features: Vec<String>,
    pub samples: Vec<RecordedSample>,
}

impl SamplePool {
    pub fn features_for(&self, target: Target) -> &[String] {
        match target {
            Target::Arousal => &self.arousal_features,
            Target::Valence => &self.valence_features,
        }
    }
}

/// One demo sample with the probabilities the trained model produced for it
#[derive(Debug, Clone, Deserialize)]
pub struct RecordedSample {
    pub subject_id: u32,
    pub features: BTreeMap<String, f64>,
    pub arousal_binary: bool,
    pub valence_binary: bool,
    pub arousal_probability: f64,
    pub valence_probability: f64,
    #[serde(default)]
    pub arousal: Option<f64>,
    #[serde(default)]
    pub valence: Option<f64>,
    #[serde(default)]
    pub emotion_label: Option<String>,
}

impl RecordedSample {
    pub fn probability(&self, target: Target) -> f64 {
        match target {
            Target::Arousal => self.arousal_probability,
            Target::Valence => self.valence_probability,
        }
    }

    pub fn is_high(&self, target: Target) -> bool {
        match target {
            Target::Arousal => self.arousal_binary,
            Target::Valence => self.valence_binary,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WesadFixture {
    pub subjects: Vec<WesadSubjectFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WesadSubjectFixture {
    pub subject_id: u32,
    pub ensemble_weight: f64,
    pub samples: Vec<WesadSampleFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WesadSampleFixture {
    pub label: usize,
    pub features: BTreeMap<String, f64>,
    pub base_probabilities: Vec<f64>,
    pub personal_probabilities: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardFixture {
    pub overview: Value,
    /// target -> direction -> evaluation block
    pub evaluation: BTreeMap<Target, BTreeMap<Direction, EvaluationFixture>>,
    pub domain_gap: BTreeMap<Target, Value>,
    pub feature_mapping: BTreeMap<Target, Vec<FeatureMappingFixture>>,
    /// target -> dataset -> counts
    pub class_distribution: BTreeMap<Target, BTreeMap<String, ClassCounts>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationFixture {
    pub accuracy: f64,
    pub f1_score: f64,
    pub confusion_matrix: Vec<Vec<u64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureMappingFixture {
    pub wesad_feature: String,
    pub kemocon_feature: String,
    pub importance_score: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassCounts {
    pub low: u64,
    pub high: u64,
    pub ratio: f64,
}

// ============================================================================
// LOADING
// ============================================================================

impl Fixture {
    /// Parse the bundled demo fixture
    pub fn demo() -> AppResult<Self> {
        Self::from_json(DEMO_FIXTURE)
    }

    pub fn from_json(raw: &str) -> AppResult<Self> {
        let fixture: Fixture = serde_json::from_str(raw)
            .map_err(|e| AppError::Fixture(format!("invalid fixture document: {}", e)))?;
        fixture.validate()?;
        Ok(fixture)
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Fixture(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    /// Evaluating a model trained on one dataset uses samples of the other
    pub fn pool(&self, direction: Direction) -> &SamplePool {
        match direction {
            Direction::WesadToKemocon => &self.cross_dataset.kemocon,
            Direction::KemoconToWesad => &self.cross_dataset.wesad,
        }
    }

    pub fn model(&self, target: Target, direction: Direction) -> AppResult<&ModelFixture> {
        self.cross_dataset
            .models
            .get(&target)
            .and_then(|by_direction| by_direction.get(&direction))
            .ok_or_else(|| {
                AppError::Fixture(format!("no {} model for {}", target.as_str(), direction))
            })
    }

    pub fn wesad_subject(&self, subject_id: u32) -> Option<&WesadSubjectFixture> {
        self.wesad.subjects.iter().find(|s| s.subject_id == subject_id)
    }

    fn validate(&self) -> AppResult<()> {
        for target in Target::ALL {
            for direction in Direction::ALL {
                self.model(target, direction)?;
            }
        }

        let in_range = |p: f64| (0.0..=1.0).contains(&p);
        for direction in Direction::ALL {
            for (index, sample) in self.pool(direction).samples.iter().enumerate() {
                if !in_range(sample.arousal_probability) || !in_range(sample.valence_probability) {
                    return Err(AppError::Fixture(format!(
                        "{} sample {} has a probability outside [0, 1]",
                        direction, index
                    )));
                }
            }
        }

        for subject in &self.wesad.subjects {
            for (index, sample) in subject.samples.iter().enumerate() {
                let shapes_ok = sample.base_probabilities.len() == EMOTION_CLASSES.len()
                    && sample.personal_probabilities.len() == EMOTION_CLASSES.len()
                    && sample.label < EMOTION_CLASSES.len();
                if !shapes_ok {
                    return Err(AppError::Fixture(format!(
                        "WESAD subject {} sample {} does not match the 4 emotion classes",
                        subject.subject_id, index
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_fixture_loads() {
        let fixture = Fixture::demo().unwrap();

        assert_eq!(fixture.pool(Direction::WesadToKemocon).samples.len(), 12);
        assert_eq!(fixture.pool(Direction::KemoconToWesad).samples.len(), 10);
        assert!(fixture.wesad_subject(2).is_some());
        assert!(fixture.wesad_subject(99).is_none());
    }

    #[test]
    fn test_direction_round_trip() {
        for direction in Direction::ALL {
            assert_eq!(direction.as_str().parse::<Direction>().unwrap(), direction);
        }
        assert!("a_to_b".parse::<Direction>().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_probability() {
        let mut doc: Value = serde_json::from_str(DEMO_FIXTURE).unwrap();
        doc["cross_dataset"]["kemocon"]["samples"][0]["arousal_probability"] = Value::from(1.5);

        let err = Fixture::from_json(&doc.to_string()).unwrap_err();
        assert!(err.to_string().contains("outside [0, 1]"));
    }
}
