//! Dashboard payloads
//!
//! Evaluation summaries are passed through to the display unmodified; they
//! are only typed and checked for shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::types::{check_unit, Dimension, Direction, Validate};

// ============================================================================
// OVERVIEW
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub f1_score: Option<f64>,
    #[serde(default)]
    pub roc_auc: Option<f64>,
    #[serde(default)]
    pub gap_reduction_percent: Option<f64>,
    /// Metrics this client does not know by name
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationSummary {
    pub success_rate: f64,
    pub best_direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    #[serde(default)]
    pub average_metrics: ModelMetrics,
    #[serde(default)]
    pub arousal: BTreeMap<Direction, ModelMetrics>,
    #[serde(default)]
    pub valence: BTreeMap<Direction, ModelMetrics>,
    #[serde(default)]
    pub datasets: BTreeMap<String, BTreeMap<String, u32>>,
    #[serde(default)]
    pub adaptation: BTreeMap<Dimension, AdaptationSummary>,
}

impl Overview {
    pub fn metrics(&self, dimension: Dimension, direction: Direction) -> Option<&ModelMetrics> {
        match dimension {
            Dimension::Arousal => self.arousal.get(&direction),
            Dimension::Valence => self.valence.get(&direction),
        }
    }
}

impl Validate for Overview {
    fn validate(&self) -> Result<(), String> {
        let scored = std::iter::once(&self.average_metrics)
            .chain(self.arousal.values())
            .chain(self.valence.values());
        for metrics in scored {
            for (name, value) in [
                ("accuracy", metrics.accuracy),
                ("f1_score", metrics.f1_score),
                ("roc_auc", metrics.roc_auc),
            ] {
                if let Some(value) = value {
                    check_unit(name, value)?;
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// CONFUSION MATRICES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionMatrices {
    pub confusion_matrix: Vec<Vec<u64>>,
    pub normalized_matrix: Vec<Vec<f64>>,
    pub class_names: Vec<String>,
}

impl DirectionMatrices {
    /// Correct predictions over all predictions
    pub fn accuracy(&self) -> Option<f64> {
        let total: u64 = self.confusion_matrix.iter().flatten().sum();
        if total == 0 {
            return None;
        }
        let diagonal: u64 = self
            .confusion_matrix
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.get(i))
            .sum();
        Some(diagonal as f64 / total as f64)
    }
}

impl Validate for DirectionMatrices {
    fn validate(&self) -> Result<(), String> {
        let n = self.class_names.len();
        if !is_square(&self.confusion_matrix, n) {
            return Err(format!("confusion matrix is not {}x{}", n, n));
        }
        if !is_square(&self.normalized_matrix, n) {
            return Err(format!("normalized matrix is not {}x{}", n, n));
        }
        Ok(())
    }
}

fn is_square<T>(matrix: &[Vec<T>], n: usize) -> bool {
    matrix.len() == n && matrix.iter().all(|row| row.len() == n)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrices {
    pub target: Dimension,
    pub wesad_to_kemocon: DirectionMatrices,
    pub kemocon_to_wesad: DirectionMatrices,
}

impl ConfusionMatrices {
    pub fn get(&self, direction: Direction) -> &DirectionMatrices {
        match direction {
            Direction::WesadToKemocon => &self.wesad_to_kemocon,
            Direction::KemoconToWesad => &self.kemocon_to_wesad,
        }
    }
}

impl Validate for ConfusionMatrices {
    fn validate(&self) -> Result<(), String> {
        for direction in Direction::ALL {
            self.get(direction)
                .validate()
                .map_err(|e| format!("{}: {}", direction, e))?;
        }
        Ok(())
    }
}

// ============================================================================
// DOMAIN GAP
// ============================================================================

/// PCA projection of both datasets onto a shared 2-D space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainGap {
    pub target: Dimension,
    #[serde(default)]
    pub explained_variance: Vec<f64>,
    pub wesad: Vec<[f64; 2]>,
    pub kemocon: Vec<[f64; 2]>,
    #[serde(default)]
    pub gap_before: Option<f64>,
    #[serde(default)]
    pub gap_after: Option<f64>,
}

impl DomainGap {
    /// Relative reduction of the domain gap after adaptation, in percent
    pub fn reduction_percent(&self) -> Option<f64> {
        match (self.gap_before, self.gap_after) {
            (Some(before), Some(after)) if before > 0.0 => Some((before - after) / before * 100.0),
            _ => None,
        }
    }
}

impl Validate for DomainGap {
    fn validate(&self) -> Result<(), String> {
        let points = self.wesad.iter().chain(self.kemocon.iter()).flatten();
        if points.chain(self.explained_variance.iter()).any(|v| !v.is_finite()) {
            return Err("projection contains a non-finite coordinate".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// FEATURE MAPPING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMappingEntry {
    pub wesad_feature: String,
    pub kemocon_feature: String,
    pub importance_score: f64,
    pub target: Dimension,
}

impl Validate for FeatureMappingEntry {
    fn validate(&self) -> Result<(), String> {
        if self.wesad_feature.is_empty() || self.kemocon_feature.is_empty() {
            return Err("feature mapping entry without a feature name".to_string());
        }
        Ok(())
    }
}

/// Importance of each mapped feature, keyed `wesad → kemocon`
pub fn mapping_importances(entries: &[FeatureMappingEntry]) -> BTreeMap<String, f64> {
    entries
        .iter()
        .map(|e| (format!("{} → {}", e.wesad_feature, e.kemocon_feature), e.importance_score))
        .collect()
}

// ============================================================================
// CLASS DISTRIBUTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDistributionEntry {
    pub target: Dimension,
    pub dataset: String,
    pub low_count: u64,
    pub high_count: u64,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDistribution {
    pub targets: Vec<Dimension>,
    pub datasets: Vec<String>,
    pub data: Vec<ClassDistributionEntry>,
}

impl ClassDistribution {
    pub fn entry(&self, target: Dimension, dataset: &str) -> Option<&ClassDistributionEntry> {
        self.data
            .iter()
            .find(|e| e.target == target && e.dataset == dataset)
    }
}

impl Validate for ClassDistribution {
    fn validate(&self) -> Result<(), String> {
        match self.data.iter().find(|e| !self.datasets.contains(&e.dataset)) {
            Some(entry) => Err(format!("entry for unlisted dataset {}", entry.dataset)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_overview_keeps_unknown_metrics() {
        let overview: Overview = serde_json::from_value(json!({
            "average_metrics": {"accuracy": 0.64, "balanced_accuracy": 0.6},
            "arousal": {"wesad_to_kemocon": {"accuracy": 0.68, "gap_reduction_percent": 42.5}},
            "valence": {},
            "adaptation": {"arousal": {"success_rate": 42.5, "best_direction": "wesad_to_kemocon"}}
        }))
        .unwrap();

        assert!(overview.validate().is_ok());
        assert_eq!(overview.average_metrics.extra["balanced_accuracy"], json!(0.6));
        let metrics = overview.metrics(Dimension::Arousal, Direction::WesadToKemocon).unwrap();
        assert_eq!(metrics.gap_reduction_percent, Some(42.5));
        assert!(overview.metrics(Dimension::Valence, Direction::KemoconToWesad).is_none());
    }

    #[test]
    fn test_confusion_matrix_shape_checked() {
        let good = DirectionMatrices {
            confusion_matrix: vec![vec![41, 17], vec![21, 40]],
            normalized_matrix: vec![vec![0.7, 0.3], vec![0.34, 0.66]],
            class_names: vec!["Low".into(), "High".into()],
        };
        assert!(good.validate().is_ok());
        assert!((good.accuracy().unwrap() - 81.0 / 119.0).abs() < 1e-9);

        let ragged = DirectionMatrices {
            confusion_matrix: vec![vec![41, 17], vec![21]],
            ..good.clone()
        };
        assert!(ragged.validate().is_err());
    }

    #[test]
    fn test_empty_matrix_has_no_accuracy() {
        let empty = DirectionMatrices {
            confusion_matrix: vec![vec![0, 0], vec![0, 0]],
            normalized_matrix: vec![vec![0.0, 0.0], vec![0.0, 0.0]],
            class_names: vec!["Low".into(), "High".into()],
        };
        assert_eq!(empty.accuracy(), None);
    }

    #[test]
    fn test_domain_gap_reduction() {
        let gap = DomainGap {
            target: Dimension::Arousal,
            explained_variance: vec![0.41, 0.2],
            wesad: vec![[0.0, 0.8]],
            kemocon: vec![[1.5, 1.0]],
            gap_before: Some(2.0),
            gap_after: Some(1.5),
        };
        assert!(gap.validate().is_ok());
        assert!((gap.reduction_percent().unwrap() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_mapping_importances_keys() {
        let entries = vec![FeatureMappingEntry {
            wesad_feature: "hr_mean".into(),
            kemocon_feature: "hr_mean".into(),
            importance_score: -0.2,
            target: Dimension::Valence,
        }];
        assert_eq!(mapping_importances(&entries)["hr_mean → hr_mean"], -0.2);
    }
}
