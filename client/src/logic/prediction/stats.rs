//! Aggregate accuracy of a batch run

use serde::{Deserialize, Serialize};

use crate::logic::backend::{Dimension, PredictionResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Successful predictions
    pub total: usize,
    pub arousal_correct: usize,
    pub valence_correct: usize,
    pub arousal_accuracy: f64,
    pub valence_accuracy: f64,
    /// Mean of both dimensions. `None` when some result does not score both.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_accuracy: Option<f64>,
}

impl BatchStats {
    pub fn from_results(results: &[PredictionResult]) -> Self {
        let total = results.len();
        let correct = |dimension| results.iter().filter(|r| r.is_correct(dimension)).count();
        let arousal_correct = correct(Dimension::Arousal);
        let valence_correct = correct(Dimension::Valence);

        if total == 0 {
            return Self {
                overall_accuracy: Some(0.0),
                ..Self::default()
            };
        }

        let overall_accuracy = results
            .iter()
            .all(PredictionResult::scores_both)
            .then(|| (arousal_correct + valence_correct) as f64 / (2 * total) as f64);

        Self {
            total,
            arousal_correct,
            valence_correct,
            arousal_accuracy: arousal_correct as f64 / total as f64,
            valence_accuracy: valence_correct as f64 / total as f64,
            overall_accuracy,
        }
    }

    pub fn accuracy(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Arousal => self.arousal_accuracy,
            Dimension::Valence => self.valence_accuracy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::backend::{DimensionPrediction, Direction, GroundTruth, Level};
    use std::collections::BTreeMap;

    fn result(index: u32, arousal_ok: bool, valence: Option<bool>) -> PredictionResult {
        let prediction = |ok: bool| DimensionPrediction {
            class: if ok { Level::High } else { Level::Low },
            confidence: 0.8,
            probability: if ok { 0.8 } else { 0.2 },
        };
        PredictionResult {
            direction: Direction::WesadToKemocon,
            sample_index: index,
            subject_id: None,
            arousal: Some(prediction(arousal_ok)),
            valence: valence.map(prediction),
            ground_truth: GroundTruth { arousal: Level::High, valence: Level::High },
            features_used: BTreeMap::new(),
            confidence: BTreeMap::new(),
        }
    }

    #[test]
    fn test_empty_run_is_all_zero() {
        let stats = BatchStats::from_results(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.arousal_accuracy, 0.0);
        assert_eq!(stats.valence_accuracy, 0.0);
        assert_eq!(stats.overall_accuracy, Some(0.0));
    }

    #[test]
    fn test_accuracy_over_successes() {
        let results = vec![
            result(0, true, Some(true)),
            result(1, true, Some(false)),
            result(2, false, Some(true)),
            result(3, true, Some(true)),
        ];
        let stats = BatchStats::from_results(&results);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.arousal_accuracy, 0.75);
        assert_eq!(stats.valence_accuracy, 0.75);
        assert_eq!(stats.overall_accuracy, Some(0.75));
    }

    #[test]
    fn test_overall_omitted_when_dimension_missing() {
        let results = vec![result(0, true, Some(true)), result(1, true, None)];
        let stats = BatchStats::from_results(&results);

        assert_eq!(stats.valence_accuracy, 0.5);
        assert_eq!(stats.overall_accuracy, None);
    }
}
