//! Cross-dataset model handlers
//!
//! Replays the recorded probability for a demo sample and classifies it with
//! the model's decision threshold.

use axum::{
    extract::{Path, State},
    Json,
};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{
    AvailableSamplesResponse, DimensionPrediction, Direction, ModelSummary, PredictionRequest,
    PredictionResponse, RecordedSample, SampleDetailsResponse, Target,
};
use crate::{AppError, AppResult, AppState};

/// Get info about available demo samples
pub async fn available_samples(State(state): State<AppState>) -> Json<AvailableSamplesResponse> {
    let cross = &state.fixture.cross_dataset;

    let unique_subjects = |samples: &[RecordedSample]| -> Vec<u32> {
        samples
            .iter()
            .map(|s| s.subject_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    };

    let feature_lists = BTreeMap::from([
        ("wesad_arousal", cross.wesad.arousal_features.clone()),
        ("wesad_valence", cross.wesad.valence_features.clone()),
        ("kemocon_arousal", cross.kemocon.arousal_features.clone()),
        ("kemocon_valence", cross.kemocon.valence_features.clone()),
    ]);

    Json(AvailableSamplesResponse {
        wesad_samples: cross.wesad.samples.len(),
        kemocon_samples: cross.kemocon.samples.len(),
        wesad_subjects: unique_subjects(&cross.wesad.samples),
        kemocon_participants: unique_subjects(&cross.kemocon.samples),
        feature_lists,
    })
}

/// Get details of a specific demo sample
pub async fn sample_details(
    State(state): State<AppState>,
    Path((direction, index)): Path<(String, usize)>,
) -> AppResult<Json<SampleDetailsResponse>> {
    let direction: Direction = direction.parse()?;
    let pool = state.fixture.pool(direction);
    let sample = lookup_sample(&pool.samples, index)?;

    Ok(Json(SampleDetailsResponse {
        direction: direction.to_string(),
        sample_index: index,
        subject_id: sample.subject_id,
        features: sample.features.clone(),
        arousal_binary: sample.arousal_binary,
        valence_binary: sample.valence_binary,
        arousal: sample.arousal,
        valence: sample.valence,
        emotion_label: sample.emotion_label.clone(),
    }))
}

/// Make a prediction for a demo sample
pub async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictionRequest>,
) -> AppResult<Json<PredictionResponse>> {
    let direction: Direction = req.direction.parse()?;
    let targets = parse_targets(&req.target_dimension)?;

    if !state.config.latency.is_zero() {
        tokio::time::sleep(state.config.latency).await;
    }

    if state.config.should_fail(direction, req.sample_index) {
        return Err(AppError::Injected(format!(
            "Prediction error for {} sample {}",
            direction, req.sample_index
        )));
    }

    let pool = state.fixture.pool(direction);
    let sample = lookup_sample(&pool.samples, req.sample_index)?;

    let mut response = PredictionResponse {
        arousal: None,
        valence: None,
        features_used: BTreeMap::new(),
        direction: direction.to_string(),
        sample_index: req.sample_index,
        subject_id: sample.subject_id,
        ground_truth: BTreeMap::from([
            ("arousal", level(sample.arousal_binary)),
            ("valence", level(sample.valence_binary)),
        ]),
        confidence: BTreeMap::new(),
    };

    for target in targets {
        let model = state.fixture.model(target, direction)?;
        let prediction = classify(sample.probability(target), model.threshold);

        response.confidence.insert(target.as_str(), prediction.confidence);
        match target {
            Target::Arousal => response.arousal = Some(prediction),
            Target::Valence => response.valence = Some(prediction),
        }

        for feature in pool.features_for(target) {
            if let Some(value) = sample.features.get(feature) {
                response.features_used.insert(feature.clone(), *value);
            }
        }
    }

    tracing::debug!("Predicted {} sample {}", direction, req.sample_index);
    Ok(Json(response))
}

/// Get information about the demo models
pub async fn model_info(
    State(state): State<AppState>,
) -> AppResult<Json<BTreeMap<&'static str, BTreeMap<&'static str, ModelSummary>>>> {
    let mut info = BTreeMap::new();

    for target in Target::ALL {
        let mut by_direction = BTreeMap::new();
        for direction in Direction::ALL {
            let model = state.fixture.model(target, direction)?;
            by_direction.insert(
                direction.as_str(),
                ModelSummary {
                    threshold: model.threshold,
                    model_type: model.model_type.clone(),
                    estimators: model.estimators.clone(),
                },
            );
        }
        info.insert(target.as_str(), by_direction);
    }

    Ok(Json(info))
}

// ============================================================================
// HELPERS
// ============================================================================

fn lookup_sample(samples: &[RecordedSample], index: usize) -> AppResult<&RecordedSample> {
    samples
        .get(index)
        .ok_or_else(|| AppError::NotFound("Sample index out of range".to_string()))
}

fn parse_targets(raw: &str) -> AppResult<Vec<Target>> {
    if raw.eq_ignore_ascii_case("both") {
        Ok(Target::ALL.to_vec())
    } else {
        Ok(vec![raw.parse()?])
    }
}

fn level(high: bool) -> &'static str {
    if high { "high" } else { "low" }
}

/// Probability of the "high" class against the decision threshold
pub fn classify(probability: f64, threshold: f64) -> DimensionPrediction {
    DimensionPrediction {
        class: level(probability >= threshold),
        probability,
        confidence: probability.max(1.0 - probability),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_uses_threshold() {
        let high = classify(0.5, 0.48);
        assert_eq!(high.class, "high");
        assert!((high.confidence - 0.5).abs() < 1e-9);

        let low = classify(0.2, 0.48);
        assert_eq!(low.class, "low");
        assert!((low.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_parse_targets() {
        assert_eq!(parse_targets("both").unwrap(), vec![Target::Arousal, Target::Valence]);
        assert_eq!(parse_targets("Valence").unwrap(), vec![Target::Valence]);
        assert!(parse_targets("dominance").is_err());
    }
}
