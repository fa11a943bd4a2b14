//! Dashboard data handlers
//!
//! Evaluation summaries recorded alongside the demo models. Payloads are
//! served as stored; confusion matrices are row-normalised on the way out.

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::Value;

use crate::models::{
    ClassDistributionEntry, ClassDistributionResponse, ConfusionMatricesResponse, Direction,
    DirectionMatrices, FeatureMappingEntry, Target, TargetQuery,
};
use crate::{AppError, AppResult, AppState};

const CLASS_NAMES: [&str; 2] = ["Low", "High"];

/// Overview of all models
pub async fn overview(State(state): State<AppState>) -> Json<Value> {
    Json(state.fixture.dashboards.overview.clone())
}

/// Confusion matrices for both directions of one target
pub async fn confusion_matrices(
    State(state): State<AppState>,
    Query(query): Query<TargetQuery>,
) -> AppResult<Json<ConfusionMatricesResponse>> {
    let target = parse_target(query.target.as_deref())?;
    let evaluation = state
        .fixture
        .dashboards
        .evaluation
        .get(&target)
        .ok_or_else(|| AppError::NotFound(format!("No evaluation data for {}", target.as_str())))?;

    let matrices = |direction: Direction| -> AppResult<DirectionMatrices> {
        let eval = evaluation.get(&direction).ok_or_else(|| {
            AppError::NotFound(format!(
                "No evaluation data found for {}, {}",
                target.as_str(),
                direction
            ))
        })?;
        Ok(DirectionMatrices {
            confusion_matrix: eval.confusion_matrix.clone(),
            normalized_matrix: normalize_rows(&eval.confusion_matrix),
            class_names: CLASS_NAMES,
        })
    };

    Ok(Json(ConfusionMatricesResponse {
        target: target.as_str(),
        wesad_to_kemocon: matrices(Direction::WesadToKemocon)?,
        kemocon_to_wesad: matrices(Direction::KemoconToWesad)?,
    }))
}

/// PCA projection of both datasets for one target
pub async fn domain_gap(
    State(state): State<AppState>,
    Query(query): Query<TargetQuery>,
) -> AppResult<Json<Value>> {
    let target = parse_target(query.target.as_deref())?;
    state
        .fixture
        .dashboards
        .domain_gap
        .get(&target)
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Domain gap visualization data not found for {}",
                target.as_str()
            ))
        })
}

/// Feature correspondence between the two datasets
pub async fn feature_mapping(
    State(state): State<AppState>,
    Query(query): Query<TargetQuery>,
) -> AppResult<Json<Vec<FeatureMappingEntry>>> {
    let target = parse_target(query.target.as_deref())?;
    let mapping = state
        .fixture
        .dashboards
        .feature_mapping
        .get(&target)
        .ok_or_else(|| AppError::NotFound(format!("Feature mapping not found for {}", target.as_str())))?;

    Ok(Json(
        mapping
            .iter()
            .map(|m| FeatureMappingEntry {
                wesad_feature: m.wesad_feature.clone(),
                kemocon_feature: m.kemocon_feature.clone(),
                importance_score: m.importance_score,
                target: target.as_str(),
            })
            .collect(),
    ))
}

/// Low/high class counts per dataset and target
pub async fn class_distribution(
    State(state): State<AppState>,
) -> AppResult<Json<ClassDistributionResponse>> {
    let distribution = &state.fixture.dashboards.class_distribution;
    let datasets = vec!["WESAD".to_string(), "K-EmoCon".to_string()];

    let mut data = Vec::new();
    for target in Target::ALL {
        for dataset in &datasets {
            let counts = distribution
                .get(&target)
                .and_then(|by_dataset| by_dataset.get(dataset))
                .ok_or_else(|| {
                    AppError::Fixture(format!(
                        "Missing distribution data for {}, {}",
                        dataset,
                        target.as_str()
                    ))
                })?;
            data.push(ClassDistributionEntry::new(target.as_str(), dataset, *counts));
        }
    }

    Ok(Json(ClassDistributionResponse {
        targets: Target::ALL.iter().map(|t| t.as_str()).collect(),
        datasets,
        data,
    }))
}

// ============================================================================
// HELPERS
// ============================================================================

fn parse_target(raw: Option<&str>) -> AppResult<Target> {
    raw.unwrap_or("arousal").parse()
}

/// Divide each row by its sum. A matrix with an empty row is returned as raw
/// counts.
pub fn normalize_rows(matrix: &[Vec<u64>]) -> Vec<Vec<f64>> {
    let has_empty_row = matrix.iter().any(|row| row.iter().sum::<u64>() == 0);

    matrix
        .iter()
        .map(|row| {
            let sum = row.iter().sum::<u64>() as f64;
            row.iter()
                .map(|&count| {
                    if has_empty_row {
                        count as f64
                    } else {
                        count as f64 / sum
                    }
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rows() {
        let normalized = normalize_rows(&[vec![3, 1], vec![2, 2]]);

        assert_eq!(normalized, vec![vec![0.75, 0.25], vec![0.5, 0.5]]);
    }

    #[test]
    fn test_normalize_rows_keeps_counts_when_row_empty() {
        let normalized = normalize_rows(&[vec![0, 0], vec![31, 53]]);

        assert_eq!(normalized, vec![vec![0.0, 0.0], vec![31.0, 53.0]]);
    }
}
