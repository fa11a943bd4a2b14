//! Output rendering
//!
//! Every command result prints either as pretty JSON (`--json`) or as a
//! short plain-text report.

use serde::Serialize;
use std::fmt::Write;

use super::commands::{
    DemoReport, EvaluationView, FeatureView, HistoryRow, PredictionView, SampleView, WesadView,
};
use crate::logic::backend::*;
use crate::logic::prediction::BatchRun;
use crate::logic::ranking::RankedFeature;

pub trait Render {
    fn render(&self) -> String;
}

/// Print `value` to stdout
pub fn print<T: Serialize + Render>(value: &T, json: bool) -> Result<(), String> {
    if json {
        let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
        println!("{}", text);
    } else {
        print!("{}", value.render());
    }
    Ok(())
}

fn pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn opt_pct(value: Option<f64>) -> String {
    value.map(pct).unwrap_or_else(|| "-".to_string())
}

fn write_ranked(out: &mut String, ranked: &[RankedFeature]) {
    for feature in ranked {
        let _ = writeln!(
            out,
            "  {:<28} {:>10.4}  {:>5.1}%",
            feature.name, feature.value, feature.magnitude_pct
        );
    }
}

impl Render for CrossHealth {
    fn render(&self) -> String {
        let mut out = format!("status: {}\n", self.status);
        if let Some(message) = &self.message {
            let _ = writeln!(out, "message: {}", message);
        }
        for (dimension, directions) in &self.models {
            let _ = writeln!(out, "{} models: {}", dimension, directions.join(", "));
        }
        if let Some(samples) = &self.samples {
            let _ = writeln!(out, "samples: WESAD {}, K-EmoCon {}", samples.wesad, samples.kemocon);
        }
        out
    }
}

impl Render for AvailableSamples {
    fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "WESAD samples:    {} (subjects {:?})", self.wesad_samples, self.wesad_subjects);
        let _ = writeln!(
            out,
            "K-EmoCon samples: {} (participants {:?})",
            self.kemocon_samples, self.kemocon_participants
        );
        for direction in Direction::ALL {
            let _ = writeln!(out, "{} evaluates {} samples", direction.label(), self.samples_for(direction));
        }
        out
    }
}

impl Render for SampleView {
    fn render(&self) -> String {
        let d = &self.details;
        let mut out = format!("{} sample {}", d.direction, d.sample_index);
        if let Some(subject) = d.subject_id {
            let _ = write!(out, " (subject {})", subject);
        }
        let _ = writeln!(
            out,
            "\nlabels: arousal {}, valence {}",
            if d.arousal_binary { "high" } else { "low" },
            if d.valence_binary { "high" } else { "low" }
        );
        if let Some(label) = &d.emotion_label {
            let _ = writeln!(out, "emotion: {}", label);
        }
        out.push_str("top features:\n");
        write_ranked(&mut out, &self.top_features);
        out
    }
}

impl Render for PredictionView {
    fn render(&self) -> String {
        let r = &self.result;
        let mut out = format!("{} sample {}\n", r.direction.label(), r.sample_index);
        for dimension in Dimension::ALL {
            if let Some(p) = r.prediction(dimension) {
                let _ = writeln!(
                    out,
                    "  {:<8} {:<5} p={:.3} confidence {}  truth {} {}",
                    dimension,
                    p.class,
                    p.probability,
                    pct(p.confidence),
                    r.ground_truth.get(dimension),
                    if r.is_correct(dimension) { "✓" } else { "✗" }
                );
            }
        }
        if !self.top_features.is_empty() {
            out.push_str("features used:\n");
            write_ranked(&mut out, &self.top_features);
        }
        out
    }
}

impl Render for WesadView {
    fn render(&self) -> String {
        let mut out = format!(
            "subject {} sample {} (true emotion: {})\n",
            self.request.subject_id, self.request.sample_index, self.prediction.accuracy.true_emotion
        );
        for model in WesadModel::ALL {
            let score = self.prediction.score(model);
            let _ = writeln!(
                out,
                "  {:<9} {:<11} {}  {}",
                model.as_str(),
                score.emotion_name,
                pct(score.confidence),
                if self.prediction.is_correct(model) { "✓" } else { "✗" }
            );
        }
        out
    }
}

impl Render for BatchRun {
    fn render(&self) -> String {
        let mut out = format!(
            "{}: {} of {} samples predicted{}\n",
            self.direction.label(),
            self.stats.total,
            self.requested,
            if self.cancelled { " (cancelled)" } else { "" }
        );
        let _ = writeln!(out, "  arousal accuracy: {}", pct(self.stats.arousal_accuracy));
        let _ = writeln!(out, "  valence accuracy: {}", pct(self.stats.valence_accuracy));
        let _ = writeln!(out, "  overall accuracy: {}", opt_pct(self.stats.overall_accuracy));
        for failure in &self.failures {
            let _ = writeln!(out, "  sample {} failed: {}", failure.sample_index, failure.error);
        }
        out
    }
}

impl Render for ModelInfo {
    fn render(&self) -> String {
        let mut out = String::new();
        for dimension in Dimension::ALL {
            for direction in Direction::ALL {
                if let Some(model) = self.get(dimension, direction) {
                    let _ = writeln!(
                        out,
                        "{:<8} {:<17} {:<20} threshold {:.2} ({} estimators)",
                        dimension,
                        direction,
                        model.model_type,
                        model.threshold,
                        model.estimators.len()
                    );
                }
            }
        }
        out
    }
}

impl Render for Overview {
    fn render(&self) -> String {
        let mut out = format!(
            "average: accuracy {}, f1 {}, roc auc {}\n",
            opt_pct(self.average_metrics.accuracy),
            opt_pct(self.average_metrics.f1_score),
            opt_pct(self.average_metrics.roc_auc)
        );
        for dimension in Dimension::ALL {
            for direction in Direction::ALL {
                if let Some(m) = self.metrics(dimension, direction) {
                    let _ = writeln!(
                        out,
                        "{:<8} {:<17} accuracy {}, f1 {}, gap reduction {}",
                        dimension,
                        direction,
                        opt_pct(m.accuracy),
                        opt_pct(m.f1_score),
                        m.gap_reduction_percent
                            .map(|g| format!("{:.1}%", g))
                            .unwrap_or_else(|| "-".to_string())
                    );
                }
            }
        }
        out
    }
}

impl Render for ConfusionMatrices {
    fn render(&self) -> String {
        let mut out = format!("{} confusion matrices\n", self.target);
        for direction in Direction::ALL {
            let m = self.get(direction);
            let _ = writeln!(out, "{} (accuracy {})", direction.label(), opt_pct(m.accuracy()));
            let _ = writeln!(out, "  {:>12} {}", "", m.class_names.join("  "));
            for (name, row) in m.class_names.iter().zip(&m.confusion_matrix) {
                let cells: Vec<String> = row.iter().map(|c| format!("{:>5}", c)).collect();
                let _ = writeln!(out, "  {:>12} {}", name, cells.join(" "));
            }
        }
        out
    }
}

impl Render for DomainGap {
    fn render(&self) -> String {
        let mut out = format!(
            "{} domain gap: {} WESAD / {} K-EmoCon points\n",
            self.target,
            self.wesad.len(),
            self.kemocon.len()
        );
        if !self.explained_variance.is_empty() {
            let variance: Vec<String> = self.explained_variance.iter().map(|v| pct(*v)).collect();
            let _ = writeln!(out, "explained variance: {}", variance.join(", "));
        }
        if let (Some(before), Some(after)) = (self.gap_before, self.gap_after) {
            let _ = writeln!(out, "gap: {:.3} → {:.3}", before, after);
        }
        if let Some(reduction) = self.reduction_percent() {
            let _ = writeln!(out, "reduction: {:.1}%", reduction);
        }
        out
    }
}

impl Render for FeatureView {
    fn render(&self) -> String {
        let mut out = format!("{} feature mapping ({} pairs)\n", self.target, self.mapping.len());
        write_ranked(&mut out, &self.top_features);
        out
    }
}

impl Render for ClassDistribution {
    fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.data {
            let _ = writeln!(
                out,
                "{:<8} {:<9} low {:>4}  high {:>4}  ratio {:.2}",
                entry.target, entry.dataset, entry.low_count, entry.high_count, entry.ratio
            );
        }
        out
    }
}

impl Render for Vec<SubjectInfo> {
    fn render(&self) -> String {
        let mut out = String::new();
        for subject in self {
            let classes: Vec<String> = subject
                .class_distribution
                .iter()
                .map(|(name, count)| format!("{} {}", name, count))
                .collect();
            let _ = writeln!(
                out,
                "subject {:>3}: {} samples ({})",
                subject.subject_id,
                subject.num_samples,
                classes.join(", ")
            );
        }
        out
    }
}

impl Render for EvaluationView {
    fn render(&self) -> String {
        match self {
            EvaluationView::Subject(evaluation) => {
                let mut out = format!(
                    "subject {} evaluation ({} samples)\n",
                    evaluation.subject_id,
                    evaluation.sample_count()
                );
                let _ = writeln!(out, "  {:<10} {:>9} {:>9}", "model", "accuracy", "macro F1");
                for model in WesadModel::ALL {
                    let _ = writeln!(
                        out,
                        "  {:<10} {:>9} {:>9}",
                        model.as_str(),
                        pct(*evaluation.accuracy.get(model)),
                        pct(*evaluation.f1_score.get(model))
                    );
                }
                out
            }
            EvaluationView::Overall(overall) => {
                let mut out = format!(
                    "overall performance over {} subjects\n",
                    overall.per_subject.subject_ids.len()
                );
                let _ = writeln!(out, "  {:<10} {:>9} {:>9}", "model", "accuracy", "macro F1");
                for model in WesadModel::ALL {
                    let _ = writeln!(
                        out,
                        "  {:<10} {:>9} {:>9}",
                        model.as_str(),
                        pct(*overall.mean_metrics.accuracy(model)),
                        pct(*overall.mean_metrics.f1(model))
                    );
                }
                let gains = &overall.improvements;
                let _ = writeln!(
                    out,
                    "gain over base: personal {:+.1} pts, ensemble {:+.1} pts, adaptive {:+.1} pts",
                    gains.personal_vs_base * 100.0,
                    gains.ensemble_vs_base * 100.0,
                    gains.adaptive_vs_base * 100.0
                );
                out
            }
        }
    }
}

impl Render for Vec<HistoryRow> {
    fn render(&self) -> String {
        if self.is_empty() {
            return "no predictions yet\n".to_string();
        }
        let mut out = String::new();
        for row in self {
            let _ = writeln!(out, "{:>3} {:<9} {}  {}", row.sequence, row.when, row.source.as_str(), row.summary);
        }
        out
    }
}

impl Render for DemoReport {
    fn render(&self) -> String {
        let mut out = format!("{} predictions made\n", self.predictions);
        for failure in &self.failures {
            let _ = writeln!(out, "failed: {}", failure);
        }
        out.push_str("recent predictions:\n");
        out.push_str(&self.history.render());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::prediction::BatchStats;
    use chrono::Utc;

    #[test]
    fn test_batch_render_marks_cancelled() {
        let run = BatchRun {
            direction: Direction::WesadToKemocon,
            requested: 10,
            results: vec![],
            failures: vec![],
            stats: BatchStats::from_results(&[]),
            cancelled: true,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };
        let text = run.render();
        assert!(text.contains("0 of 10 samples predicted (cancelled)"));
        assert!(text.contains("overall accuracy: 0.0%"));
    }

    #[test]
    fn test_empty_history_render() {
        assert_eq!(Vec::<HistoryRow>::new().render(), "no predictions yet\n");
    }

    #[test]
    fn test_subject_evaluation_render() {
        let identity = |n: usize| -> Vec<Vec<u32>> {
            (0..n).map(|i| (0..n).map(|j| u32::from(i == j)).collect()).collect()
        };
        let view = EvaluationView::Subject(EvaluationResult {
            subject_id: 3,
            accuracy: PerModel { base: 0.5, personal: 0.75, ensemble: 0.75, adaptive: 1.0 },
            f1_score: PerModel { base: 0.5, personal: 0.7, ensemble: 0.7, adaptive: 1.0 },
            confusion_matrix: PerModel {
                base: identity(4),
                personal: identity(4),
                ensemble: identity(4),
                adaptive: identity(4),
            },
        });
        let text = view.render();
        assert!(text.starts_with("subject 3 evaluation (4 samples)"));
        assert!(text.contains("personal       75.0%"));
    }
}
