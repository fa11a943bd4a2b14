//! Feature importance ranking for display

use serde::Serialize;
use std::cmp::Ordering;

/// Features shown by default
pub const DEFAULT_TOP_FEATURES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedFeature {
    pub name: String,
    /// Signed value as received
    pub value: f64,
    /// |value| as a percentage of the largest |value| in the input
    pub magnitude_pct: f64,
}

/// Top `top_n` features by descending absolute value. Ties are ordered by
/// name; non-finite values are skipped.
pub fn rank_features<'a, I>(features: I, top_n: usize) -> Vec<RankedFeature>
where
    I: IntoIterator<Item = (&'a String, &'a f64)>,
{
    let mut finite: Vec<(&String, f64)> = features
        .into_iter()
        .filter(|(_, v)| v.is_finite())
        .map(|(name, v)| (name, *v))
        .collect();

    finite.sort_by(|a, b| match b.1.abs().total_cmp(&a.1.abs()) {
        Ordering::Equal => a.0.cmp(b.0),
        other => other,
    });

    let max = finite.first().map(|(_, v)| v.abs()).unwrap_or(0.0);

    finite
        .into_iter()
        .take(top_n)
        .map(|(name, value)| RankedFeature {
            name: name.clone(),
            value,
            magnitude_pct: if max > 0.0 { value.abs() / max * 100.0 } else { 0.0 },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};

    fn features(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
        pairs.iter().map(|(n, v)| (n.to_string(), *v)).collect()
    }

    fn rank(pairs: &[(String, f64)], top_n: usize) -> Vec<RankedFeature> {
        rank_features(pairs.iter().map(|(n, v)| (n, v)), top_n)
    }

    #[test]
    fn test_ranks_by_magnitude() {
        let input = features(&[
            ("hr_mean", 0.2),
            ("eda_mean", -0.8),
            ("temp_slope", 0.4),
            ("bvp_amp", 0.1),
            ("hrv_rmssd", -0.05),
            ("eda_scr_rate", 0.6),
        ]);
        let ranked = rank(&input, DEFAULT_TOP_FEATURES);

        let names: Vec<&str> = ranked.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["eda_mean", "eda_scr_rate", "temp_slope", "hr_mean", "bvp_amp"]);
        assert_eq!(ranked[0].value, -0.8);
        assert_eq!(ranked[0].magnitude_pct, 100.0);
        assert!((ranked[2].magnitude_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_order_invariant() {
        let input = features(&[("b", 0.5), ("a", -0.5), ("c", 0.9), ("d", 0.1)]);
        let mut reversed = input.clone();
        reversed.reverse();

        let from_map: HashMap<String, f64> = input.iter().cloned().collect();
        let expected = rank(&input, 3);

        assert_eq!(rank(&reversed, 3), expected);
        assert_eq!(rank_features(&from_map, 3), expected);
        assert_eq!(expected[1].name, "a");
        assert_eq!(expected[2].name, "b");
    }

    #[test]
    fn test_skips_non_finite() {
        let input = features(&[("nan", f64::NAN), ("inf", f64::INFINITY), ("ok", 2.0)]);
        let ranked = rank(&input, 5);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].name, "ok");
    }

    #[test]
    fn test_all_zero_and_empty() {
        let zeros: BTreeMap<String, f64> = [("a".to_string(), 0.0)].into();
        assert_eq!(rank_features(&zeros, 5)[0].magnitude_pct, 0.0);
        assert!(rank_features(&BTreeMap::<String, f64>::new(), 5).is_empty());
    }
}
