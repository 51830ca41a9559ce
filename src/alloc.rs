//! Allocation helpers (probabilities, softmax).
//!
//! Deterministic: turns per-arm scores into a traffic split without sampling.

/// Stable softmax over index-aligned scores.
///
/// - `temperature` controls sharpness; non-finite or `<= 0` falls back to `1.0`.
/// - Uses the max-trick for numerical stability.
/// - Returns a distribution summing to 1, or an empty vector for empty input.
pub fn softmax(scores: &[f64], temperature: f64) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }
    let t = if temperature.is_finite() && temperature > 0.0 {
        temperature
    } else {
        1.0
    };

    let max_score = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut out: Vec<f64> = scores.iter().map(|&v| ((v - max_score) / t).exp()).collect();
    let denom: f64 = out.iter().sum();
    if denom <= 0.0 || !denom.is_finite() {
        // Degenerate: uniform.
        let n = scores.len() as f64;
        return vec![1.0 / n; scores.len()];
    }
    for v in &mut out {
        *v /= denom;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn higher_score_gets_more_mass() {
        let p = softmax(&[0.2, 0.8], 0.1);
        assert!(p[1] > p[0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn nan_scores_fall_back_to_uniform() {
        let p = softmax(&[f64::NAN, 1.0], 1.0);
        assert_eq!(p, vec![0.5, 0.5]);
    }

    proptest! {
        #[test]
        fn softmax_is_a_distribution(
            scores in proptest::collection::vec(-1.0e6f64..1.0e6f64, 0..20),
            temperature in prop_oneof![Just(f64::NAN), Just(0.0), Just(-1.0), 1.0e-6f64..1.0e6f64],
        ) {
            let p = softmax(&scores, temperature);
            prop_assert_eq!(p.len(), scores.len());
            if !scores.is_empty() {
                let sum: f64 = p.iter().sum();
                prop_assert!((sum - 1.0).abs() < 1e-9, "sum={}", sum);
                for &v in &p {
                    prop_assert!(v.is_finite() && (0.0..=1.0).contains(&v));
                }
            }
        }
    }
}
