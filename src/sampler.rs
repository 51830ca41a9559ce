//! Posterior-sampling argmax: the Thompson selection rule.
//!
//! Stateless. Callers own the RNG (so a seeded policy stays reproducible) and
//! hand in one `(alpha, beta)` posterior per arm, in arm-index order.

use rand::Rng;
use rand_distr::{Beta, Distribution};
use tracing::warn;

use crate::error::{BanditError, Result};

/// Draw one sample from `Beta(alpha, beta)`.
///
/// Degenerate parameters (non-finite or `<= 0`) yield `0.5`.
pub fn sample_beta<R: Rng + ?Sized>(alpha: f64, beta: f64, rng: &mut R) -> f64 {
    if !(alpha.is_finite() && beta.is_finite()) || alpha <= 0.0 || beta <= 0.0 {
        warn!(alpha, beta, "degenerate beta posterior; using 0.5");
        return 0.5;
    }
    match Beta::new(alpha, beta) {
        Ok(dist) => dist.sample(rng),
        Err(_) => 0.5,
    }
}

/// Sample every posterior once and return the index of the largest draw.
///
/// Ties go to the lowest index. Fails with `InvalidArmSet` when
/// `posteriors` is empty.
pub fn sample_argmax<I, R>(posteriors: I, rng: &mut R) -> Result<usize>
where
    I: IntoIterator<Item = (f64, f64)>,
    R: Rng + ?Sized,
{
    let mut best: Option<usize> = None;
    let mut best_sample = f64::NEG_INFINITY;
    for (i, (alpha, beta)) in posteriors.into_iter().enumerate() {
        let x = sample_beta(alpha, beta, rng);
        if best.is_none() || x > best_sample {
            best_sample = x;
            best = Some(i);
        }
    }
    best.ok_or_else(|| BanditError::InvalidArmSet("no arms to sample".to_string()))
}
