//! EXP3-IX (adversarial bandit) as an alternative arm policy.
//!
//! Useful when rewards are adversarial or shift fast. Feedback is a scalar
//! reward in `[0, 1]` instead of a success flag. Like [`BetaBandit`], it is
//! **seedable** and deterministic by default.
//!
//! [`BetaBandit`]: crate::BetaBandit

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::error::{BanditError, Result};
use crate::policy::{ArmPolicy, PolicyFactory};
use crate::stable_hash::arm_set_seed;

/// EXP3-IX settings shared by every arm set an [`Exp3IxFactory`] builds.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Exp3IxConfig {
    /// Expected number of updates per arm set; sets the learning rate.
    pub horizon: usize,
    /// If in `(0, 1)`, tunes the learning rate for a high-probability bound instead.
    pub confidence_delta: Option<f64>,
    /// Base seed. [`Exp3IxFactory`] mixes it with each arm set's build order
    /// and keys; [`Exp3Ix::new`] uses it as given.
    pub seed: u64,
    /// Per-update multiplier on accumulated loss estimates, in `(0, 1]`.
    /// Out-of-range values mean `1.0`.
    pub decay: f64,
}

impl Default for Exp3IxConfig {
    fn default() -> Self {
        Self {
            horizon: 1_000,
            confidence_delta: None,
            seed: 0,
            decay: 1.0,
        }
    }
}

/// Seedable EXP3-IX bandit over index-addressed arms.
#[derive(Debug, Clone)]
pub struct Exp3Ix {
    cfg: Exp3IxConfig,
    gamma: f64,
    learning_rate: f64,
    rng: StdRng,

    uses: Vec<u64>,
    reward_sum: Vec<f64>,
    cum_loss_hat: Vec<f64>,
    probs: Vec<f64>,
}

impl Exp3Ix {
    pub fn new(num_arms: usize, cfg: Exp3IxConfig) -> Self {
        let k = num_arms.max(1) as f64;
        let nk = k * (cfg.horizon.max(1) as f64);
        let learning_rate = match cfg.confidence_delta {
            Some(delta) if delta.is_finite() && delta > 0.0 && delta < 1.0 => {
                ((k.ln() + ((k + 1.0) / delta).ln()) / nk).sqrt()
            }
            _ => (2.0 * (k + 1.0).ln() / nk).sqrt(),
        };
        Self {
            cfg,
            gamma: 0.5 * learning_rate,
            learning_rate,
            rng: StdRng::seed_from_u64(cfg.seed),
            uses: vec![0; num_arms],
            reward_sum: vec![0.0; num_arms],
            cum_loss_hat: vec![0.0; num_arms],
            probs: vec![1.0 / k; num_arms],
        }
    }

    /// Current selection probabilities, index-aligned with the arms.
    pub fn probabilities(&self) -> &[f64] {
        &self.probs
    }

    fn recompute_probs(&mut self) {
        // weights_i = exp(-eta * Lhat_i), normalized
        let eta = self.learning_rate;
        let min_l = self
            .cum_loss_hat
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let w: Vec<f64> = self
            .cum_loss_hat
            .iter()
            .map(|&l| (-eta * (l - min_l)).exp())
            .collect();
        let denom: f64 = w.iter().sum();
        if denom <= 0.0 || !denom.is_finite() {
            let k = self.cum_loss_hat.len() as f64;
            self.probs = vec![1.0 / k; self.cum_loss_hat.len()];
            return;
        }
        for (p, wi) in self.probs.iter_mut().zip(w) {
            *p = wi / denom;
        }
    }
}

impl ArmPolicy for Exp3Ix {
    type Feedback = f64;

    fn num_arms(&self) -> usize {
        self.uses.len()
    }

    /// Explore each arm once in index order, then sample the EXP3-IX distribution.
    fn select_arm(&mut self) -> Result<usize> {
        if self.uses.is_empty() {
            return Err(BanditError::InvalidArmSet("no arms to sample".to_string()));
        }
        if let Some(i) = self.uses.iter().position(|&u| u == 0) {
            return Ok(i);
        }
        let r: f64 = self.rng.random();
        let mut cdf = 0.0;
        for (i, p) in self.probs.iter().enumerate() {
            cdf += *p;
            if r < cdf {
                return Ok(i);
            }
        }
        // Numerical fallback.
        Ok(self.probs.len() - 1)
    }

    fn update(&mut self, arm: usize, reward01: &f64) {
        let decay = if self.cfg.decay.is_finite() && self.cfg.decay > 0.0 && self.cfg.decay <= 1.0 {
            self.cfg.decay
        } else {
            1.0
        };
        if decay < 1.0 {
            for x in &mut self.cum_loss_hat {
                *x *= decay;
            }
        }
        let r = if reward01.is_finite() {
            reward01.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let p = self.probs[arm];
        let denom = p + self.gamma;
        let loss_hat = if denom > 0.0 { (1.0 - r) / denom } else { 1.0 - r };

        self.cum_loss_hat[arm] += loss_hat;
        self.reward_sum[arm] += r;
        self.uses[arm] = self.uses[arm].saturating_add(1);
        self.recompute_probs();
    }

    fn trials(&self, arm: usize) -> u64 {
        self.uses[arm]
    }

    fn reward_total(&self, arm: usize) -> f64 {
        self.reward_sum[arm]
    }
}

/// Factory for [`Exp3Ix`] arm sets; seeds derive from `cfg.seed` like [`crate::BetaFactory`].
#[derive(Debug, Clone, Default)]
pub struct Exp3IxFactory {
    cfg: Exp3IxConfig,
    built: u64,
}

impl Exp3IxFactory {
    pub fn new(cfg: Exp3IxConfig) -> Self {
        Self { cfg, built: 0 }
    }
}

impl PolicyFactory for Exp3IxFactory {
    type Policy = Exp3Ix;

    fn build(&mut self, keys: &[String]) -> Exp3Ix {
        let cfg = Exp3IxConfig {
            seed: arm_set_seed(self.cfg.seed, self.built, keys),
            ..self.cfg
        };
        self.built += 1;
        Exp3Ix::new(keys.len(), cfg)
    }
}
