//! Beta–Bernoulli Thompson sampling: the default arm policy.
//!
//! Each arm keeps integer `trials` / `rewards` counts plus a `(alpha0, beta0)`
//! prior. Selection samples `Beta(alpha0 + rewards, beta0 + trials - rewards)`
//! per arm and takes the argmax (see [`crate::sampler`]).
//!
//! Notes:
//! - This policy is **seedable** so selection can be reproducible in tests.
//! - [`BetaFactory`] derives a distinct, deterministic seed per arm set.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;

use crate::alloc::softmax;
use crate::error::{BanditError, Result};
use crate::policy::{ArmPolicy, FieldUpdates, FieldValue, PolicyFactory};
use crate::sampler::sample_argmax;
use crate::stable_hash::arm_set_seed;

/// Override field: number of recorded trials.
pub const FIELD_TRIALS: &str = "trials";
/// Override field: number of recorded successes.
pub const FIELD_REWARDS: &str = "rewards";
/// Override field: `(alpha0, beta0)` prior pair.
pub const FIELD_PRIOR: &str = "prior";

/// Configuration for Beta–Bernoulli Thompson sampling.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BetaConfig {
    /// Prior alpha (must be > 0).
    pub alpha0: f64,
    /// Prior beta (must be > 0).
    pub beta0: f64,
    /// Optional per-arm priors by key. If present, overrides `(alpha0, beta0)`
    /// for every arm set that has an arm with that key.
    pub priors: BTreeMap<String, (f64, f64)>,
    /// Base seed; each arm set's RNG is derived from it.
    pub seed: u64,
}

impl Default for BetaConfig {
    fn default() -> Self {
        Self {
            alpha0: 1.0,
            beta0: 1.0,
            priors: BTreeMap::new(),
            seed: 0,
        }
    }
}

impl BetaConfig {
    fn prior_for(&self, arm: &str) -> (f64, f64) {
        let (a, b) = self
            .priors
            .get(arm)
            .copied()
            .unwrap_or((self.alpha0, self.beta0));
        (
            if valid_prior_param(a) { a } else { 1.0 },
            if valid_prior_param(b) { b } else { 1.0 },
        )
    }
}

fn valid_prior_param(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

/// Beta posterior parameters for one arm.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BetaPosterior {
    pub alpha: f64,
    pub beta: f64,
}

impl BetaPosterior {
    pub fn expected_value(&self) -> f64 {
        let denom = self.alpha + self.beta;
        if denom <= 0.0 {
            0.5
        } else {
            self.alpha / denom
        }
    }
}

/// Seedable Beta–Bernoulli Thompson-sampling bandit over index-addressed arms.
#[derive(Debug, Clone)]
pub struct BetaBandit {
    trials: Vec<u64>,
    rewards: Vec<u64>,
    prior: Vec<(f64, f64)>,
    rng: StdRng,
}

impl BetaBandit {
    /// One arm per key; priors come from `cfg` (per-key entries first).
    pub fn new(keys: &[String], cfg: &BetaConfig, seed: u64) -> Self {
        Self {
            trials: vec![0; keys.len()],
            rewards: vec![0; keys.len()],
            prior: keys.iter().map(|k| cfg.prior_for(k)).collect(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// `num_arms` arms with the uniform `(1, 1)` prior.
    pub fn uniform(num_arms: usize, seed: u64) -> Self {
        Self {
            trials: vec![0; num_arms],
            rewards: vec![0; num_arms],
            prior: vec![(1.0, 1.0); num_arms],
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn trials_slice(&self) -> &[u64] {
        &self.trials
    }

    pub fn rewards_slice(&self) -> &[u64] {
        &self.rewards
    }

    pub fn priors(&self) -> &[(f64, f64)] {
        &self.prior
    }

    /// Current posterior of `arm`.
    pub fn posterior(&self, arm: usize) -> BetaPosterior {
        let (a0, b0) = self.prior[arm];
        let r = self.rewards[arm];
        let t = self.trials[arm];
        BetaPosterior {
            alpha: a0 + r as f64,
            beta: b0 + t.saturating_sub(r) as f64,
        }
    }

    /// Deterministic allocation over arms from posterior means (softmax).
    ///
    /// Useful for traffic-splitting systems that want probabilities rather
    /// than a sampled argmax. Index-aligned with the arms.
    pub fn allocation_mean_softmax(&self, temperature: f64) -> Vec<f64> {
        let means: Vec<f64> = (0..self.trials.len())
            .map(|i| self.posterior(i).expected_value())
            .collect();
        softmax(&means, temperature)
    }

    /// State of `arm` after applying `fields`, without writing it.
    fn staged(&self, arm: usize, fields: &FieldUpdates) -> Result<ArmSlots> {
        let mut slots = ArmSlots {
            trials: self.trials[arm],
            rewards: self.rewards[arm],
            prior: self.prior[arm],
        };
        for (field, value) in fields {
            match (field.as_str(), *value) {
                (FIELD_TRIALS, FieldValue::Count(n)) => slots.trials = n,
                (FIELD_REWARDS, FieldValue::Count(n)) => slots.rewards = n,
                (FIELD_PRIOR, FieldValue::Prior(a, b)) => {
                    if !(valid_prior_param(a) && valid_prior_param(b)) {
                        return Err(BanditError::invalid_value(
                            field,
                            format!("prior ({a}, {b}) must be finite and positive"),
                        ));
                    }
                    slots.prior = (a, b);
                }
                (FIELD_TRIALS | FIELD_REWARDS, FieldValue::Prior(..)) => {
                    return Err(BanditError::invalid_value(field, "expected a count"));
                }
                (FIELD_PRIOR, FieldValue::Count(_)) => {
                    return Err(BanditError::invalid_value(field, "expected an (alpha, beta) pair"));
                }
                _ => return Err(BanditError::unknown_field(field)),
            }
        }
        if slots.rewards > slots.trials {
            return Err(BanditError::invalid_value(
                FIELD_REWARDS,
                format!("rewards {} exceed trials {}", slots.rewards, slots.trials),
            ));
        }
        Ok(slots)
    }
}

struct ArmSlots {
    trials: u64,
    rewards: u64,
    prior: (f64, f64),
}

impl ArmPolicy for BetaBandit {
    type Feedback = bool;

    fn num_arms(&self) -> usize {
        self.trials.len()
    }

    fn select_arm(&mut self) -> Result<usize> {
        let posteriors: Vec<(f64, f64)> = (0..self.trials.len())
            .map(|i| {
                let p = self.posterior(i);
                (p.alpha, p.beta)
            })
            .collect();
        sample_argmax(posteriors, &mut self.rng)
    }

    fn update(&mut self, arm: usize, success: &bool) {
        self.trials[arm] = self.trials[arm].saturating_add(1);
        if *success {
            self.rewards[arm] = self.rewards[arm].saturating_add(1);
        }
    }

    fn trials(&self, arm: usize) -> u64 {
        self.trials[arm]
    }

    fn reward_total(&self, arm: usize) -> f64 {
        self.rewards[arm] as f64
    }

    fn validate_override(&self, arm: usize, fields: &FieldUpdates) -> Result<()> {
        self.staged(arm, fields).map(|_| ())
    }

    fn apply_override(&mut self, arm: usize, fields: &FieldUpdates) -> Result<()> {
        let slots = self.staged(arm, fields)?;
        self.trials[arm] = slots.trials;
        self.rewards[arm] = slots.rewards;
        self.prior[arm] = slots.prior;
        Ok(())
    }
}

/// Factory for [`BetaBandit`] arm sets.
///
/// Arm set `n` (in build order) is seeded with
/// [`arm_set_seed`]`(cfg.seed, n, keys)`.
#[derive(Debug, Clone, Default)]
pub struct BetaFactory {
    cfg: BetaConfig,
    built: u64,
}

impl BetaFactory {
    pub fn new(cfg: BetaConfig) -> Self {
        Self { cfg, built: 0 }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(BetaConfig {
            seed,
            ..BetaConfig::default()
        })
    }
}

impl PolicyFactory for BetaFactory {
    type Policy = BetaBandit;

    fn build(&mut self, keys: &[String]) -> BetaBandit {
        let seed = arm_set_seed(self.cfg.seed, self.built, keys);
        self.built += 1;
        BetaBandit::new(keys, &self.cfg, seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn update_counts_only_the_chosen_arm() {
        let mut b = BetaBandit::uniform(3, 0);
        b.update(1, &true);
        b.update(1, &false);
        assert_eq!(b.trials_slice(), &[0, 2, 0]);
        assert_eq!(b.rewards_slice(), &[0, 1, 0]);
    }

    #[test]
    fn posterior_follows_counts_and_prior() {
        let cfg = BetaConfig {
            priors: BTreeMap::from([("b".to_string(), (2.0, 5.0))]),
            ..BetaConfig::default()
        };
        let mut b = BetaBandit::new(&keys(&["a", "b"]), &cfg, 0);
        b.update(1, &true);
        b.update(1, &false);
        b.update(1, &false);
        assert_eq!(b.posterior(0), BetaPosterior { alpha: 1.0, beta: 1.0 });
        assert_eq!(b.posterior(1), BetaPosterior { alpha: 3.0, beta: 7.0 });
    }

    #[test]
    fn invalid_configured_priors_fall_back_to_uniform() {
        let cfg = BetaConfig {
            alpha0: -1.0,
            beta0: f64::INFINITY,
            ..BetaConfig::default()
        };
        let b = BetaBandit::new(&keys(&["a"]), &cfg, 0);
        assert_eq!(b.priors(), &[(1.0, 1.0)]);
    }

    #[test]
    fn deterministic_choice_given_same_seed_and_state() {
        let mut b1 = BetaBandit::uniform(4, 42);
        let mut b2 = BetaBandit::uniform(4, 42);
        for arm in 0..4 {
            b1.update(arm, &(arm % 2 == 0));
            b2.update(arm, &(arm % 2 == 0));
        }
        for _ in 0..20 {
            assert_eq!(b1.select_arm().unwrap(), b2.select_arm().unwrap());
        }
    }

    #[test]
    fn empty_bandit_cannot_select() {
        let mut b = BetaBandit::uniform(0, 0);
        assert!(matches!(b.select_arm(), Err(BanditError::InvalidArmSet(_))));
    }

    #[test]
    fn override_writes_all_fields_atomically() {
        let mut b = BetaBandit::uniform(2, 0);
        let fields = FieldUpdates::from([
            (FIELD_TRIALS.to_string(), FieldValue::Count(10)),
            (FIELD_REWARDS.to_string(), FieldValue::Count(8)),
            (FIELD_PRIOR.to_string(), FieldValue::Prior(2.0, 3.0)),
        ]);
        b.apply_override(0, &fields).unwrap();
        assert_eq!(b.trials(0), 10);
        assert_eq!(b.reward_total(0), 8.0);
        assert_eq!(b.priors()[0], (2.0, 3.0));
        assert_eq!(b.trials(1), 0);
    }

    #[test]
    fn override_rejections_leave_state_untouched() {
        let mut b = BetaBandit::uniform(1, 0);
        b.update(0, &true);

        let too_many = FieldUpdates::from([(FIELD_REWARDS.to_string(), FieldValue::Count(5))]);
        assert!(matches!(
            b.apply_override(0, &too_many),
            Err(BanditError::InvalidFieldValue { .. })
        ));

        let unknown = FieldUpdates::from([
            (FIELD_TRIALS.to_string(), FieldValue::Count(9)),
            ("metric".to_string(), FieldValue::Count(1)),
        ]);
        assert_eq!(
            b.apply_override(0, &unknown).unwrap_err(),
            BanditError::unknown_field("metric")
        );

        let bad_prior = FieldUpdates::from([(FIELD_PRIOR.to_string(), FieldValue::Prior(0.0, 1.0))]);
        assert!(b.validate_override(0, &bad_prior).is_err());

        let wrong_kind = FieldUpdates::from([(FIELD_TRIALS.to_string(), FieldValue::Prior(1.0, 1.0))]);
        assert!(b.apply_override(0, &wrong_kind).is_err());

        assert_eq!(b.trials(0), 1);
        assert_eq!(b.reward_total(0), 1.0);
        assert_eq!(b.priors()[0], (1.0, 1.0));
    }

    #[test]
    fn allocation_prefers_better_posterior_mean() {
        let mut b = BetaBandit::uniform(2, 0);
        for _ in 0..10 {
            b.update(0, &false);
            b.update(1, &true);
        }
        let p = b.allocation_mean_softmax(0.1);
        assert!(p[1] > p[0]);
    }

    #[test]
    fn factory_seeds_each_arm_set_differently() {
        let mut f = BetaFactory::with_seed(5);
        let k = keys(&["a", "b", "c", "d", "e", "f", "g", "h"]);
        let mut b1 = f.build(&k);
        let mut b2 = f.build(&k);
        let s1: Vec<usize> = (0..32).map(|_| b1.select_arm().unwrap()).collect();
        let s2: Vec<usize> = (0..32).map(|_| b2.select_arm().unwrap()).collect();
        assert_ne!(s1, s2);
    }
}
