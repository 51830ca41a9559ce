//! Named arm sets: keys plus one policy instance.
//!
//! An [`ArmSet`] is the unit every tree tier is made of. It owns the key list
//! (index `i` of the policy is `keys[i]`), resolves names, and keeps a
//! caller-fed performance history.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{BanditError, Result};
use crate::policy::{ArmPolicy, FieldUpdates, PolicyFactory};
use crate::thompson::BetaBandit;

/// Point-in-time view of one arm.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArmSnapshot {
    pub key: String,
    pub trials: u64,
    pub reward_total: f64,
}

/// One set of sibling arms with its bandit policy.
#[derive(Debug, Clone)]
pub struct ArmSet<P = BetaBandit> {
    keys: Vec<String>,
    policy: P,
    metric: Vec<f64>,
}

impl<P: ArmPolicy> ArmSet<P> {
    /// Build an arm set over `keys` with a policy from `factory`.
    ///
    /// Fails with `InvalidArmSet` when `keys` is empty or repeats a key, or
    /// when the factory's policy does not have exactly one arm per key.
    pub fn new<F>(keys: Vec<String>, factory: &mut F) -> Result<Self>
    where
        F: PolicyFactory<Policy = P> + ?Sized,
    {
        if keys.is_empty() {
            return Err(BanditError::InvalidArmSet("zero arms".to_string()));
        }
        for (i, k) in keys.iter().enumerate() {
            if keys[..i].contains(k) {
                return Err(BanditError::InvalidArmSet(format!("duplicate arm {k:?}")));
            }
        }
        let policy = factory.build(&keys);
        if policy.num_arms() != keys.len() {
            return Err(BanditError::InvalidArmSet(format!(
                "policy has {} arms for {} keys",
                policy.num_arms(),
                keys.len()
            )));
        }
        Ok(Self {
            keys,
            policy,
            metric: Vec::new(),
        })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    pub(crate) fn resolve(&self, key: &str) -> Result<usize> {
        self.index_of(key).ok_or_else(|| BanditError::unknown_arm(key))
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Sample the policy and return the chosen key. Counts are not touched.
    pub fn evaluate(&mut self) -> Result<&str> {
        let idx = self.evaluate_index()?;
        Ok(&self.keys[idx])
    }

    /// Like [`evaluate`](Self::evaluate), returning the arm index.
    pub fn evaluate_index(&mut self) -> Result<usize> {
        let idx = self.policy.select_arm()?;
        if idx >= self.keys.len() {
            return Err(BanditError::InvalidArmSet(format!(
                "policy chose arm {idx} of {}",
                self.keys.len()
            )));
        }
        Ok(idx)
    }

    /// Record one outcome for `key`.
    pub fn update(&mut self, key: &str, feedback: &P::Feedback) -> Result<()> {
        let idx = self.resolve(key)?;
        self.policy.update(idx, feedback);
        debug!(arm = key, trials = self.policy.trials(idx), "arm updated");
        Ok(())
    }

    /// Record the same outcome once for each of `keys`.
    ///
    /// Every key is resolved before anything is written: on `UnknownArm`
    /// nothing changes.
    pub fn update_many<S: AsRef<str>>(&mut self, keys: &[S], feedback: &P::Feedback) -> Result<()> {
        let indices = keys
            .iter()
            .map(|k| self.resolve(k.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        for idx in indices {
            self.policy.update(idx, feedback);
        }
        debug!(arms = keys.len(), "arms updated");
        Ok(())
    }

    /// Check a `{arm key: {field: value}}` override without writing.
    pub fn validate_override(&self, updates: &BTreeMap<String, FieldUpdates>) -> Result<()> {
        for (key, fields) in updates {
            let idx = self.resolve(key)?;
            self.policy.validate_override(idx, fields)?;
        }
        Ok(())
    }

    /// Overwrite state slots of named arms. Validated in full first.
    pub fn override_priors(&mut self, updates: &BTreeMap<String, FieldUpdates>) -> Result<()> {
        self.validate_override(updates)?;
        for (key, fields) in updates {
            let idx = self.resolve(key)?;
            self.policy.apply_override(idx, fields)?;
            debug!(arm = key.as_str(), fields = fields.len(), "arm state overridden");
        }
        Ok(())
    }

    /// Caller-recorded performance history for this arm set, oldest first.
    ///
    /// Nothing is appended automatically; see [`record_metric`](Self::record_metric).
    pub fn performance(&self) -> &[f64] {
        &self.metric
    }

    pub fn record_metric(&mut self, value: f64) {
        self.metric.push(value);
    }

    /// Up to `n` `(key, trials)` pairs, by accumulated reward descending.
    ///
    /// Equal rewards keep index order.
    pub fn top_arms(&self, n: usize) -> Vec<(String, u64)> {
        let mut order: Vec<usize> = (0..self.keys.len()).collect();
        order.sort_by(|&a, &b| {
            self.policy
                .reward_total(b)
                .total_cmp(&self.policy.reward_total(a))
        });
        order
            .into_iter()
            .take(n)
            .map(|i| (self.keys[i].clone(), self.policy.trials(i)))
            .collect()
    }

    pub fn snapshot(&self) -> Vec<ArmSnapshot> {
        self.keys
            .iter()
            .enumerate()
            .map(|(i, key)| ArmSnapshot {
                key: key.clone(),
                trials: self.policy.trials(i),
                reward_total: self.policy.reward_total(i),
            })
            .collect()
    }
}
