//! The plug-in point: per-arm-set bandit policies and their factory.
//!
//! Every arm set in a tree owns one [`ArmPolicy`] instance. Policies work on
//! arm *indices*; name resolution happens in [`ArmSet`][crate::ArmSet]. A
//! tree is built with a [`PolicyFactory`], consumed once at build time.
//!
//! [`BetaBandit`][crate::BetaBandit] (Thompson sampling over Beta posteriors)
//! is the default. [`Exp3Ix`][crate::Exp3Ix] shows that any policy honoring
//! the two-operation contract can be substituted.
//!
//! # Example
//!
//! ```rust
//! use banditree::{ArmPolicy, BanditNode, BetaBandit, BetaConfig};
//!
//! // A closure is a factory.
//! let factory = |keys: &[String]| BetaBandit::new(keys, &BetaConfig::default(), 11);
//! let mut tree = BanditNode::from_combinations(
//!     [["shoes", "red"], ["shoes", "blue"], ["hats", "wool"]],
//!     factory,
//! )
//! .unwrap();
//! let path = tree.evaluate().unwrap();
//! tree.update(&path, &true).unwrap();
//! ```

use std::collections::BTreeMap;

use crate::error::{BanditError, Result};

/// A replacement value for one slot of an arm's state.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum FieldValue {
    /// A counter (`trials`, `rewards`).
    Count(u64),
    /// A prior pair `(alpha0, beta0)`.
    Prior(f64, f64),
}

/// Field name → replacement value, for one arm.
pub type FieldUpdates = BTreeMap<String, FieldValue>;

/// A bandit over `k` arms addressed by index.
pub trait ArmPolicy {
    /// Outcome data forwarded unchanged from `update` callers.
    type Feedback: ?Sized;

    /// Number of arms.
    fn num_arms(&self) -> usize;

    /// Choose an arm index in `0..num_arms()`.
    fn select_arm(&mut self) -> Result<usize>;

    /// Record one outcome for `arm`. `arm` is always in range.
    fn update(&mut self, arm: usize, feedback: &Self::Feedback);

    /// Times `arm` has been updated (or overridden to).
    fn trials(&self, arm: usize) -> u64;

    /// Accumulated reward for `arm`, used for ranking.
    fn reward_total(&self, arm: usize) -> f64;

    /// Check an override for `arm` against the current state without writing.
    ///
    /// Policies without overridable state reject every field.
    fn validate_override(&self, arm: usize, fields: &FieldUpdates) -> Result<()> {
        let _ = arm;
        match fields.keys().next() {
            Some(field) => Err(BanditError::unknown_field(field)),
            None => Ok(()),
        }
    }

    /// Overwrite state slots of `arm`. Must validate exactly like
    /// [`validate_override`](Self::validate_override) and write nothing on error.
    fn apply_override(&mut self, arm: usize, fields: &FieldUpdates) -> Result<()> {
        self.validate_override(arm, fields)
    }
}

/// Builds one policy per arm set, given that set's keys in index order.
pub trait PolicyFactory {
    type Policy: ArmPolicy;

    fn build(&mut self, keys: &[String]) -> Self::Policy;
}

impl<F, P> PolicyFactory for F
where
    F: FnMut(&[String]) -> P,
    P: ArmPolicy,
{
    type Policy = P;

    fn build(&mut self, keys: &[String]) -> P {
        self(keys)
    }
}
