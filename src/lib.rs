//! `banditree`: hierarchical Thompson-sampling bandits over tiered taxonomies.
//!
//! Choosing an action means choosing, at each tier of a nested taxonomy, one
//! child among siblings (e.g. `category → subcategory → variant`). Every
//! internal node runs its own bandit over its children; the leaf tier runs one
//! over the final variants.
//!
//! ```text
//!            root: Beta bandit over {a}
//!             └─ a: Beta bandit over {b, c}
//!                 ├─ b: leaf bandit over {x, y}
//!                 └─ c: leaf bandit over {z}
//! ```
//!
//! The lifecycle is two calls:
//!
//! 1. [`BanditNode::evaluate`] samples each tier's posterior top-down and
//!    returns the path, e.g. `["a", "b", "x"]`.
//! 2. [`BanditNode::update`] replays that path and applies one outcome to
//!    every arm set on it.
//!
//! **Pieces:**
//! - [`build_skeleton`]: flat combinations → ordered nested [`Skeleton`].
//! - [`BanditNode::build`] / [`BanditNode::from_combinations`]: skeleton → tree,
//!   one policy per arm set from a [`PolicyFactory`].
//! - [`ArmSet`]: keys + policy; evaluate, update, overrides, [`ArmSet::top_arms`].
//! - [`BetaBandit`]: Beta–Bernoulli Thompson sampling (the default policy).
//! - [`Exp3Ix`]: an adversarial alternative behind the same [`ArmPolicy`] trait.
//! - [`build_override`] / [`PriorOverride`]: seed or reset specific arms'
//!   counts and priors without rebuilding.
//!
//! **Determinism:** policies are seeded. [`BetaFactory`] derives a distinct
//! seed per arm set from one base seed, so the same config and the same call
//! sequence give the same paths.
//!
//! **Non-goals:**
//! - No persistence. With feature `serde`, configs, overrides and snapshots
//!   derive `Serialize`/`Deserialize`; storing them is up to the caller.
//! - No internal locking. Wrap a tree in a `Mutex` to share it.
//! - [`BetaBandit`] models Bernoulli rewards only.
//!
//! # Example
//!
//! ```rust
//! use banditree::{build_override, BanditNode, BetaFactory, FieldUpdates, FieldValue};
//!
//! let mut tree = BanditNode::from_combinations(
//!     [["a", "b", "x"], ["a", "b", "y"], ["a", "c", "z"]],
//!     BetaFactory::with_seed(7),
//! )
//! .unwrap();
//!
//! // Seed arm "x" as a known good performer.
//! let fields = FieldUpdates::from([
//!     ("trials".to_string(), FieldValue::Count(10)),
//!     ("rewards".to_string(), FieldValue::Count(8)),
//! ]);
//! tree.override_prior(&build_override(&["a", "b", "x"], fields).unwrap())
//!     .unwrap();
//!
//! let path = tree.evaluate().unwrap();
//! assert_eq!(path.len(), 3);
//! assert_eq!(path[0], "a");
//! tree.update(&path, &true).unwrap();
//! ```

#![forbid(unsafe_code)]

mod error;
pub use error::{BanditError, Result};

pub mod sampler;

mod alloc;
pub use alloc::*;

mod stable_hash;
pub use stable_hash::*;

mod policy;
pub use policy::*;

mod thompson;
pub use thompson::*;

mod exp3ix;
pub use exp3ix::*;

mod arms;
pub use arms::*;

mod builder;
pub use builder::*;

mod tree;
pub use tree::*;

/// A root-to-leaf sequence of keys, one per tier.
pub type Path = Vec<String>;

pub const BANDITREE_VERSION: &str = env!("CARGO_PKG_VERSION");
