//! Pure construction helpers: skeletons from combinations, and prior overrides.

use std::collections::BTreeMap;

use crate::error::{BanditError, Result};
use crate::policy::FieldUpdates;

/// Key under which a [`PriorOverride`]'s own-arm-set updates appear in its
/// serialized form.
pub const OVERRIDE_BANDIT_KEY: &str = "bandit";

/// Ordered nested mapping describing a tree's shape.
///
/// Keys keep first-seen order; that order becomes arm-index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skeleton {
    /// Internal tier: child key → sub-skeleton.
    Branch(Vec<(String, Skeleton)>),
    /// Last tier: the leaf arm keys.
    Leaf(Vec<String>),
}

impl Skeleton {
    pub fn branch<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Skeleton)>,
    {
        Self::Branch(entries.into_iter().map(|(k, s)| (k.into(), s)).collect())
    }

    pub fn leaf<S, I>(keys: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        Self::Leaf(keys.into_iter().map(Into::into).collect())
    }

    /// Child skeleton under `key` (branches only).
    pub fn get(&self, key: &str) -> Option<&Skeleton> {
        match self {
            Self::Branch(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, s)| s),
            Self::Leaf(_) => None,
        }
    }
}

fn entry_or_insert<'a>(
    entries: &'a mut Vec<(String, Skeleton)>,
    key: &str,
    make: impl FnOnce() -> Skeleton,
) -> &'a mut Skeleton {
    let idx = match entries.iter().position(|(k, _)| k == key) {
        Some(i) => i,
        None => {
            entries.push((key.to_string(), make()));
            entries.len() - 1
        }
    };
    &mut entries[idx].1
}

/// Build a skeleton from multi-tier combinations.
///
/// For each combination, every element but the last two is a branch key, the
/// second-to-last names a leaf list, and the last is appended to it.
/// Shared prefixes merge; duplicate leaf entries are kept.
///
/// ```rust
/// use banditree::{build_skeleton, Skeleton};
///
/// let s = build_skeleton([["a", "b", "x"], ["a", "b", "y"], ["a", "c", "z"]]).unwrap();
/// assert_eq!(
///     s,
///     Skeleton::branch([(
///         "a",
///         Skeleton::branch([
///             ("b", Skeleton::leaf(["x", "y"])),
///             ("c", Skeleton::leaf(["z"])),
///         ]),
///     )])
/// );
/// ```
pub fn build_skeleton<I, C, S>(combinations: I) -> Result<Skeleton>
where
    I: IntoIterator<Item = C>,
    C: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut root: Vec<(String, Skeleton)> = Vec::new();
    for combo in combinations {
        let combo = combo.as_ref();
        let [prefix @ .., leaf_key, arm] = combo else {
            return Err(BanditError::InvalidSkeleton(format!(
                "combination of length {} needs at least two tiers",
                combo.len()
            )));
        };
        let mut level = &mut root;
        for tier in prefix {
            let tier = tier.as_ref();
            level = match entry_or_insert(level, tier, || Skeleton::Branch(Vec::new())) {
                Skeleton::Branch(next) => next,
                Skeleton::Leaf(_) => {
                    return Err(BanditError::InvalidSkeleton(format!(
                        "{tier:?} is used both as a leaf list and as a branch"
                    )))
                }
            };
        }
        let leaf_key = leaf_key.as_ref();
        match entry_or_insert(level, leaf_key, || Skeleton::Leaf(Vec::new())) {
            Skeleton::Leaf(arms) => arms.push(arm.as_ref().to_string()),
            Skeleton::Branch(_) => {
                return Err(BanditError::InvalidSkeleton(format!(
                    "{leaf_key:?} is used both as a branch and as a leaf list"
                )))
            }
        }
    }
    Ok(Skeleton::Branch(root))
}

/// Nested prior-override request mirroring the tree's shape.
///
/// `bandit` targets arms of the arm set at this level; `children` descends.
/// Serialized (feature `serde`) as `{"<child>": {...}, "bandit": {"<arm>": {"<field>": value}}}`,
/// with `bandit` under [`OVERRIDE_BANDIT_KEY`], so a child literally named
/// `"bandit"` cannot be expressed in that form.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PriorOverride {
    #[cfg_attr(
        feature = "serde",
        serde(default, rename = "bandit", skip_serializing_if = "BTreeMap::is_empty")
    )]
    pub bandit: BTreeMap<String, FieldUpdates>,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub children: BTreeMap<String, PriorOverride>,
}

impl PriorOverride {
    pub fn is_empty(&self) -> bool {
        self.bandit.is_empty() && self.children.values().all(PriorOverride::is_empty)
    }
}

/// Build an override targeting the arm at the end of `path`.
///
/// `["a", "b", "x"]` becomes `{a: {b: {bandit: {x: fields}}}}`: every element
/// but the last is a child hop, the last names an arm of the arm set reached.
pub fn build_override<S: AsRef<str>>(path: &[S], fields: FieldUpdates) -> Result<PriorOverride> {
    let Some((arm, hops)) = path.split_last() else {
        return Err(BanditError::EmptyPath);
    };
    let mut out = PriorOverride {
        bandit: BTreeMap::from([(arm.as_ref().to_string(), fields)]),
        children: BTreeMap::new(),
    };
    for hop in hops.iter().rev() {
        out = PriorOverride {
            bandit: BTreeMap::new(),
            children: BTreeMap::from([(hop.as_ref().to_string(), out)]),
        };
    }
    Ok(out)
}
