//! The hierarchical bandit: one arm set per internal node.
//!
//! A [`BanditNode`] owns an [`ArmSet`] over its child keys and, index-aligned
//! with those keys, one [`Child`] per key: either a nested node or a leaf arm
//! set. Nodes hold no parent links; traversal state lives in the path.
//!
//! ```text
//! let path = tree.evaluate()?;        // ["a", "b", "x"]
//! let ok = run(&path);                // your code decides success
//! tree.update(&path, &ok)?;           // same outcome for every tier on the path
//! ```
//!
//! `update` validates the whole path before writing anything, so a rejected
//! path leaves every arm set untouched.

use tracing::{debug, trace};

use crate::arms::ArmSet;
use crate::builder::{build_skeleton, PriorOverride, Skeleton};
use crate::error::{BanditError, Result};
use crate::policy::{ArmPolicy, PolicyFactory};
use crate::thompson::BetaBandit;

/// What a node key leads to.
#[derive(Debug, Clone)]
pub enum Child<P = BetaBandit> {
    /// Another tier of choices.
    Node(BanditNode<P>),
    /// The last tier: an arm set with no further nesting.
    Leaf(ArmSet<P>),
}

impl<P: ArmPolicy> Child<P> {
    /// The arm set choosing among this child's own keys.
    pub fn arm_set(&self) -> &ArmSet<P> {
        match self {
            Self::Node(node) => &node.arms,
            Self::Leaf(leaf) => leaf,
        }
    }

    fn arm_set_mut(&mut self) -> &mut ArmSet<P> {
        match self {
            Self::Node(node) => &mut node.arms,
            Self::Leaf(leaf) => leaf,
        }
    }

    pub fn as_node(&self) -> Option<&BanditNode<P>> {
        match self {
            Self::Node(node) => Some(node),
            Self::Leaf(_) => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }
}

/// One tier of the hierarchical bandit (the root is a node too).
#[derive(Debug, Clone)]
pub struct BanditNode<P = BetaBandit> {
    arms: ArmSet<P>,
    children: Vec<Child<P>>,
}

impl<P: ArmPolicy> BanditNode<P> {
    /// Compile a skeleton into a tree, one policy per arm set from `factory`.
    ///
    /// Arm sets are built parent first, children in key order. Duplicate leaf
    /// entries collapse to their first occurrence.
    pub fn build<F>(skeleton: &Skeleton, mut factory: F) -> Result<Self>
    where
        F: PolicyFactory<Policy = P>,
    {
        match skeleton {
            Skeleton::Branch(entries) => Self::compile(entries, &mut factory),
            Skeleton::Leaf(_) => Err(BanditError::InvalidSkeleton(
                "the root must be a mapping, not a leaf list".to_string(),
            )),
        }
    }

    /// [`build_skeleton`] followed by [`build`](Self::build).
    pub fn from_combinations<I, C, S, F>(combinations: I, factory: F) -> Result<Self>
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[S]>,
        S: AsRef<str>,
        F: PolicyFactory<Policy = P>,
    {
        Self::build(&build_skeleton(combinations)?, factory)
    }

    fn compile<F>(entries: &[(String, Skeleton)], factory: &mut F) -> Result<Self>
    where
        F: PolicyFactory<Policy = P>,
    {
        let keys = entries.iter().map(|(k, _)| k.clone()).collect();
        let arms = ArmSet::new(keys, factory)?;
        let mut children = Vec::with_capacity(entries.len());
        for (_, sub) in entries {
            let child = match sub {
                Skeleton::Branch(inner) => Child::Node(Self::compile(inner, factory)?),
                Skeleton::Leaf(leaf_keys) => {
                    let mut unique: Vec<String> = Vec::with_capacity(leaf_keys.len());
                    for k in leaf_keys {
                        if !unique.contains(k) {
                            unique.push(k.clone());
                        }
                    }
                    Child::Leaf(ArmSet::new(unique, factory)?)
                }
            };
            children.push(child);
        }
        Ok(Self { arms, children })
    }

    /// This node's own arm set (over its child keys).
    pub fn arms(&self) -> &ArmSet<P> {
        &self.arms
    }

    pub fn get(&self, key: &str) -> Option<&Child<P>> {
        self.arms.index_of(key).map(|i| &self.children[i])
    }

    /// `(key, child)` pairs in arm-index order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Child<P>)> {
        self.arms
            .keys()
            .iter()
            .map(String::as_str)
            .zip(self.children.iter())
    }

    /// Length of the longest complete path.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|c| match c {
                Child::Node(node) => node.depth(),
                Child::Leaf(_) => 1,
            })
            .max()
            .unwrap_or(0)
    }

    /// Every complete path, in key order.
    pub fn paths(&self) -> Vec<Vec<String>> {
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        self.collect_paths(&mut prefix, &mut out);
        out
    }

    fn collect_paths(&self, prefix: &mut Vec<String>, out: &mut Vec<Vec<String>>) {
        for (key, child) in self.children() {
            prefix.push(key.to_string());
            match child {
                Child::Node(node) => node.collect_paths(prefix, out),
                Child::Leaf(leaf) => {
                    for arm in leaf.keys() {
                        let mut path = prefix.clone();
                        path.push(arm.clone());
                        out.push(path);
                    }
                }
            }
            prefix.pop();
        }
    }

    /// Sample a complete path, root to leaf. Counts are not touched.
    pub fn evaluate(&mut self) -> Result<Vec<String>> {
        let mut path = Vec::new();
        self.descend(&mut path)?;
        trace!(path = ?path, "sampled path");
        Ok(path)
    }

    /// Sample the tiers below a fixed `prefix`.
    ///
    /// The prefix is checked key by key (`PathMismatch` at internal tiers,
    /// `UnknownArm` at the leaf tier). An empty prefix is [`evaluate`](Self::evaluate).
    pub fn evaluate_from<S: AsRef<str>>(&mut self, prefix: &[S]) -> Result<Vec<String>> {
        let mut path = Vec::new();
        self.resume(prefix, 0, &mut path)?;
        trace!(path = ?path, fixed = prefix.len(), "sampled path from prefix");
        Ok(path)
    }

    fn descend(&mut self, path: &mut Vec<String>) -> Result<()> {
        let idx = self.arms.evaluate_index()?;
        path.push(self.arms.keys()[idx].clone());
        match &mut self.children[idx] {
            Child::Node(node) => node.descend(path),
            Child::Leaf(leaf) => {
                path.push(leaf.evaluate()?.to_string());
                Ok(())
            }
        }
    }

    fn resume<S: AsRef<str>>(&mut self, prefix: &[S], depth: usize, path: &mut Vec<String>) -> Result<()> {
        let Some(head) = prefix.get(depth) else {
            return self.descend(path);
        };
        let idx = self.child_index(head.as_ref(), depth)?;
        path.push(head.as_ref().to_string());
        match &mut self.children[idx] {
            Child::Node(node) => node.resume(prefix, depth + 1, path),
            Child::Leaf(leaf) => match &prefix[depth + 1..] {
                [] => {
                    path.push(leaf.evaluate()?.to_string());
                    Ok(())
                }
                [arm] => {
                    leaf.resolve(arm.as_ref())?;
                    path.push(arm.as_ref().to_string());
                    Ok(())
                }
                _ => Err(BanditError::PathLength {
                    len: prefix.len(),
                    depth: depth + 2,
                }),
            },
        }
    }

    fn child_index(&self, key: &str, depth: usize) -> Result<usize> {
        self.arms
            .index_of(key)
            .ok_or_else(|| BanditError::PathMismatch {
                depth,
                key: key.to_string(),
            })
    }

    /// Apply `feedback` to every arm set on `path`, top-down.
    ///
    /// The path must be a complete path as returned by
    /// [`evaluate`](Self::evaluate). It is validated before any write.
    pub fn update<S: AsRef<str>>(&mut self, path: &[S], feedback: &P::Feedback) -> Result<()> {
        self.check_path(path, 0)?;
        self.apply_path(path, 0, feedback)?;
        debug!(depth = path.len(), "path updated");
        Ok(())
    }

    /// Check that `path` is a complete path of this tree.
    pub fn validate_path<S: AsRef<str>>(&self, path: &[S]) -> Result<()> {
        self.check_path(path, 0)
    }

    fn check_path<S: AsRef<str>>(&self, path: &[S], depth: usize) -> Result<()> {
        let Some(head) = path.get(depth) else {
            return Err(BanditError::PathLength {
                len: path.len(),
                depth,
            });
        };
        let idx = self.child_index(head.as_ref(), depth)?;
        match &self.children[idx] {
            Child::Node(node) => node.check_path(path, depth + 1),
            Child::Leaf(leaf) => {
                if path.len() != depth + 2 {
                    return Err(BanditError::PathLength {
                        len: path.len(),
                        depth: depth + 1,
                    });
                }
                leaf.resolve(path[depth + 1].as_ref()).map(|_| ())
            }
        }
    }

    fn apply_path<S: AsRef<str>>(&mut self, path: &[S], depth: usize, feedback: &P::Feedback) -> Result<()> {
        let key = path[depth].as_ref();
        let idx = self.child_index(key, depth)?;
        self.arms.update(key, feedback)?;
        match &mut self.children[idx] {
            Child::Node(node) => node.apply_path(path, depth + 1, feedback),
            Child::Leaf(leaf) => leaf.update(path[depth + 1].as_ref(), feedback),
        }
    }

    /// Apply one prior override. Validated in full before any write.
    pub fn override_prior(&mut self, request: &PriorOverride) -> Result<()> {
        self.check_override(request, 0)?;
        self.apply_override(request)
    }

    /// Apply overrides in order; each is validated before it is written, so
    /// a failure keeps the earlier ones and writes nothing of its own.
    pub fn override_priors(&mut self, requests: &[PriorOverride]) -> Result<()> {
        for request in requests {
            self.override_prior(request)?;
        }
        Ok(())
    }

    fn check_override(&self, request: &PriorOverride, depth: usize) -> Result<()> {
        self.arms.validate_override(&request.bandit)?;
        for (key, sub) in &request.children {
            let idx = self
                .arms
                .index_of(key)
                .ok_or_else(|| BanditError::UnknownPath {
                    depth,
                    key: key.clone(),
                })?;
            match &self.children[idx] {
                Child::Node(node) => node.check_override(sub, depth + 1)?,
                Child::Leaf(leaf) => {
                    if let Some(extra) = sub.children.keys().next() {
                        return Err(BanditError::UnknownPath {
                            depth: depth + 1,
                            key: extra.clone(),
                        });
                    }
                    leaf.validate_override(&sub.bandit)?;
                }
            }
        }
        Ok(())
    }

    fn apply_override(&mut self, request: &PriorOverride) -> Result<()> {
        if !request.bandit.is_empty() {
            self.arms.override_priors(&request.bandit)?;
        }
        for (key, sub) in &request.children {
            let idx = self.arms.resolve(key)?;
            match &mut self.children[idx] {
                Child::Node(node) => node.apply_override(sub)?,
                Child::Leaf(leaf) => leaf.override_priors(&sub.bandit)?,
            }
        }
        Ok(())
    }

    /// The arm set reached by following `prefix` (empty = this node's own).
    pub fn arm_set<S: AsRef<str>>(&self, prefix: &[S]) -> Result<&ArmSet<P>> {
        let mut node = self;
        for (depth, key) in prefix.iter().enumerate() {
            let idx = node.child_index(key.as_ref(), depth)?;
            match &node.children[idx] {
                Child::Node(next) => node = next,
                Child::Leaf(leaf) if depth + 1 == prefix.len() => return Ok(leaf),
                Child::Leaf(_) => {
                    return Err(BanditError::PathLength {
                        len: prefix.len(),
                        depth: depth + 1,
                    })
                }
            }
        }
        Ok(&node.arms)
    }

    /// Mutable form of [`arm_set`](Self::arm_set), e.g. to record a metric deep in the tree.
    pub fn arm_set_mut<S: AsRef<str>>(&mut self, prefix: &[S]) -> Result<&mut ArmSet<P>> {
        let Some((last, hops)) = prefix.split_last() else {
            return Ok(&mut self.arms);
        };
        let mut node = self;
        for (depth, key) in hops.iter().enumerate() {
            let idx = node.child_index(key.as_ref(), depth)?;
            node = match &mut node.children[idx] {
                Child::Node(next) => next,
                Child::Leaf(_) => {
                    return Err(BanditError::PathLength {
                        len: prefix.len(),
                        depth: depth + 1,
                    })
                }
            };
        }
        let idx = node.child_index(last.as_ref(), hops.len())?;
        Ok(node.children[idx].arm_set_mut())
    }

    /// Caller-recorded performance history of the root arm set.
    pub fn performance(&self) -> &[f64] {
        self.arms.performance()
    }

    pub fn record_metric(&mut self, value: f64) {
        self.arms.record_metric(value);
    }
}
