//! Error type shared by every bandit operation.
//!
//! All failures are caller errors (bad keys, malformed paths, unknown
//! override fields). Nothing here is transient, so nothing is retried.

use thiserror::Error;

/// Errors returned by arm sets, trees and the builders.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BanditError {
    /// An arm set was constructed with zero arms or with repeated keys.
    #[error("invalid arm set: {0}")]
    InvalidArmSet(String),

    /// A key is not in the arm set it was resolved against.
    #[error("unknown arm {arm:?}")]
    UnknownArm { arm: String },

    /// A path element names no child of the node at `depth`.
    #[error("path mismatch at depth {depth}: {key:?} is not a child")]
    PathMismatch { depth: usize, key: String },

    /// A path stops before a leaf arm, or runs past one.
    #[error("path of length {len} does not end at a leaf arm (diverges at depth {depth})")]
    PathLength { len: usize, depth: usize },

    /// A prior override names a child that does not exist.
    #[error("unknown override path {key:?} at depth {depth}")]
    UnknownPath { depth: usize, key: String },

    /// A prior override names a state field the policy does not have.
    #[error("unknown state field {field:?}")]
    UnknownField { field: String },

    /// A prior override value has the wrong kind or breaks an arm invariant.
    #[error("invalid value for field {field:?}: {reason}")]
    InvalidFieldValue { field: String, reason: String },

    /// Combinations or a skeleton cannot form a tree.
    #[error("invalid skeleton: {0}")]
    InvalidSkeleton(String),

    /// An operation that needs at least one key got none.
    #[error("empty path")]
    EmptyPath,
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, BanditError>;

impl BanditError {
    pub(crate) fn unknown_arm(arm: &str) -> Self {
        Self::UnknownArm {
            arm: arm.to_string(),
        }
    }

    pub(crate) fn unknown_field(field: &str) -> Self {
        Self::UnknownField {
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFieldValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
