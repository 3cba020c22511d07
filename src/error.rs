// src/error.rs

//! Error taxonomy for rasterstyle construction and mutation.
//!
//! Every fallible operation in the crate returns [`Result`]. Nothing is
//! retried: graph edits are deterministic, so a failure is reported upward
//! and any partially built rasterstyle is dropped before the error escapes.

use log::warn;
use thiserror::Error;

/// Errors reported by the rasterstyle subsystem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RasterStyleError {
    /// An allocation could not be satisfied.
    #[error("out of memory while {0}")]
    Allocation(&'static str),
    /// Invalid or contradictory setup fields.
    #[error("configuration error: {constraint}")]
    Config { constraint: String },
    /// A configuration value is outside its permitted range.
    #[error("range error in {field}: {reason}")]
    Range { field: &'static str, reason: String },
    /// A configuration value has the wrong shape.
    #[error("type error in {field}: expected {expected}")]
    Type {
        field: &'static str,
        expected: &'static str,
    },
    /// The rasterstyle id space is exhausted.
    #[error("rasterstyle limit reached: {0}")]
    Limit(&'static str),
    /// An internal invariant does not hold.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl RasterStyleError {
    /// Shorthand for a [`RasterStyleError::Config`] naming the offending constraint.
    pub fn config(constraint: impl Into<String>) -> Self {
        RasterStyleError::Config {
            constraint: constraint.into(),
        }
    }

    /// Shorthand for a [`RasterStyleError::Range`].
    pub fn range(field: &'static str, reason: impl Into<String>) -> Self {
        RasterStyleError::Range {
            field,
            reason: reason.into(),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RasterStyleError>;

/// Checks an internal invariant.
///
/// Debug builds abort on a violation. Release builds log the violation and
/// return `false` so the caller can degrade to "unknown"/"none" instead of
/// corrupting the tree.
#[track_caller]
pub(crate) fn check_invariant(holds: bool, what: &str) -> bool {
    if !holds {
        if cfg!(debug_assertions) {
            panic!("rasterstyle invariant violated: {}", what);
        }
        warn!("rasterstyle invariant violated (degrading): {}", what);
    }
    holds
}

/// Reserves room for `additional` more elements, mapping failure to
/// [`RasterStyleError::Allocation`].
pub(crate) fn try_reserve<T>(v: &mut Vec<T>, additional: usize, what: &'static str) -> Result<()> {
    v.try_reserve(additional)
        .map_err(|_| RasterStyleError::Allocation(what))
}
