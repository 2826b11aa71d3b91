//! Error types for the resolver
//!
//! The conflict-detection core is infallible: a conflict is a result, not an
//! error, and a corrupted index is a panic. The variants here describe
//! caller-contract violations that the facade can detect before handing a
//! batch to the core.

use crate::types::{Key, Version};
use thiserror::Error;

/// All resolver errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A conflict range with `begin > end`
    #[error("invalid range in transaction {transaction}: begin {begin} is after end {end}")]
    InvalidRange {
        /// Index of the transaction within the batch
        transaction: usize,
        /// Range begin
        begin: Key,
        /// Range end
        end: Key,
    },

    /// Commit version went backwards between batches
    #[error("commit version regressed: {now} is below previous batch version {previous}")]
    VersionRegression {
        /// Version supplied for this batch
        now: Version,
        /// Version of the previous batch
        previous: Version,
    },

    /// Requested oldest version lies above the batch's commit version
    #[error("oldest version {new_oldest} is ahead of commit version {now}")]
    OldestAheadOfCommit {
        /// Requested new oldest version
        new_oldest: Version,
        /// Commit version of the batch
        now: Version,
    },

    /// Internal error (bug or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for resolver operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if the caller broke the input contract
    ///
    /// Caller errors leave the history untouched; the batch can be fixed
    /// and resubmitted.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidRange { .. }
                | Error::VersionRegression { .. }
                | Error::OldestAheadOfCommit { .. }
        )
    }

    /// Check if this is a serious/unrecoverable error.
    pub fn is_serious(&self) -> bool {
        matches!(self, Error::Internal(_))
    }
}
