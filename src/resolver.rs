//! Resolver entry point.
//!
//! This module provides the `Resolver` struct, which owns one epoch's
//! conflict history and serializes batches against it.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use resolver_concurrency::{resolve_batch, BatchOutcome, ConflictHistory};
use resolver_core::options::ResolverOptions;
use resolver_core::types::{ConflictTransaction, Version, INVALID_VERSION};
use tracing::{error, warn};

/// Conflict resolver for one epoch.
///
/// Batches are resolved one at a time under an internal lock, so a
/// `Resolver` can be shared across threads; each batch is fully checked and
/// merged before the next one starts.
///
/// # Example
///
/// ```
/// use conflict_resolver::prelude::*;
///
/// let resolver = Resolver::new();
///
/// let writer = ConflictTransaction::new(0).write("a", "z");
/// resolver.resolve(&[writer], 5, 0)?;
///
/// // Read at a snapshot before the write: must abort
/// let reader = ConflictTransaction::new(4).read("m", "n");
/// let outcome = resolver.resolve(&[reader], 6, 0)?;
/// assert!(outcome.non_conflicting.is_empty());
/// # Ok::<(), conflict_resolver::Error>(())
/// ```
pub struct Resolver {
    state: Mutex<State>,
    options: ResolverOptions,
}

struct State {
    history: ConflictHistory,
    /// Commit version of the last resolved batch
    last_commit: Version,
}

impl Resolver {
    /// Create a resolver with default options.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a resolver with explicit options.
    pub fn with_options(options: ResolverOptions) -> Self {
        Self::builder().options(options).build()
    }

    /// Create a builder for resolver configuration.
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    /// Options in effect.
    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolve one batch at commit version `now`.
    ///
    /// Transactions are judged in slice order. Accepted writes are recorded at
    /// `now`, and the retention bound advances to `new_oldest` when that is
    /// higher than the current one.
    ///
    /// # Errors
    ///
    /// With input validation on, a batch is rejected before it touches the
    /// history if `now` is below the previous batch's version, if
    /// `new_oldest` is above `now`, or if any range has `begin > end`.
    ///
    /// With `verify_history` on, a history that fails its self-check after
    /// the batch is merged yields [`Error::Internal`]. The batch has been
    /// applied by then and the resolver should be reset.
    pub fn resolve(
        &self,
        transactions: &[ConflictTransaction],
        now: Version,
        new_oldest: Version,
    ) -> Result<BatchOutcome> {
        let mut state = self.state.lock();
        if self.options.validate_input {
            if let Err(err) = validate(transactions, now, new_oldest, state.last_commit) {
                warn!(error = %err, now, transactions = transactions.len(), "Rejected batch");
                return Err(err);
            }
        }

        let outcome =
            resolve_batch(&mut state.history, transactions, now, new_oldest, &self.options);
        state.last_commit = now;

        if self.options.verify_history {
            if let Err(err) = state.history.index().verify() {
                error!(error = %err, now, "History failed self-check");
                return Err(err);
            }
        }
        Ok(outcome)
    }

    /// Drop all history and restart at `version`.
    ///
    /// Every key reads as written at `version` afterwards, and later batches
    /// must commit at or after it. The retention bound is unchanged.
    pub fn reset(&self, version: Version) {
        let mut state = self.state.lock();
        state.history.reset(version);
        state.last_commit = version;
    }

    /// Oldest version still judged reliably.
    pub fn oldest_version(&self) -> Version {
        self.state.lock().history.oldest_version()
    }

    /// Commit version of the last batch, or `INVALID_VERSION` before the first.
    pub fn last_commit_version(&self) -> Version {
        self.state.lock().last_commit
    }

    /// Number of boundaries the history holds.
    pub fn history_len(&self) -> usize {
        self.state.lock().history.len()
    }

    /// Last recorded write version covering `key`.
    pub fn version_at(&self, key: &[u8]) -> Version {
        self.state.lock().history.version_at(key)
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Resolver")
            .field("last_commit", &state.last_commit)
            .field("oldest_version", &state.history.oldest_version())
            .field("history_len", &state.history.len())
            .finish()
    }
}

fn validate(
    transactions: &[ConflictTransaction],
    now: Version,
    new_oldest: Version,
    previous: Version,
) -> Result<()> {
    if previous != INVALID_VERSION && now < previous {
        return Err(Error::VersionRegression { now, previous });
    }
    if new_oldest > now {
        return Err(Error::OldestAheadOfCommit { new_oldest, now });
    }
    for (transaction, tr) in transactions.iter().enumerate() {
        if let Some(range) = tr.first_malformed() {
            return Err(Error::InvalidRange {
                transaction,
                begin: range.begin.clone(),
                end: range.end.clone(),
            });
        }
    }
    Ok(())
}

/// Builder for resolver configuration.
///
/// # Example
///
/// ```
/// use conflict_resolver::ResolverBuilder;
///
/// let resolver = ResolverBuilder::new()
///     .seed(7)
///     .gc_budget(4, 20)
///     .initial_version(100)
///     .build();
/// assert_eq!(resolver.last_commit_version(), 100);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResolverBuilder {
    options: ResolverOptions,
    initial_version: Option<Version>,
}

impl ResolverBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all options at once.
    pub fn options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Seed the node-height generator.
    pub fn seed(mut self, seed: u64) -> Self {
        self.options.index.seed = seed;
        self
    }

    /// GC nodes visited per batch: `per_range` for each merged write range
    /// plus `base`.
    pub fn gc_budget(mut self, per_range: usize, base: usize) -> Self {
        self.options.gc_budget_per_range = per_range;
        self.options.gc_budget_base = base;
        self
    }

    /// Keys located per cursor batch when merging writes.
    pub fn merge_stripe_size(mut self, keys: usize) -> Self {
        self.options.merge_stripe_size = keys;
        self
    }

    /// Validate batches before resolving them.
    pub fn validate_input(mut self, validate: bool) -> Self {
        self.options.validate_input = validate;
        self
    }

    /// Self-check the history after every batch.
    pub fn verify_history(mut self, verify: bool) -> Self {
        self.options.verify_history = verify;
        self
    }

    /// Start the history at `version` instead of 0.
    ///
    /// Every key reads as written at `version`, and the first batch must
    /// commit at or after it.
    pub fn initial_version(mut self, version: Version) -> Self {
        self.initial_version = Some(version);
        self
    }

    /// Build the resolver.
    pub fn build(self) -> Resolver {
        let history = ConflictHistory::with_options(
            self.initial_version.unwrap_or(0),
            self.options.index.clone(),
        );
        Resolver {
            state: Mutex::new(State {
                history,
                last_commit: self.initial_version.unwrap_or(INVALID_VERSION),
            }),
            options: self.options,
        }
    }
}
