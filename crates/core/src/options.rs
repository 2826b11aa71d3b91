//! Tuning options
//!
//! Options are plain structs with a `Default` plus named presets. There is
//! no file or environment parsing here; the embedding process decides.
//!
//! ## Usage
//!
//! ```
//! use resolver_core::options::ResolverOptions;
//!
//! let opts = ResolverOptions::deterministic(42);
//! assert_eq!(opts.index.seed, 42);
//! assert_eq!(opts.gc_budget(10), 40);
//! ```

/// Options for the versioned interval index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    /// Seed for the node-height generator
    pub seed: u64,
    /// Range checks interleaved by `detect_conflicts`
    pub max_inflight_checks: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        IndexOptions {
            seed: 0x5eed_0f_c0ff1c75,
            max_inflight_checks: 16,
        }
    }
}

/// Options for batch resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Index options
    pub index: IndexOptions,
    /// GC nodes visited per combined write range
    pub gc_budget_per_range: usize,
    /// GC nodes visited per batch regardless of writes
    pub gc_budget_base: usize,
    /// Keys located per cursor batch when merging writes (two per range)
    pub merge_stripe_size: usize,
    /// Partition size below which the point sort switches to comparisons
    pub radix_cutoff: usize,
    /// Whether the facade validates batches before resolving them
    pub validate_input: bool,
    /// Whether the facade self-checks the history after every batch
    pub verify_history: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        ResolverOptions {
            index: IndexOptions::default(),
            gc_budget_per_range: 3,
            gc_budget_base: 10,
            merge_stripe_size: 16,
            radix_cutoff: 10,
            validate_input: true,
            verify_history: false,
        }
    }
}

impl ResolverOptions {
    /// Validate every batch and self-check the history afterwards
    pub fn strict() -> Self {
        ResolverOptions {
            validate_input: true,
            verify_history: true,
            ..Default::default()
        }
    }

    /// Trust the caller; skip validation
    pub fn fast() -> Self {
        ResolverOptions {
            validate_input: false,
            ..Default::default()
        }
    }

    /// Default options with a fixed height seed
    pub fn deterministic(seed: u64) -> Self {
        ResolverOptions {
            index: IndexOptions {
                seed,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Nodes GC may visit after merging `combined_writes` ranges
    pub fn gc_budget(&self, combined_writes: usize) -> usize {
        combined_writes
            .saturating_mul(self.gc_budget_per_range)
            .saturating_add(self.gc_budget_base)
    }

    /// Stripe size rounded down to a whole number of ranges, at least one
    pub fn stripe_keys(&self) -> usize {
        (self.merge_stripe_size & !1).max(2)
    }
}
