//! Conflict history of one resolver epoch
//!
//! Wraps the interval index with the retention bound (`oldest_version`) and
//! the key incremental GC resumes from. Created once per epoch, replaced
//! wholesale by [`ConflictHistory::reset`].

use resolver_core::options::IndexOptions;
use resolver_core::types::Version;
use resolver_index::{ReadRange, VersionedIntervalIndex};
use tracing::{info, trace};

/// Write history plus retention state
#[derive(Debug)]
pub struct ConflictHistory {
    index: VersionedIntervalIndex,
    /// Writes older than this may be forgotten
    oldest_version: Version,
    /// GC resumes at the first boundary `>=` this key; empty means the start
    removal_key: Vec<u8>,
    options: IndexOptions,
}

impl ConflictHistory {
    /// Empty history at version 0
    pub fn new() -> Self {
        Self::with_options(0, IndexOptions::default())
    }

    /// Empty history whose whole key space starts at `base_version`
    pub fn with_options(base_version: Version, options: IndexOptions) -> Self {
        ConflictHistory {
            index: VersionedIntervalIndex::with_options(base_version, options.clone()),
            oldest_version: 0,
            removal_key: Vec::new(),
            options,
        }
    }

    /// Drop every write and start over at `version`
    ///
    /// The retention bound is kept; only the index and GC position reset.
    pub fn reset(&mut self, version: Version) {
        info!(version, dropped = self.index.len(), "Resetting conflict history");
        self.index = VersionedIntervalIndex::with_options(version, self.options.clone());
        self.removal_key.clear();
    }

    /// Oldest version still judged reliably
    pub fn oldest_version(&self) -> Version {
        self.oldest_version
    }

    /// Boundaries currently held
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if no boundary is held
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The underlying index
    pub fn index(&self) -> &VersionedIntervalIndex {
        &self.index
    }

    /// Key the next GC pass resumes from
    pub fn removal_key(&self) -> &[u8] {
        &self.removal_key
    }

    /// Last write version covering `key`
    pub fn version_at(&self, key: &[u8]) -> Version {
        self.index.version_at(key)
    }

    /// Flag transactions whose reads saw a newer committed write
    pub fn check_reads(&self, ranges: &[ReadRange<'_>], status: &mut [bool]) {
        self.index.detect_conflicts(ranges, status);
    }

    /// Record disjoint ascending write ranges at `now`
    ///
    /// Cursors are built `stripe_keys` keys at a time, last stripe first, so
    /// each stripe's cursors are taken after everything right of it has
    /// been applied.
    pub fn merge_writes(&mut self, ranges: &[(&[u8], &[u8])], now: Version, stripe_keys: usize) {
        debug_assert!(stripe_keys >= 2 && stripe_keys % 2 == 0, "stripe must hold whole ranges");
        let keys: Vec<&[u8]> = ranges.iter().flat_map(|&(begin, end)| [begin, end]).collect();
        for stripe in keys.chunks(stripe_keys).rev() {
            let cursors = self.index.find(stripe);
            self.index.add_write_ranges(&cursors, now);
        }
    }

    /// Raise the retention bound and forget up to `budget` old boundaries
    ///
    /// Does nothing unless `new_oldest` is above the current bound. Returns
    /// the number of boundaries removed.
    pub fn prune(&mut self, new_oldest: Version, budget: usize) -> usize {
        if new_oldest <= self.oldest_version {
            return 0;
        }
        self.oldest_version = new_oldest;

        let start = std::mem::take(&mut self.removal_key);
        let mut cursor = self.index.cursor(&start);
        let removed = self.index.remove_before(new_oldest, &mut cursor, budget);
        self.removal_key = cursor.successor_key(&self.index).to_vec();

        trace!(
            oldest = new_oldest,
            budget,
            removed,
            resume_len = self.removal_key.len(),
            remaining = self.index.len(),
            "Pruned conflict history"
        );
        removed
    }
}

impl Default for ConflictHistory {
    fn default() -> Self {
        Self::new()
    }
}
