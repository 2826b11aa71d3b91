//! Resolver Integration Test Suite
//!
//! Exercises the resolver end to end: documented scenarios, retention/GC
//! behavior, the thread-safe facade, and randomized multi-batch histories
//! checked against a naive reference model.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run the whole suite
//! cargo test --test resolver
//!
//! # Run the model-based property tests only
//! cargo test --test resolver properties::
//! ```

use conflict_resolver::{
    resolve_batch, BatchOutcome, ConflictHistory, ConflictTransaction, KeyRange, ResolverOptions,
    Version,
};

// Test modules
pub mod facade;
pub mod gc;
pub mod properties;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Transaction reading `reads` and writing `writes` at `snapshot`
pub fn txn(
    snapshot: Version,
    reads: &[(&str, &str)],
    writes: &[(&str, &str)],
) -> ConflictTransaction {
    let mut tr = ConflictTransaction::new(snapshot);
    for &(b, e) in reads {
        tr = tr.read(b, e);
    }
    for &(b, e) in writes {
        tr = tr.write(b, e);
    }
    tr
}

/// Resolve with default options
pub fn resolve(
    history: &mut ConflictHistory,
    batch: &[ConflictTransaction],
    now: Version,
    new_oldest: Version,
) -> BatchOutcome {
    resolve_batch(history, batch, now, new_oldest, &ResolverOptions::default())
}

/// History boundaries as printable `(key, version)` pairs
pub fn boundaries(history: &ConflictHistory) -> Vec<(String, Version)> {
    history
        .index()
        .iter()
        .map(|(k, v)| (String::from_utf8_lossy(k).into_owned(), v))
        .collect()
}

// =============================================================================
// REFERENCE MODEL
// =============================================================================

/// Naive resolver: remembers every accepted write and scans them all
///
/// A read conflicts if the transaction is too old, if any remembered write
/// newer than its snapshot overlaps it, or if an earlier accepted
/// transaction of the same batch writes over it. Forgetting old writes
/// never changes an answer for a snapshot inside the retention window, so
/// the model keeps everything.
#[derive(Debug, Clone)]
pub struct Model {
    writes: Vec<(KeyRange, Version)>,
    base: Version,
    oldest: Version,
}

impl Model {
    /// Empty model whose whole key space starts at `base`
    pub fn new(base: Version) -> Self {
        Model {
            writes: Vec::new(),
            base,
            oldest: 0,
        }
    }

    fn read_conflicts(
        &self,
        read: &KeyRange,
        snapshot: Version,
        batch_writes: &[KeyRange],
    ) -> bool {
        if read.is_empty() {
            return false;
        }
        self.base > snapshot
            || self.writes.iter().any(|(w, v)| *v > snapshot && w.intersects(read))
            || batch_writes.iter().any(|w| w.intersects(read))
    }

    /// Returns `(non_conflicting, too_old)`
    pub fn resolve(
        &mut self,
        batch: &[ConflictTransaction],
        now: Version,
        new_oldest: Version,
    ) -> (Vec<usize>, Vec<usize>) {
        let mut non_conflicting = Vec::new();
        let mut too_old = Vec::new();
        let mut batch_writes: Vec<KeyRange> = Vec::new();

        for (t, tr) in batch.iter().enumerate() {
            if tr.has_reads() && tr.read_snapshot < self.oldest {
                too_old.push(t);
                continue;
            }
            let conflict = tr
                .read_ranges
                .iter()
                .any(|r| self.read_conflicts(r, tr.read_snapshot, &batch_writes));
            if !conflict {
                non_conflicting.push(t);
                batch_writes.extend(tr.write_ranges.iter().filter(|w| !w.is_empty()).cloned());
            }
        }

        self.writes.extend(batch_writes.into_iter().map(|w| (w, now)));
        self.oldest = self.oldest.max(new_oldest);
        (non_conflicting, too_old)
    }
}
