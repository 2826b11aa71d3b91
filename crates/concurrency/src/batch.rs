//! One resolver batch
//!
//! A batch borrows the history, collects transactions in arrival order, and
//! resolves them all in one call:
//!
//! ```text
//! add_transaction*  ->  too-old filter, points for every non-empty range
//! detect_conflicts  ->  sort points
//!                       check reads against the history
//!                       check reads against earlier accepted writes
//!                       coalesce accepted writes
//!                       merge them into the history at `now`
//!                       prune the history below `new_oldest`
//! ```
//!
//! Only read/write overlap is a conflict; two transactions writing the same
//! keys both commit. Within a batch the earlier transaction wins.

use crate::bitset::BatchBitset;
use crate::history::ConflictHistory;
use crate::points::{sort_points, Point};
use crate::stats::BatchStats;
use resolver_core::options::ResolverOptions;
use resolver_core::types::{ConflictTransaction, KeyRange, Version};
use resolver_index::ReadRange;
use smallvec::SmallVec;
use std::time::Instant;
use tracing::debug;

/// Result of resolving one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Transactions that may commit, ascending
    pub non_conflicting: Vec<usize>,
    /// Transactions whose snapshot predates the retained history, ascending
    ///
    /// These never commit; they are a subset of the conflicting ones.
    pub too_old: Vec<usize>,
    /// Counters and timings
    pub stats: BatchStats,
}

impl BatchOutcome {
    /// Check if transaction `t` may commit
    pub fn is_committed(&self, t: usize) -> bool {
        self.non_conflicting.binary_search(&t).is_ok()
    }

    /// Transactions that must abort, ascending
    pub fn conflicting(&self) -> Vec<usize> {
        let total = self.stats.transactions;
        let mut committed = self.non_conflicting.iter().peekable();
        (0..total)
            .filter(|t| {
                if committed.peek() == Some(&t) {
                    committed.next();
                    false
                } else {
                    true
                }
            })
            .collect()
    }
}

/// Range ids owned by one transaction; range `r` owns point slots `2r, 2r+1`
#[derive(Debug, Default)]
struct TransactionRanges {
    reads: SmallVec<[usize; 4]>,
    writes: SmallVec<[usize; 4]>,
    too_old: bool,
}

/// Transactions collected for one resolution call
pub struct ConflictBatch<'h, 't> {
    history: &'h mut ConflictHistory,
    options: &'h ResolverOptions,
    transactions: Vec<TransactionRanges>,
    points: Vec<Point<'t>>,
    read_ranges: Vec<ReadRange<'t>>,
}

impl<'h, 't> ConflictBatch<'h, 't> {
    /// Start a batch against `history`
    pub fn new(history: &'h mut ConflictHistory, options: &'h ResolverOptions) -> Self {
        ConflictBatch {
            history,
            options,
            transactions: Vec::new(),
            points: Vec::new(),
            read_ranges: Vec::new(),
        }
    }

    /// Transactions added so far
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Check if no transaction was added
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Add the next transaction in arrival order
    ///
    /// A transaction that read at a snapshot below the history's retention
    /// bound is marked too old; its ranges are not looked at. Empty ranges
    /// cover no keys and are dropped.
    pub fn add_transaction(&mut self, tr: &'t ConflictTransaction) {
        let t = self.transactions.len();
        let mut ranges = TransactionRanges {
            too_old: tr.has_reads() && tr.read_snapshot < self.history.oldest_version(),
            ..Default::default()
        };

        if !ranges.too_old {
            for range in tr.read_ranges.iter().filter(|r| !r.is_empty()) {
                ranges.reads.push(self.push_range(range, false, t));
                self.read_ranges.push(ReadRange::new(
                    range.begin.as_bytes(),
                    range.end.as_bytes(),
                    tr.read_snapshot,
                    t,
                ));
            }
            for range in tr.write_ranges.iter().filter(|r| !r.is_empty()) {
                ranges.writes.push(self.push_range(range, true, t));
            }
        }
        self.transactions.push(ranges);
    }

    fn push_range(&mut self, range: &'t KeyRange, write: bool, transaction: usize) -> usize {
        let id = self.points.len() / 2;
        for (key, begin) in [(&range.begin, true), (&range.end, false)] {
            self.points.push(Point {
                key: key.as_bytes(),
                begin,
                write,
                transaction,
                slot: self.points.len(),
            });
        }
        id
    }

    /// Resolve the batch at commit version `now`
    ///
    /// Accepted writes enter the history at `now`; afterwards the retention
    /// bound moves to `new_oldest` if that is higher, with a GC pass sized
    /// to the batch.
    pub fn detect_conflicts(mut self, now: Version, new_oldest: Version) -> BatchOutcome {
        let mut stats = BatchStats {
            transactions: self.transactions.len(),
            points: self.points.len(),
            read_ranges: self.read_ranges.len(),
            ..Default::default()
        };
        let mut conflict: Vec<bool> = self.transactions.iter().map(|t| t.too_old).collect();

        // Sorted position of every point, by slot
        let started = Instant::now();
        sort_points(&mut self.points, self.options.radix_cutoff);
        let mut position = vec![0usize; self.points.len()];
        for (i, point) in self.points.iter().enumerate() {
            position[point.slot] = i;
        }
        stats.sort = started.elapsed();

        let started = Instant::now();
        self.history.check_reads(&self.read_ranges, &mut conflict);
        stats.check_reads = started.elapsed();

        let started = Instant::now();
        self.check_intra_batch(&position, &mut conflict);
        stats.check_batch = started.elapsed();

        let started = Instant::now();
        let combined = self.combine_writes(&conflict);
        stats.combined_write_ranges = combined.len();
        stats.combine = started.elapsed();

        let started = Instant::now();
        self.history.merge_writes(&combined, now, self.options.stripe_keys());
        stats.merge = started.elapsed();

        let started = Instant::now();
        stats.nodes_removed = self
            .history
            .prune(new_oldest, self.options.gc_budget(combined.len()));
        stats.remove_before = started.elapsed();

        let mut outcome = BatchOutcome::default();
        for (t, ranges) in self.transactions.iter().enumerate() {
            if ranges.too_old {
                outcome.too_old.push(t);
            } else if !conflict[t] {
                outcome.non_conflicting.push(t);
            }
        }

        debug!(
            now,
            transactions = stats.transactions,
            points = stats.points,
            committed = outcome.non_conflicting.len(),
            too_old = outcome.too_old.len(),
            combined_writes = stats.combined_write_ranges,
            removed = stats.nodes_removed,
            history = self.history.len(),
            "Resolved batch"
        );
        outcome.stats = stats;
        outcome
    }

    /// Arrival-order pass: a read conflicts with any earlier accepted write
    /// whose point interval it overlaps
    fn check_intra_batch(&self, position: &[usize], conflict: &mut [bool]) {
        let mut written = BatchBitset::new(self.points.len());
        let span = |range: usize| (position[2 * range], position[2 * range + 1]);

        for (t, ranges) in self.transactions.iter().enumerate() {
            if conflict[t] {
                continue;
            }
            if ranges.reads.iter().any(|&r| {
                let (begin, end) = span(r);
                written.any(begin, end)
            }) {
                conflict[t] = true;
                continue;
            }
            for &w in &ranges.writes {
                let (begin, end) = span(w);
                written.set(begin, end);
            }
        }
    }

    /// Union of accepted write ranges as disjoint, non-abutting ranges
    fn combine_writes(&self, conflict: &[bool]) -> Vec<(&'t [u8], &'t [u8])> {
        let mut combined: Vec<(&'t [u8], &'t [u8])> = Vec::new();
        let mut active = 0usize;
        let mut open: &'t [u8] = &[];

        for point in &self.points {
            if !point.write || conflict[point.transaction] {
                continue;
            }
            if point.begin {
                if active == 0 {
                    open = match combined.last() {
                        // Ends sort before begins at one key, so an abutting
                        // range reopens the one just closed
                        Some(&(begin, end)) if end == point.key => {
                            combined.pop();
                            begin
                        }
                        _ => point.key,
                    };
                }
                active += 1;
            } else {
                active -= 1;
                if active == 0 {
                    combined.push((open, point.key));
                }
            }
        }
        debug_assert_eq!(active, 0, "unbalanced write points");
        combined
    }
}

/// Resolve `transactions` against `history` in one call
pub fn resolve_batch(
    history: &mut ConflictHistory,
    transactions: &[ConflictTransaction],
    now: Version,
    new_oldest: Version,
    options: &ResolverOptions,
) -> BatchOutcome {
    let mut batch = ConflictBatch::new(history, options);
    for tr in transactions {
        batch.add_transaction(tr);
    }
    batch.detect_conflicts(now, new_oldest)
}
