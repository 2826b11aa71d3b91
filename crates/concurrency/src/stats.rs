//! Per-batch counters and phase timings

use std::time::Duration;

/// What one batch did and where its time went
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Transactions in the batch
    pub transactions: usize,
    /// Range boundaries sorted
    pub points: usize,
    /// Read ranges checked against the history
    pub read_ranges: usize,
    /// Disjoint write ranges merged into the history
    pub combined_write_ranges: usize,
    /// History boundaries dropped by incremental GC
    pub nodes_removed: usize,

    /// Point sort
    pub sort: Duration,
    /// Read check against the history
    pub check_reads: Duration,
    /// Intra-batch check
    pub check_batch: Duration,
    /// Write coalescing
    pub combine: Duration,
    /// History merge
    pub merge: Duration,
    /// Incremental GC
    pub remove_before: Duration,
}

impl BatchStats {
    /// Sum of all phase timings
    pub fn total(&self) -> Duration {
        self.sort
            + self.check_reads
            + self.check_batch
            + self.combine
            + self.merge
            + self.remove_before
    }

    /// Fold another batch's numbers into this one
    pub fn accumulate(&mut self, other: &BatchStats) {
        self.transactions += other.transactions;
        self.points += other.points;
        self.read_ranges += other.read_ranges;
        self.combined_write_ranges += other.combined_write_ranges;
        self.nodes_removed += other.nodes_removed;
        self.sort += other.sort;
        self.check_reads += other.check_reads;
        self.check_batch += other.check_batch;
        self.combine += other.combine;
        self.merge += other.merge;
        self.remove_before += other.remove_before;
    }
}
