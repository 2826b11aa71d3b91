//! Batch conflict resolution
//!
//! This crate turns the interval index into a transaction resolver:
//! - ConflictHistory: one epoch's write history, retention bound and GC cursor
//! - ConflictBatch: per-batch orchestration (too-old filter, point sort,
//!   history check, intra-batch check, write merge, incremental GC)
//! - BatchBitset: point-position bitset for the intra-batch check
//! - Point / sort_points: range boundaries linearized into one sorted sequence
//!
//! The resolver is single-threaded; callers serialize batches.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod bitset;
pub mod history;
pub mod points;
pub mod stats;

pub use batch::{resolve_batch, BatchOutcome, ConflictBatch};
pub use bitset::BatchBitset;
pub use history::ConflictHistory;
pub use points::{compare_points, sort_points, Point};
pub use stats::BatchStats;
