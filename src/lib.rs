//! # Conflict Resolver
//!
//! Batch conflict detection for optimistic transactions.
//!
//! Each transaction declares the key ranges it read (at a snapshot version)
//! and the key ranges it will write. A resolver keeps the recent write
//! history of its key space and, for every batch, decides which
//! transactions may commit: a transaction aborts if a write newer than its
//! snapshot touched anything it read, whether that write came from an
//! earlier batch or from an earlier transaction in the same batch.
//!
//! ## Quick Start
//!
//! ```
//! use conflict_resolver::prelude::*;
//!
//! let resolver = Resolver::new();
//! let batch = vec![
//!     ConflictTransaction::new(0).read("a", "c").write("a", "b"),
//!     ConflictTransaction::new(0).read("a", "b"),
//! ];
//! let outcome = resolver.resolve(&batch, 1, 0)?;
//! // The second read overlaps the first transaction's write
//! assert_eq!(outcome.non_conflicting, vec![0]);
//! # Ok::<(), conflict_resolver::Error>(())
//! ```
//!
//! ## Layers
//!
//! - [`Resolver`] - thread-safe facade with optional input validation
//! - [`ConflictHistory`] / [`resolve_batch`] - the single-threaded core
//! - [`VersionedIntervalIndex`] - the versioned skip list underneath

#![warn(missing_docs)]

mod resolver;

pub mod prelude;

pub use resolver::{Resolver, ResolverBuilder};

pub use resolver_concurrency::{
    resolve_batch, BatchOutcome, BatchStats, ConflictBatch, ConflictHistory,
};
pub use resolver_core::error::{self, Error, Result};
pub use resolver_core::options::{IndexOptions, ResolverOptions};
pub use resolver_core::types::{ConflictTransaction, Key, KeyRange, Version, INVALID_VERSION};
pub use resolver_index::{Cursor, ReadRange, VersionedIntervalIndex, MAX_LEVELS};
