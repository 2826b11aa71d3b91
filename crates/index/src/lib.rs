//! Versioned interval index for conflict detection
//!
//! This crate implements the write history of a resolver:
//! - VersionedIntervalIndex: skip list over boundary keys with per-level
//!   max-version aggregates
//! - Cursor: per-level path to a key, usable as a query result and as an
//!   insertion/deletion hint
//! - NodeArena: size-classed slab handing out typed node handles
//! - ReadRange: read conflict query fed to `detect_conflicts`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arena;
pub mod check;
pub mod cursor;
pub mod index;

pub use arena::{NodeArena, NodeId, SizeClass, MAX_LEVELS};
pub use check::ReadRange;
pub use cursor::Cursor;
pub use index::VersionedIntervalIndex;
