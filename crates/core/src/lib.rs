//! Core types for the conflict resolver
//!
//! This crate defines the vocabulary shared by every other crate:
//! - [`Version`]: logical commit timestamp
//! - [`Key`] / [`KeyRange`]: byte-string keys and half-open ranges
//! - [`ConflictTransaction`]: one transaction's declared conflict ranges
//! - [`Error`]: caller-contract violations detected at the facade
//! - [`ResolverOptions`] / [`IndexOptions`]: tuning knobs with presets

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod options;
pub mod types;

pub use error::{Error, Result};
pub use options::{IndexOptions, ResolverOptions};
pub use types::{ConflictTransaction, Key, KeyRange, Version, INVALID_VERSION};
