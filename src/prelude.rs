//! Convenient imports for the resolver.
//!
//! ```
//! use conflict_resolver::prelude::*;
//!
//! let resolver = Resolver::new();
//! let outcome = resolver.resolve(&[ConflictTransaction::new(0).write("k", "l")], 1, 0)?;
//! assert_eq!(outcome.non_conflicting, vec![0]);
//! # Ok::<(), Error>(())
//! ```

// Main entry point
pub use crate::resolver::{Resolver, ResolverBuilder};

// Error handling
pub use crate::{Error, Result};

// Input and output types
pub use crate::{BatchOutcome, ConflictTransaction, Key, KeyRange, Version, INVALID_VERSION};

// Tuning
pub use crate::ResolverOptions;
