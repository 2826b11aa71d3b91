//! Core types for conflict detection
//!
//! This module defines the fundamental types used throughout the system:
//! - [`Version`]: Logical commit timestamp assigned by the caller
//! - [`Key`]: Immutable byte-string key with unsigned lexicographic order
//! - [`KeyRange`]: Half-open `[begin, end)` interval of keys
//! - [`ConflictTransaction`]: Read/write conflict ranges plus a snapshot

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical commit timestamp
///
/// Versions are handed out by the caller's sequencer and are monotonically
/// non-decreasing across batches. The resolver never allocates them.
pub type Version = i64;

/// Sentinel meaning "no write seen"
pub const INVALID_VERSION: Version = -1;

/// Byte-string key
///
/// Keys order by unsigned lexicographic byte comparison; a key that is a
/// strict prefix of another sorts first. The empty key is the smallest key
/// and is reserved for the index head.
///
/// # Examples
///
/// ```
/// use resolver_core::types::Key;
///
/// let a = Key::from("apple");
/// let b = Key::from("apples");
/// assert!(a < b);
/// assert!(Key::from(&b"\x01"[..]) > Key::from(""));
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Key(Vec<u8>);

impl Key {
    /// Create a key from raw bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Key(bytes.into())
    }

    /// Borrow the raw bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if this is the empty key
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the key and return its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key(s.as_bytes().to_vec())
    }
}

impl From<&[u8]> for Key {
    fn from(bytes: &[u8]) -> Self {
        Key(bytes.to_vec())
    }
}

impl From<Vec<u8>> for Key {
    fn from(bytes: Vec<u8>) -> Self {
        Key(bytes)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key(\"{}\")", self)
    }
}

/// Half-open key interval `[begin, end)`
///
/// The caller guarantees `begin <= end`. A range with `begin == end`
/// covers no keys.
///
/// # Examples
///
/// ```
/// use resolver_core::types::KeyRange;
///
/// let r = KeyRange::new("a", "c");
/// assert!(r.contains(b"b"));
/// assert!(!r.contains(b"c"));
/// assert!(r.intersects(&KeyRange::new("b", "z")));
/// assert!(!r.intersects(&KeyRange::new("c", "d")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyRange {
    /// Inclusive lower bound
    pub begin: Key,
    /// Exclusive upper bound
    pub end: Key,
}

impl KeyRange {
    /// Create a new range
    pub fn new(begin: impl Into<Key>, end: impl Into<Key>) -> Self {
        KeyRange {
            begin: begin.into(),
            end: end.into(),
        }
    }

    /// Range covering exactly one key: `[key, key\0)`
    pub fn single(key: impl Into<Key>) -> Self {
        let begin = key.into();
        let mut end = begin.as_bytes().to_vec();
        end.push(0);
        KeyRange {
            begin,
            end: Key(end),
        }
    }

    /// Check if the range covers no keys
    pub fn is_empty(&self) -> bool {
        self.begin >= self.end
    }

    /// Check if `begin <= end`
    pub fn is_well_formed(&self) -> bool {
        self.begin <= self.end
    }

    /// Check if a key falls inside the range
    pub fn contains(&self, key: &[u8]) -> bool {
        self.begin.as_bytes() <= key && key < self.end.as_bytes()
    }

    /// Check if two ranges share at least one key
    pub fn intersects(&self, other: &KeyRange) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.begin < other.end
            && other.begin < self.end
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.begin, self.end)
    }
}

/// One transaction as seen by the resolver
///
/// Only the conflict ranges and the snapshot matter here; the mutations
/// themselves travel elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictTransaction {
    /// Ranges the transaction read
    pub read_ranges: Vec<KeyRange>,
    /// Ranges the transaction intends to write
    pub write_ranges: Vec<KeyRange>,
    /// Version the reads were performed at
    pub read_snapshot: Version,
}

impl ConflictTransaction {
    /// Create an empty transaction reading at `read_snapshot`
    pub fn new(read_snapshot: Version) -> Self {
        ConflictTransaction {
            read_ranges: Vec::new(),
            write_ranges: Vec::new(),
            read_snapshot,
        }
    }

    /// Add a read conflict range
    pub fn read(mut self, begin: impl Into<Key>, end: impl Into<Key>) -> Self {
        self.read_ranges.push(KeyRange::new(begin, end));
        self
    }

    /// Add a write conflict range
    pub fn write(mut self, begin: impl Into<Key>, end: impl Into<Key>) -> Self {
        self.write_ranges.push(KeyRange::new(begin, end));
        self
    }

    /// Check if the transaction declared any read range
    pub fn has_reads(&self) -> bool {
        !self.read_ranges.is_empty()
    }

    /// First range with `begin > end`, if any
    pub fn first_malformed(&self) -> Option<&KeyRange> {
        self.read_ranges
            .iter()
            .chain(self.write_ranges.iter())
            .find(|r| !r.is_well_formed())
    }
}
