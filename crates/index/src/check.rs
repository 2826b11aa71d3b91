//! Read conflict checks against the version history
//!
//! A read range `[begin, end)` at snapshot `version` conflicts if any write
//! newer than `version` covers a key inside it. The check walks two cursors,
//! one per bound, down the index together until their paths diverge, then
//! closes the pyramid between them from both sides:
//!
//! ```text
//!            level l:  S ---------------------------> E -----> ...
//!                      |                              |
//!        start side:   S -> s1 -> s2 ...     ... e1 ->E -> e2   (end side)
//!                      |                              |
//!            level 0:  .. begin ..................... end ..
//! ```
//!
//! Spans whose aggregate is `<= version` are skipped whole; only spans whose
//! aggregate exceeds `version` are descended into. A check yields after each
//! horizontal step during the shared descent so `detect_conflicts` can keep
//! several checks in flight and hide memory latency.

use crate::cursor::Cursor;
use crate::index::VersionedIntervalIndex;
use resolver_core::types::Version;

/// One read conflict query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRange<'k> {
    /// Inclusive lower bound
    pub begin: &'k [u8],
    /// Exclusive upper bound
    pub end: &'k [u8],
    /// Snapshot the read was performed at
    pub version: Version,
    /// Slot in the status array to flag on conflict
    pub transaction: usize,
}

impl<'k> ReadRange<'k> {
    /// Create a read query
    pub fn new(begin: &'k [u8], end: &'k [u8], version: Version, transaction: usize) -> Self {
        ReadRange {
            begin,
            end,
            version,
            transaction,
        }
    }
}

/// In-flight state of one read check
#[derive(Debug, Clone, Copy)]
pub(crate) struct RangeCheck<'k> {
    start: Cursor<'k>,
    end: Cursor<'k>,
    version: Version,
    pub(crate) transaction: usize,
}

impl<'k> RangeCheck<'k> {
    pub(crate) fn new(range: &ReadRange<'k>) -> Self {
        RangeCheck {
            start: Cursor::new(range.begin),
            end: Cursor::new(range.end),
            version: range.version,
            transaction: range.transaction,
        }
    }

    /// Advance the check
    ///
    /// Returns `None` if the check yielded mid-descent, otherwise whether the
    /// range conflicts.
    pub(crate) fn step(&mut self, index: &VersionedIntervalIndex) -> Option<bool> {
        // An empty range covers no keys
        if self.start.target >= self.end.target {
            return Some(false);
        }

        loop {
            if !self.start.advance(index) {
                self.start.prefetch(index);
                return None;
            }
            self.end.x = self.start.x;
            self.end.descend_one_level(index);

            let level = self.start.level;
            let finger = self.start.path[level];
            if finger != self.end.path[level] {
                break;
            }
            // One span at this level covers the whole range
            if index.max_version(finger, level) <= self.version {
                return Some(false);
            }
            if level == 0 {
                return Some(true);
            }
        }

        Some(self.check_diverged(index))
    }

    /// Finish once the two cursors sit in different spans
    fn check_diverged(&mut self, index: &VersionedIntervalIndex) -> bool {
        let version = self.version;

        // End side: every span between the end cursor's finger and the end
        // key lies inside the range.
        let mut e = self.end.path[self.end.level];
        while index.max_version(e, self.end.level) > version {
            if self.end.is_complete() {
                return true;
            }
            self.end.descend_one_level(index);
            let f = self.end.path[self.end.level];
            while e != f {
                if index.max_version(e, self.end.level) > version {
                    return true;
                }
                e = index.successor(e, self.end.level);
            }
        }

        // Start side: spans strictly between the start finger and the end
        // side's node lie inside the range; the start finger's own span
        // straddles `begin`.
        let mut s = self.end.path[self.start.level];
        loop {
            let level = self.start.level;
            let finger = self.start.path[level];
            let next_s = index.successor(finger, level);

            let mut p = next_s;
            while p != s {
                if index.max_version(p, level) > version {
                    return true;
                }
                p = index.successor(p, level);
            }

            if index.max_version(finger, level) <= version {
                return false;
            }
            s = next_s;
            if self.start.is_complete() {
                // The finger's span ends exactly at `begin`
                return index.key(next_s) != self.start.target;
            }
            self.start.descend_one_level(index);
        }
    }
}
