//! Cursor (finger) into the versioned interval index
//!
//! A cursor records, for every level, the right-most node whose key is
//! strictly less than the target key. It starts above the top level at the
//! head and descends one level at a time; once it reaches level 0 it is
//! complete and can be used to locate, insert, or erase at the target.
//!
//! Cursors do not borrow the index. Every step takes the index explicitly,
//! which lets many cursors descend in an interleaved round-robin and lets a
//! completed cursor serve as a mutation hint.
//!
//! ```text
//! Level 2: HEAD ------------------> c -------------> NULL
//! Level 1: HEAD ------> b --------> c ------> e ---> NULL
//! Level 0: HEAD -> a -> b -> bb --> c -> d -> e ---> NULL
//!
//! cursor("cz"): path[2] = c, path[1] = c, path[0] = c, locate() = d
//! ```

use crate::arena::{NodeId, MAX_LEVELS};
use crate::index::VersionedIntervalIndex;

/// Per-level path to a target key
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'k> {
    /// Right-most node `< target` per level; valid for levels `>= level`
    pub(crate) path: [NodeId; MAX_LEVELS],
    /// Lowest level reached so far; `MAX_LEVELS` before the first step
    pub(crate) level: usize,
    /// Node the descent is currently at
    pub(crate) x: NodeId,
    /// Node known to be `>= target`, spares a key comparison
    pub(crate) already_checked: Option<NodeId>,
    pub(crate) target: &'k [u8],
}

impl<'k> Cursor<'k> {
    /// Fresh cursor positioned above the head
    pub(crate) fn new(target: &'k [u8]) -> Self {
        Cursor {
            path: [NodeId::HEAD; MAX_LEVELS],
            level: MAX_LEVELS,
            x: NodeId::HEAD,
            already_checked: None,
            target,
        }
    }

    /// Key this cursor descends toward
    pub fn target(&self) -> &'k [u8] {
        self.target
    }

    /// Lowest level reached so far
    pub fn level(&self) -> usize {
        self.level
    }

    /// Check if the cursor reached level 0
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.level == 0
    }

    /// Take one step: move right, or drop a level
    ///
    /// Returns true when the cursor moved down a level.
    #[inline]
    pub(crate) fn advance(&mut self, index: &VersionedIntervalIndex) -> bool {
        debug_assert!(!self.is_complete(), "advance on a complete cursor");
        let next = index.next(self.x, self.level - 1);
        match next {
            Some(n) if Some(n) != self.already_checked && index.key(n) < self.target => {
                self.x = n;
                false
            }
            _ => {
                self.already_checked = next;
                self.level -= 1;
                self.path[self.level] = self.x;
                true
            }
        }
    }

    /// Move down one level, first walking right while the next key is
    /// still below the target
    #[inline]
    pub fn descend_one_level(&mut self, index: &VersionedIntervalIndex) {
        while !self.advance(index) {}
    }

    /// Descend all the way to level 0
    pub fn complete(&mut self, index: &VersionedIntervalIndex) {
        while !self.is_complete() {
            self.descend_one_level(index);
        }
    }

    /// Level-0 successor: first node `>= target`, if any
    pub fn locate(&self, index: &VersionedIntervalIndex) -> Option<NodeId> {
        debug_assert!(self.is_complete());
        index.next(self.path[0], 0)
    }

    /// Node whose key equals the target exactly
    pub fn found(&self, index: &VersionedIntervalIndex) -> Option<NodeId> {
        self.locate(index).filter(|&n| index.key(n) == self.target)
    }

    /// Last node `< target`; the head when nothing precedes the target
    pub fn predecessor(&self) -> NodeId {
        debug_assert!(self.is_complete());
        self.path[0]
    }

    /// Key of the level-0 successor, empty when the cursor is at the tail
    pub fn successor_key<'i>(&self, index: &'i VersionedIntervalIndex) -> &'i [u8] {
        match self.locate(index) {
            Some(n) => index.key(n),
            None => &[],
        }
    }

    /// Pull the next candidate at the current level into cache
    #[inline]
    pub(crate) fn prefetch(&self, index: &VersionedIntervalIndex) {
        if let Some(next) = index.next(self.x, self.level - 1) {
            index.prefetch(next);
        }
    }
}
