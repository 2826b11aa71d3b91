//! Versioned interval index
//!
//! A skip list over boundary keys. Each boundary carries the version of the
//! last write covering `[key, next_key)`, and every level above 0 caches the
//! maximum version over the span it skips, so conflict queries can dismiss
//! whole sub-spans without visiting them.
//!
//! # Invariants
//!
//! - Level-0 keys are strictly increasing; the head (empty key) is first and
//!   has height `MAX_LEVELS`.
//! - `max_version[L]` at node X is the max of `max_version[L-1]` over X and
//!   every level-(L-1) node before X's level-L successor.
//! - Versions written are non-decreasing across calls; the incremental
//!   aggregate maintenance relies on it.
//!
//! # Operations
//!
//! - `find(keys)`: batched cursor descent sharing the top of the path
//! - `insert_at(cursor, version)`: O(height) expected insertion
//! - `erase_range(begin, end)`: drop every boundary in `[begin, end)`
//!   without losing the version in effect at `end`
//! - `add_write_ranges(cursors, version)`: the batch merge primitive
//! - `detect_conflicts(ranges, status)`: interleaved read checks
//! - `remove_before(oldest, cursor, budget)`: bounded incremental GC

use crate::arena::{Node, NodeArena, NodeId, MAX_LEVELS};
use crate::check::{RangeCheck, ReadRange};
use crate::cursor::Cursor;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use resolver_core::error::{Error, Result};
use resolver_core::options::IndexOptions;
use resolver_core::types::{Version, INVALID_VERSION};
use std::iter;

/// Skip list of write boundaries with max-version aggregates
#[derive(Debug)]
pub struct VersionedIntervalIndex {
    arena: NodeArena,
    /// Boundaries excluding the head
    len: usize,
    rng: SmallRng,
    options: IndexOptions,
}

impl VersionedIntervalIndex {
    /// Create an index whose whole key space starts at `base_version`
    pub fn new(base_version: Version) -> Self {
        Self::with_options(base_version, IndexOptions::default())
    }

    /// Create an index with explicit options
    pub fn with_options(base_version: Version, options: IndexOptions) -> Self {
        let mut arena = NodeArena::new();
        let head = arena.alloc(&[], MAX_LEVELS);
        debug_assert_eq!(head, NodeId::HEAD);
        for level in arena[head].levels.iter_mut() {
            level.max_version = base_version;
        }
        VersionedIntervalIndex {
            arena,
            len: 0,
            rng: SmallRng::seed_from_u64(options.seed),
            options,
        }
    }

    /// Number of boundaries, head excluded
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if no boundary was ever kept
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Options in effect
    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// Node storage, for allocation statistics
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    // ========================================================================
    // Node access
    // ========================================================================

    #[inline]
    fn node(&self, id: NodeId) -> &Node {
        &self.arena[id]
    }

    /// Boundary key of a node
    #[inline]
    pub fn key(&self, id: NodeId) -> &[u8] {
        &self.node(id).key
    }

    /// Version of the last write at a node's boundary
    #[inline]
    pub fn version(&self, id: NodeId) -> Version {
        self.max_version(id, 0)
    }

    #[inline]
    pub(crate) fn next(&self, id: NodeId, level: usize) -> Option<NodeId> {
        self.node(id).levels[level].next
    }

    /// Forward link that the structure guarantees exists
    #[inline]
    pub(crate) fn successor(&self, id: NodeId, level: usize) -> NodeId {
        match self.next(id, level) {
            Some(next) => next,
            None => panic!(
                "index corrupted: node {:?} has no successor at level {}",
                id, level
            ),
        }
    }

    #[inline]
    pub(crate) fn max_version(&self, id: NodeId, level: usize) -> Version {
        self.node(id).levels[level].max_version
    }

    #[inline]
    fn set_next(&mut self, id: NodeId, level: usize, next: Option<NodeId>) {
        self.arena[id].levels[level].next = next;
    }

    #[inline]
    fn set_max_version(&mut self, id: NodeId, level: usize, version: Version) {
        self.arena[id].levels[level].max_version = version;
    }

    #[inline]
    fn height(&self, id: NodeId) -> usize {
        self.node(id).height()
    }

    #[inline]
    pub(crate) fn prefetch(&self, id: NodeId) {
        self.arena.prefetch(id);
    }

    /// Geometric height: each extra level with probability 1/2
    fn random_height(&mut self) -> usize {
        let bits = self.rng.next_u32() >> (32 - (MAX_LEVELS - 1));
        bits.trailing_ones() as usize + 1
    }

    /// Recompute `max_version[level]` of `id` from the level below
    ///
    /// Requires every level-(level-1) node in the span to be correct.
    fn calc_version_for_level(&mut self, id: NodeId, level: usize) {
        let end = self.next(id, level);
        let mut version = self.max_version(id, level - 1);
        let mut x = self.next(id, level - 1);
        while let Some(node) = x {
            if Some(node) == end {
                break;
            }
            version = version.max(self.max_version(node, level - 1));
            x = self.next(node, level - 1);
        }
        self.set_max_version(id, level, version);
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Fully descended cursor for one key
    pub fn cursor<'k>(&self, key: &'k [u8]) -> Cursor<'k> {
        let mut cursor = Cursor::new(key);
        cursor.complete(self);
        cursor
    }

    /// Fully descended cursors for ascending `keys`
    ///
    /// The first cursor descends alone until the keys stop sharing a path;
    /// the rest start from that level and all of them finish interleaved.
    ///
    /// # Panics
    ///
    /// Debug builds panic if `keys` is not sorted.
    pub fn find<'k>(&self, keys: &[&'k [u8]]) -> Vec<Cursor<'k>> {
        debug_assert!(keys.windows(2).all(|w| w[0] <= w[1]), "find keys unsorted");
        let mut results = Vec::with_capacity(keys.len());
        let (&first, rest) = match keys.split_first() {
            Some(split) => split,
            None => return results,
        };
        let last = keys[keys.len() - 1];

        let mut lead = Cursor::new(first);
        while lead.level > 1 {
            lead.descend_one_level(self);
            if let Some(checked) = lead.already_checked {
                if self.key(checked) < last {
                    break;
                }
            }
        }

        let start_level = lead.level + 1;
        let x = if start_level < MAX_LEVELS {
            lead.path[start_level]
        } else {
            NodeId::HEAD
        };
        results.push(lead);
        for &key in rest {
            let mut cursor = Cursor::new(key);
            cursor.level = start_level;
            cursor.x = x;
            cursor.path[start_level..].copy_from_slice(&lead.path[start_level..]);
            results.push(cursor);
        }

        let count = results.len();
        let mut next_job: Vec<usize> = (1..count).chain(iter::once(0)).collect();
        let mut prev = count - 1;
        let mut job = 0;
        loop {
            let cursor = &mut results[job];
            cursor.advance(self);
            if cursor.is_complete() {
                if prev == job {
                    break;
                }
                next_job[prev] = next_job[job];
            } else {
                cursor.prefetch(self);
                prev = job;
            }
            job = next_job[job];
        }
        results
    }

    /// Version of the last write covering `key`
    pub fn version_at(&self, key: &[u8]) -> Version {
        let cursor = self.cursor(key);
        match cursor.found(self) {
            Some(node) => self.version(node),
            None => self.version(cursor.predecessor()),
        }
    }

    /// Highest write version covering any key in `[begin, end)`
    ///
    /// Walks level 0; meant for diagnostics and tests, not the hot path.
    /// Returns `INVALID_VERSION` for an empty range.
    pub fn max_version_in(&self, begin: &[u8], end: &[u8]) -> Version {
        if begin >= end {
            return INVALID_VERSION;
        }
        let cursor = self.cursor(begin);
        let mut node = cursor.found(self).unwrap_or_else(|| cursor.predecessor());
        let mut version = self.version(node);
        while let Some(next) = self.next(node, 0) {
            if self.key(next) >= end {
                break;
            }
            version = version.max(self.version(next));
            node = next;
        }
        version
    }

    /// Boundaries in key order as `(key, version)`
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            index: self,
            next: self.next(NodeId::HEAD, 0),
        }
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Insert a boundary at a complete cursor's target
    ///
    /// The cursor stays valid for any key `<=` its target afterwards.
    /// Aggregates at levels above the new node are only raised, and the
    /// walk stops at the first level that already covers `version`.
    pub fn insert_at(&mut self, cursor: &Cursor<'_>, version: Version) -> NodeId {
        debug_assert!(cursor.is_complete(), "insert_at needs a complete cursor");
        if cursor.target.is_empty() {
            // The head is the empty key's boundary
            self.set_max_version(NodeId::HEAD, 0, version);
            for level in 1..MAX_LEVELS {
                self.calc_version_for_level(NodeId::HEAD, level);
            }
            return NodeId::HEAD;
        }

        let height = self.random_height();
        let node = self.arena.alloc(cursor.target, height);
        self.set_max_version(node, 0, version);

        for level in 0..height {
            let finger = cursor.path[level];
            let next = self.next(finger, level);
            self.set_next(node, level, next);
            self.set_next(finger, level, Some(node));
        }
        for level in 1..height {
            self.calc_version_for_level(cursor.path[level], level);
            self.calc_version_for_level(node, level);
        }
        for level in height..MAX_LEVELS {
            let finger = cursor.path[level];
            if self.max_version(finger, level) >= version {
                break;
            }
            self.set_max_version(finger, level, version);
        }

        self.len += 1;
        node
    }

    /// Make sure a boundary exists at `end`'s target
    ///
    /// A missing boundary is materialized with the version in effect just
    /// before it, so erasing the span to its left cannot change what the
    /// index reports from `end` onward.
    fn ensure_boundary(&mut self, end: &Cursor<'_>) {
        if end.found(self).is_none() {
            let carried = self.version(end.predecessor());
            self.insert_at(end, carried);
        }
    }

    /// Unlink and free every node in `[begin, end)`
    ///
    /// Leaves aggregates of `begin`'s fingers as upper bounds.
    fn unlink_span(&mut self, begin: &Cursor<'_>, end: &Cursor<'_>) {
        if begin.path[0] == end.path[0] {
            return;
        }
        let first = self.successor(begin.path[0], 0);
        let last = end.path[0];

        for level in 0..MAX_LEVELS {
            if begin.path[level] != end.path[level] {
                let after = self.next(end.path[level], level);
                self.set_next(begin.path[level], level, after);
            }
        }

        let mut x = Some(first);
        while let Some(node) = x {
            x = self.next(node, 0);
            self.arena.release(node);
            self.len -= 1;
            if node == last {
                return;
            }
        }
        debug_assert!(false, "erase walked off the tail before {:?}", last);
    }

    /// Erase every boundary in `[begin, end)`
    ///
    /// Keys in the range fall back to the version in effect just before
    /// `begin`; keys from `end` on are unaffected. Both cursors must be
    /// complete and `begin`'s target must not exceed `end`'s.
    pub fn erase_range(&mut self, begin: &Cursor<'_>, end: &Cursor<'_>) {
        if begin.target >= end.target {
            return;
        }
        self.ensure_boundary(end);
        self.unlink_span(begin, end);
        for level in 1..MAX_LEVELS {
            self.calc_version_for_level(begin.path[level], level);
        }
    }

    /// Record writes over consecutive `(begin, end)` cursor pairs
    ///
    /// Pairs must be ascending and non-overlapping; they are applied right
    /// to left so cursors of the pairs not yet applied stay valid. Each
    /// range keeps its end boundary, loses its interior, and gets a fresh
    /// begin boundary at `version`.
    pub fn add_write_ranges(&mut self, cursors: &[Cursor<'_>], version: Version) {
        debug_assert!(cursors.len() % 2 == 0, "cursor pairs expected");
        for pair in cursors.chunks_exact(2).rev() {
            let (begin, end) = (&pair[0], &pair[1]);
            // Empty ranges write nothing
            if begin.target >= end.target {
                continue;
            }
            self.ensure_boundary(end);
            self.unlink_span(begin, end);
            self.insert_at(begin, version);
        }
    }

    /// Record one write range
    pub fn add_write_range(&mut self, begin: &[u8], end: &[u8], version: Version) {
        if begin >= end {
            return;
        }
        let cursors = self.find(&[begin, end]);
        self.add_write_ranges(&cursors, version);
    }

    // ========================================================================
    // Conflict detection
    // ========================================================================

    /// Flag `status[range.transaction]` for every range that saw a newer write
    ///
    /// Up to `max_inflight_checks` ranges are checked at once, round-robin,
    /// each yielding after every horizontal step of its descent. Flags are
    /// only ever set, never cleared.
    pub fn detect_conflicts(&self, ranges: &[ReadRange<'_>], status: &mut [bool]) {
        if ranges.is_empty() {
            return;
        }
        let inflight = self.options.max_inflight_checks.clamp(1, ranges.len());
        let mut jobs: Vec<RangeCheck<'_>> =
            ranges[..inflight].iter().map(RangeCheck::new).collect();
        let mut next_job: Vec<usize> = (1..inflight).chain(iter::once(0)).collect();
        let mut started = inflight;
        let mut prev = inflight - 1;
        let mut job = 0;

        loop {
            if let Some(conflict) = jobs[job].step(self) {
                if conflict {
                    status[jobs[job].transaction] = true;
                }
                if started == ranges.len() {
                    if prev == job {
                        break;
                    }
                    next_job[prev] = next_job[job];
                    job = prev;
                } else {
                    jobs[job] = RangeCheck::new(&ranges[started]);
                    started += 1;
                }
            }
            prev = job;
            job = next_job[job];
        }
    }

    // ========================================================================
    // Garbage collection
    // ========================================================================

    /// Forget boundaries whose writes are older than `oldest`
    ///
    /// Visits at most `max_nodes` nodes after the cursor's position. A node
    /// is dropped when both it and the node before it are older than
    /// `oldest`; its span merges into the predecessor, which is equally
    /// invisible to any read at `oldest` or later. The cursor is left on the
    /// last kept node so the next call resumes from there.
    ///
    /// Returns the number of nodes removed.
    pub fn remove_before(
        &mut self,
        oldest: Version,
        cursor: &mut Cursor<'_>,
        max_nodes: usize,
    ) -> usize {
        debug_assert!(cursor.is_complete(), "remove_before needs a complete cursor");
        let mut removed = 0;
        let mut was_above = true;

        for _ in 0..max_nodes {
            let x = match self.next(cursor.path[0], 0) {
                Some(x) => x,
                None => break,
            };
            if let Some(next) = self.next(x, 0) {
                self.prefetch(next);
            }

            let is_above = self.version(x) >= oldest;
            let height = self.height(x);
            if is_above || was_above {
                for level in 0..height {
                    cursor.path[level] = x;
                }
            } else {
                for level in 0..height {
                    let after = self.next(x, level);
                    self.set_next(cursor.path[level], level, after);
                }
                for level in 1..height {
                    let finger = cursor.path[level];
                    let merged = self.max_version(finger, level).max(self.max_version(x, level));
                    self.set_max_version(finger, level, merged);
                }
                self.arena.release(x);
                self.len -= 1;
                removed += 1;
            }
            was_above = is_above;
        }
        removed
    }

    // ========================================================================
    // Self-check
    // ========================================================================

    /// Verify the structural invariants
    ///
    /// Returns `Error::Internal` describing the first violated invariant:
    /// unsorted level 0, a level that is not a sublist of the one below, a
    /// bad node height, a length mismatch, or an aggregate below the true
    /// maximum of its span.
    pub fn verify(&self) -> Result<()> {
        if self.height(NodeId::HEAD) != MAX_LEVELS {
            return Err(corrupt(format!("head height is {}", self.height(NodeId::HEAD))));
        }

        let mut count = 0;
        let mut prev = NodeId::HEAD;
        while let Some(node) = self.next(prev, 0) {
            if self.key(prev) >= self.key(node) {
                return Err(corrupt(format!("level 0 out of order at {:?}", node)));
            }
            let height = self.height(node);
            if !(1..=MAX_LEVELS).contains(&height) {
                return Err(corrupt(format!("bad height {} at {:?}", height, node)));
            }
            count += 1;
            prev = node;
        }
        if count != self.len {
            return Err(corrupt(format!(
                "len is {} but level 0 holds {}",
                self.len, count
            )));
        }

        for level in 1..MAX_LEVELS {
            // Every level-L link must be reachable along level L-1
            let mut upper = NodeId::HEAD;
            loop {
                let target = self.next(upper, level);
                let mut exact = self.max_version(upper, level - 1);
                let mut lower = self.next(upper, level - 1);
                while lower != target {
                    let node = lower.ok_or_else(|| {
                        corrupt(format!(
                            "level {} link from {:?} not reachable on level {}",
                            level,
                            upper,
                            level - 1
                        ))
                    })?;
                    exact = exact.max(self.max_version(node, level - 1));
                    lower = self.next(node, level - 1);
                }
                if self.max_version(upper, level) < exact {
                    return Err(corrupt(format!(
                        "aggregate at {:?} level {} is {} but span max is {}",
                        upper,
                        level,
                        self.max_version(upper, level),
                        exact
                    )));
                }
                match target {
                    Some(next) => upper = next,
                    None => break,
                }
            }
        }
        Ok(())
    }

    /// Verify the structural invariants
    ///
    /// # Panics
    ///
    /// Panics with the first violation [`verify`](Self::verify) reports.
    pub fn check_invariants(&self) {
        if let Err(err) = self.verify() {
            panic!("{}", err);
        }
    }

    /// Insert a boundary at a key known to be absent
    #[cfg(test)]
    pub(crate) fn insert_key(&mut self, key: &[u8], version: Version) -> NodeId {
        let cursor = self.cursor(key);
        assert!(cursor.found(self).is_none(), "duplicate boundary");
        self.insert_at(&cursor, version)
    }
}

/// Iterator over boundaries in key order
pub struct Iter<'a> {
    index: &'a VersionedIntervalIndex,
    next: Option<NodeId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a [u8], Version);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = self.index.next(node, 0);
        Some((self.index.key(node), self.index.version(node)))
    }
}

fn corrupt(detail: String) -> Error {
    Error::Internal(format!("index corrupted: {}", detail))
}
