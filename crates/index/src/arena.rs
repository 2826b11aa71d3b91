//! Node arena for the versioned interval index
//!
//! Nodes live in a single `Vec` and are addressed by [`NodeId`] handles, so
//! the skip list's forward links are plain indices with no aliasing.
//! Released slots go onto a free list keyed by [`SizeClass`] and are reused
//! by the next node of the same class, which keeps a spilled key or level
//! buffer's heap allocation alive across the erase/insert churn of a batch.
//!
//! # Layout
//!
//! - Keys up to `INLINE_KEY_BYTES` and heights up to `INLINE_LEVELS` are
//!   stored inline in the slot; most nodes never touch the heap.
//! - The head node is always slot 0 and is never released.

use resolver_core::types::{Version, INVALID_VERSION};
use smallvec::SmallVec;
use std::ops::{Index, IndexMut};

/// Maximum node height
///
/// Bounds the index to roughly 2^26 boundaries at balanced expected depth.
pub const MAX_LEVELS: usize = 26;

const INLINE_KEY_BYTES: usize = 24;
const INLINE_LEVELS: usize = 4;

/// Per-node bookkeeping counted toward the size class
const NODE_HEADER_BYTES: usize = 8;

/// Typed handle to an arena slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// The head sentinel
    pub const HEAD: NodeId = NodeId(0);

    #[inline]
    fn slot(self) -> usize {
        self.0 as usize
    }
}

/// One level of a node: forward link plus the span aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub(crate) next: Option<NodeId>,
    pub(crate) max_version: Version,
}

impl Level {
    const EMPTY: Level = Level {
        next: None,
        max_version: INVALID_VERSION,
    };
}

/// Arena slot: boundary key plus its levels
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) key: SmallVec<[u8; INLINE_KEY_BYTES]>,
    pub(crate) levels: SmallVec<[Level; INLINE_LEVELS]>,
}

impl Node {
    fn new(key: &[u8], height: usize) -> Self {
        let mut node = Node {
            key: SmallVec::new(),
            levels: SmallVec::new(),
        };
        node.reset(key, height);
        node
    }

    fn reset(&mut self, key: &[u8], height: usize) {
        self.key.clear();
        self.key.extend_from_slice(key);
        self.levels.clear();
        self.levels.resize(height, Level::EMPTY);
    }

    #[inline]
    pub(crate) fn height(&self) -> usize {
        self.levels.len()
    }

    fn size_class(&self) -> SizeClass {
        SizeClass::of(self.key.len(), self.height())
    }
}

/// Allocation bucket by node footprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeClass {
    /// Footprint up to 64 bytes
    Small,
    /// Footprint up to 128 bytes
    Medium,
    /// Anything larger
    Large,
}

impl SizeClass {
    const COUNT: usize = 3;

    /// Classify a node by key length and height
    pub fn of(key_len: usize, height: usize) -> SizeClass {
        let footprint =
            NODE_HEADER_BYTES + key_len + height * std::mem::size_of::<(usize, Version)>();
        if footprint <= 64 {
            SizeClass::Small
        } else if footprint <= 128 {
            SizeClass::Medium
        } else {
            SizeClass::Large
        }
    }

    fn bucket(self) -> usize {
        match self {
            SizeClass::Small => 0,
            SizeClass::Medium => 1,
            SizeClass::Large => 2,
        }
    }
}

/// Slab of index nodes
#[derive(Debug)]
pub struct NodeArena {
    nodes: Vec<Node>,
    free: [Vec<NodeId>; SizeClass::COUNT],
    live: [usize; SizeClass::COUNT],
}

impl NodeArena {
    /// Create an empty arena
    pub fn new() -> Self {
        NodeArena {
            nodes: Vec::new(),
            free: Default::default(),
            live: [0; SizeClass::COUNT],
        }
    }

    /// Allocate a node with `height` empty levels
    ///
    /// # Panics
    ///
    /// Panics if `height` is outside `1..=MAX_LEVELS`.
    pub(crate) fn alloc(&mut self, key: &[u8], height: usize) -> NodeId {
        assert!(
            (1..=MAX_LEVELS).contains(&height),
            "node height {} outside 1..={}",
            height,
            MAX_LEVELS
        );
        let class = SizeClass::of(key.len(), height);
        self.live[class.bucket()] += 1;

        if let Some(id) = self.free[class.bucket()].pop() {
            self.nodes[id.slot()].reset(key, height);
            return id;
        }

        let id = NodeId(u32::try_from(self.nodes.len()).expect("node arena exceeded u32 slots"));
        self.nodes.push(Node::new(key, height));
        id
    }

    /// Return a node's slot to its size class free list
    pub(crate) fn release(&mut self, id: NodeId) {
        debug_assert_ne!(id, NodeId::HEAD, "head node is never released");
        let class = self.nodes[id.slot()].size_class();
        self.live[class.bucket()] -= 1;
        self.free[class.bucket()].push(id);
    }

    /// Number of live nodes, head included
    pub fn live(&self) -> usize {
        self.live.iter().sum()
    }

    /// Number of live nodes in one size class
    pub fn live_in(&self, class: SizeClass) -> usize {
        self.live[class.bucket()]
    }

    /// Number of slots ever allocated
    pub fn slots(&self) -> usize {
        self.nodes.len()
    }

    /// Hint the CPU to pull a node into cache
    #[cfg(all(feature = "prefetch", target_arch = "x86_64"))]
    #[inline(always)]
    pub(crate) fn prefetch(&self, id: NodeId) {
        use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
        if let Some(node) = self.nodes.get(id.slot()) {
            let ptr = node as *const Node as *const i8;
            // SAFETY: prefetch never dereferences; the pointer is in bounds.
            unsafe { _mm_prefetch::<_MM_HINT_T0>(ptr) };
        }
    }

    #[cfg(not(all(feature = "prefetch", target_arch = "x86_64")))]
    #[inline(always)]
    pub(crate) fn prefetch(&self, _id: NodeId) {}
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<NodeId> for NodeArena {
    type Output = Node;

    #[inline]
    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.slot()]
    }
}

impl IndexMut<NodeId> for NodeArena {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.slot()]
    }
}
