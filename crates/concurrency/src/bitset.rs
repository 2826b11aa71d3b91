//! Bitset over sorted point positions
//!
//! Used by the intra-batch check: accepted writes mark the positions their
//! ranges span, and a later read conflicts if any position in its span is
//! already marked.

/// Fixed-size bitset with range set and range test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchBitset {
    words: Vec<u64>,
    len: usize,
}

const WORD_BITS: usize = 64;

/// Bits `lo..hi` of one word, `lo < hi <= 64`
#[inline]
fn mask(lo: usize, hi: usize) -> u64 {
    let upper = if hi == WORD_BITS { !0 } else { (1u64 << hi) - 1 };
    upper & (!0u64 << lo)
}

impl BatchBitset {
    /// Create a bitset of `len` clear bits
    pub fn new(len: usize) -> Self {
        BatchBitset {
            words: vec![0; (len + WORD_BITS - 1) / WORD_BITS],
            len,
        }
    }

    /// Number of bits
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the bitset has no bits
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Set every bit in `[begin, end)`
    pub fn set(&mut self, begin: usize, end: usize) {
        debug_assert!(end <= self.len, "bit range past the end");
        if begin >= end {
            return;
        }
        let (bw, ew) = (begin / WORD_BITS, (end - 1) / WORD_BITS);
        let (lo, hi) = (begin % WORD_BITS, (end - 1) % WORD_BITS + 1);
        if bw == ew {
            self.words[bw] |= mask(lo, hi);
            return;
        }
        self.words[bw] |= mask(lo, WORD_BITS);
        for word in &mut self.words[bw + 1..ew] {
            *word = !0;
        }
        self.words[ew] |= mask(0, hi);
    }

    /// Check if any bit in `[begin, end)` is set
    pub fn any(&self, begin: usize, end: usize) -> bool {
        debug_assert!(end <= self.len, "bit range past the end");
        if begin >= end {
            return false;
        }
        let (bw, ew) = (begin / WORD_BITS, (end - 1) / WORD_BITS);
        let (lo, hi) = (begin % WORD_BITS, (end - 1) % WORD_BITS + 1);
        if bw == ew {
            return self.words[bw] & mask(lo, hi) != 0;
        }
        self.words[bw] & mask(lo, WORD_BITS) != 0
            || self.words[bw + 1..ew].iter().any(|&w| w != 0)
            || self.words[ew] & mask(0, hi) != 0
    }
}
