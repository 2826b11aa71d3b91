//! Range boundaries as sortable points
//!
//! Every non-empty read or write range contributes a begin point and an end
//! point. Sorting all points of a batch once turns every range into an
//! interval of point positions, which is what the intra-batch check and the
//! write coalescing operate on.
//!
//! ## Order
//!
//! Points order by key bytes (a key sorts before its extensions), then at
//! equal keys by role:
//!
//! ```text
//! end-read (0) < end-write (1) < begin-write (2) < begin-read (3)
//! ```
//!
//! Ranges ending at a key close before ranges beginning there open, so
//! abutting ranges never share a position interval.
//!
//! ## Sort
//!
//! A most-significant-digit radix sort over an alphabet of 261 symbols:
//! `0` for end-of-key, `1..=4` for the role, `5 + byte` for key bytes.
//! Partitions at or below the cutoff use a stable comparison sort.

use std::cmp::Ordering;

const ALPHABET: usize = 256 + 5;
const BYTE_OFFSET: usize = 5;

/// One boundary of a conflict range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point<'a> {
    /// Boundary key
    pub key: &'a [u8],
    /// Begin (true) or end (false) of its range
    pub begin: bool,
    /// Write range (true) or read range (false)
    pub write: bool,
    /// Owning transaction, by arrival order
    pub transaction: usize,
    /// Where the sorted position of this point gets recorded
    pub slot: usize,
}

impl<'a> Point<'a> {
    /// Rank among points with the same key
    #[inline]
    pub fn extra_ordering(&self) -> usize {
        (self.begin as usize) * 2 + (self.write ^ self.begin) as usize
    }

    /// Radix symbol at `depth`
    #[inline]
    fn symbol(&self, depth: usize) -> usize {
        match depth.cmp(&self.key.len()) {
            Ordering::Less => BYTE_OFFSET + self.key[depth] as usize,
            Ordering::Equal => 0,
            Ordering::Greater => 1 + self.extra_ordering(),
        }
    }
}

/// Total order on points
pub fn compare_points(a: &Point<'_>, b: &Point<'_>) -> Ordering {
    a.key
        .cmp(b.key)
        .then_with(|| a.extra_ordering().cmp(&b.extra_ordering()))
}

/// Sort points in place; stable for points that compare equal
pub fn sort_points(points: &mut [Point<'_>], radix_cutoff: usize) {
    let cutoff = radix_cutoff.max(1);
    let mut scratch = Vec::with_capacity(points.len());
    // (start, len, depth) of partitions still to sort
    let mut pending = vec![(0, points.len(), 0)];

    while let Some((start, len, depth)) = pending.pop() {
        let part = &mut points[start..start + len];
        if len <= cutoff {
            part.sort_by(compare_points);
            continue;
        }

        let mut counts = [0usize; ALPHABET];
        for point in part.iter() {
            counts[point.symbol(depth)] += 1;
        }

        // Partitions are homogeneous past a key's end: once depth runs past
        // the first key, this was the role pass and the partition is done.
        let last_pass = depth > part[0].key.len();

        if counts.iter().any(|&c| c == len) {
            if !last_pass {
                pending.push((start, len, depth + 1));
            }
            continue;
        }

        let mut offsets = [0usize; ALPHABET];
        let mut total = 0;
        for (symbol, &count) in counts.iter().enumerate() {
            offsets[symbol] = total;
            total += count;
        }

        scratch.clear();
        scratch.extend_from_slice(part);
        let mut fill = offsets;
        for point in &scratch {
            let symbol = point.symbol(depth);
            part[fill[symbol]] = *point;
            fill[symbol] += 1;
        }

        if last_pass {
            continue;
        }
        for (symbol, &count) in counts.iter().enumerate() {
            if count > 1 {
                pending.push((start + offsets[symbol], count, depth + 1));
            }
        }
    }
}
