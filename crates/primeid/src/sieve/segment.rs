use super::BasePrimeTable;
use crate::{Error, Result};
use std::sync::Arc;

/// A half-open numeric range `[start, start + size)` handed to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Segment {
    pub start: u64,
    pub size: u32,
}

impl Segment {
    pub const fn new(start: u64, size: u32) -> Self {
        Self { start, size }
    }

    /// Exclusive end of the range, or `None` if it would overflow.
    pub const fn end(&self) -> Option<u64> {
        self.start.checked_add(self.size as u64)
    }

    pub const fn contains(&self, n: u64) -> bool {
        match self.end() {
            Some(end) => n >= self.start && n < end,
            None => n >= self.start,
        }
    }

    /// Returns `true` if the two ranges share at least one value.
    pub fn overlaps(&self, other: &Self) -> bool {
        let self_end = self.end().unwrap_or(u64::MAX);
        let other_end = other.end().unwrap_or(u64::MAX);
        self.size > 0 && other.size > 0 && self.start < other_end && other.start < self_end
    }
}

/// Finds the primes inside a [`Segment`] using a shared [`BasePrimeTable`].
///
/// Values below `lower_bound` are sieved like any other but never returned.
/// The output is a growable `Vec` whose initial capacity comes from the prime
/// number theorem, so a dense segment only costs a reallocation.
#[derive(Debug, Clone)]
pub struct SegmentSieve {
    base: Arc<BasePrimeTable>,
    lower_bound: u64,
}

impl SegmentSieve {
    pub const fn new(base: Arc<BasePrimeTable>, lower_bound: u64) -> Self {
        Self { base, lower_bound }
    }

    pub fn base(&self) -> &BasePrimeTable {
        &self.base
    }

    pub const fn lower_bound(&self) -> u64 {
        self.lower_bound
    }

    /// Returns every prime `>= lower_bound` in `segment`, ascending.
    ///
    /// For each base prime `p` with `p * p` inside the segment's top, multiples
    /// are struck out starting at `max(p * p, ceil(start / p) * p)`, so a base
    /// prime lying inside the segment is never struck itself.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSegment`] if the segment is empty or its end overflows.
    /// - [`Error::SegmentGeneration`] if the base table is too small to sieve
    ///   the segment's top.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip(self)))]
    pub fn generate(&self, segment: Segment) -> Result<Vec<u64>> {
        let Segment { start, size } = segment;
        let end = match segment.end() {
            Some(end) if size > 0 => end,
            _ => return Err(Error::InvalidSegment { start, size }),
        };
        let top = end - 1;

        if !self.base.covers(top) {
            return Err(Error::SegmentGeneration {
                start,
                reason: format!(
                    "segment top {top} exceeds base prime coverage (limit {})",
                    self.base.limit()
                ),
            });
        }

        let mut composite = vec![false; size as usize];

        for &p in self.base.primes() {
            let square = p * p;
            if square > top {
                break;
            }

            let mut multiple = square.max(start.div_ceil(p) * p);
            while multiple < end {
                composite[(multiple - start) as usize] = true;
                multiple += p;
            }
        }

        let mut primes = Vec::with_capacity(estimate_prime_count(segment));
        primes.extend(
            composite
                .iter()
                .enumerate()
                .filter(|&(_, &struck)| !struck)
                .map(|(offset, _)| start + offset as u64)
                .filter(|&n| n >= 2 && n >= self.lower_bound),
        );

        Ok(primes)
    }
}

/// Rough upper estimate of the primes in a segment, `size / (ln(start) - 1.1)`.
///
/// Only sizes the initial allocation. Small or low segments fall back to the
/// segment width.
fn estimate_prime_count(segment: Segment) -> usize {
    let size = segment.size as usize;
    if segment.start < 1 << 16 {
        return size;
    }
    let density = (segment.start as f64).ln() - 1.1;
    ((size as f64 / density) as usize).saturating_add(16).min(size)
}
