use crate::{Error, Result, sieve::Segment};
use portable_atomic::{AtomicU64, Ordering};

/// A monotonically advancing cursor over the number line.
///
/// Each [`claim`] is a single atomic `fetch_add`, so every caller receives a
/// range no other caller has ever received or ever will. The cursor never
/// rewinds: a segment whose sieve later fails is simply abandoned.
///
/// The frontier stops issuing segments once it passes `end` (the largest
/// identifier plus one). A claim straddling `end` is truncated.
///
/// [`claim`]: GenerationFrontier::claim
#[derive(Debug)]
pub struct GenerationFrontier {
    next: AtomicU64,
    end: u64,
}

impl GenerationFrontier {
    /// Creates a frontier covering `[start, max_identifier]`.
    pub const fn new(start: u64, max_identifier: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
            end: max_identifier.saturating_add(1),
        }
    }

    /// Claims the next `size` values.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSegment`] if `size` is zero.
    /// - [`Error::FrontierExhausted`] if no values remain.
    pub fn claim(&self, size: u32) -> Result<Segment> {
        if size == 0 {
            return Err(Error::InvalidSegment {
                start: self.position(),
                size,
            });
        }

        let start = self.next.fetch_add(u64::from(size), Ordering::Relaxed);
        if start >= self.end {
            return Err(Error::FrontierExhausted { next: start });
        }

        let size = (self.end - start).min(u64::from(size)) as u32;
        Ok(Segment::new(start, size))
    }

    /// The next unclaimed value. Any value below it has been handed out.
    pub fn position(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }

    pub fn is_exhausted(&self) -> bool {
        self.position() >= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::thread::scope;

    #[test]
    fn claims_are_contiguous() {
        let frontier = GenerationFrontier::new(1_000, 1_000_000);
        assert_eq!(frontier.claim(10).unwrap(), Segment::new(1_000, 10));
        assert_eq!(frontier.claim(5).unwrap(), Segment::new(1_010, 5));
        assert_eq!(frontier.position(), 1_015);
    }

    #[test]
    fn last_claim_is_truncated_then_exhausted() {
        let frontier = GenerationFrontier::new(100, 199);
        assert_eq!(frontier.claim(64).unwrap(), Segment::new(100, 64));
        assert_eq!(frontier.claim(64).unwrap(), Segment::new(164, 36));
        assert!(frontier.is_exhausted());
        assert!(matches!(
            frontier.claim(64),
            Err(Error::FrontierExhausted { .. })
        ));
        // Exhausted claims still advance the cursor; it never rewinds.
        assert!(frontier.position() > 200);
    }

    #[test]
    fn zero_sized_claim_is_rejected() {
        let frontier = GenerationFrontier::new(0, 100);
        assert!(matches!(
            frontier.claim(0),
            Err(Error::InvalidSegment { size: 0, .. })
        ));
        assert_eq!(frontier.position(), 0);
    }

    #[test]
    fn concurrent_claims_never_overlap() {
        const THREADS: usize = 8;
        const CLAIMS_PER_THREAD: usize = 512;

        let frontier = Arc::new(GenerationFrontier::new(1_000_000_000, u64::MAX - 1));
        let claimed = Arc::new(Mutex::new(Vec::with_capacity(THREADS * CLAIMS_PER_THREAD)));

        scope(|s| {
            for t in 0..THREADS {
                let frontier = Arc::clone(&frontier);
                let claimed = Arc::clone(&claimed);
                s.spawn(move || {
                    for i in 0..CLAIMS_PER_THREAD {
                        let size = 1 + ((t * 31 + i * 7) % 97) as u32;
                        let segment = frontier.claim(size).unwrap();
                        claimed.lock().unwrap().push(segment);
                    }
                });
            }
        });

        let mut segments = claimed.lock().unwrap().clone();
        assert_eq!(segments.len(), THREADS * CLAIMS_PER_THREAD);

        let starts: HashSet<u64> = segments.iter().map(|s| s.start).collect();
        assert_eq!(starts.len(), segments.len());

        segments.sort();
        for pair in segments.windows(2) {
            assert!(!pair[0].overlaps(&pair[1]), "{:?} overlaps {:?}", pair[0], pair[1]);
            assert_eq!(pair[0].end(), Some(pair[1].start));
        }
        assert_eq!(segments[0].start, 1_000_000_000);
    }
}
