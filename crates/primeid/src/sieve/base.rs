use crate::{Error, Result};

/// Sorted table of every prime up to a fixed limit.
///
/// The table is computed once with a classic sieve of Eratosthenes and never
/// mutated afterwards, so it can be shared between workers behind an `Arc`
/// without locking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePrimeTable {
    limit: u64,
    primes: Vec<u64>,
}

impl BasePrimeTable {
    /// Sieves all primes in `[0, limit]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `limit < 2` or if the limit does not fit
    /// in memory on this platform.
    pub fn build(limit: u64) -> Result<Self> {
        if limit < 2 {
            return Err(Error::Config {
                reason: format!("base prime limit ({limit}) must be at least 2"),
            });
        }
        let len = usize::try_from(limit)
            .ok()
            .and_then(|l| l.checked_add(1))
            .ok_or_else(|| Error::Config {
                reason: format!("base prime limit ({limit}) is too large"),
            })?;

        let mut is_prime = vec![true; len];
        is_prime[0] = false;
        is_prime[1] = false;

        let mut p = 2;
        while p * p < len {
            if is_prime[p] {
                let mut multiple = p * p;
                while multiple < len {
                    is_prime[multiple] = false;
                    multiple += p;
                }
            }
            p += 1;
        }

        let primes = is_prime
            .iter()
            .enumerate()
            .filter_map(|(n, &prime)| prime.then_some(n as u64))
            .collect();

        Ok(Self { limit, primes })
    }

    /// The inclusive upper limit the table was sieved to.
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// All primes `<= limit`, ascending.
    pub fn primes(&self) -> &[u64] {
        &self.primes
    }

    pub fn len(&self) -> usize {
        self.primes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primes.is_empty()
    }

    /// Returns `true` if every composite `<= n` has a prime factor in the
    /// table.
    pub const fn covers(&self, n: u64) -> bool {
        n.isqrt() <= self.limit
    }
}
