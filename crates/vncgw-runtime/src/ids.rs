//! Client identifier generation and poll jitter.
//!
//! A 32-bit counter seeded from the wall clock is pushed through a bijective
//! mixing function. Bijectivity means no identifier repeats until the counter
//! wraps; the mixing means consecutive identifiers are not guessable by
//! incrementing. Identifiers are capacity tokens, not secrets.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use vncgw_core::ClientId;

#[derive(Debug)]
pub struct IdGenerator {
    counter: AtomicU32,
}

impl IdGenerator {
    /// Generator seeded from the current time.
    pub fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.subsec_nanos() ^ (d.as_secs() as u32));
        Self::with_seed(nanos)
    }

    pub const fn with_seed(seed: u32) -> Self {
        Self {
            counter: AtomicU32::new(seed),
        }
    }

    /// Next raw 32-bit value.
    pub fn next_u32(&self) -> u32 {
        mix(self.counter.fetch_add(1, Ordering::Relaxed))
    }

    /// A fresh client identifier.
    pub fn next_client_id(&self) -> ClientId {
        ClientId::from_token(self.next_u32())
    }

    /// A duration drawn uniformly from `[0, max]`.
    pub fn jitter(&self, max: Duration) -> Duration {
        if max.is_zero() {
            return Duration::ZERO;
        }
        max.mul_f64(f64::from(self.next_u32()) / f64::from(u32::MAX))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Bijective 32-bit integer hash (xorshift-multiply).
const fn mix(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}
