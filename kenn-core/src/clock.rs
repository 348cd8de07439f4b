//! Clock sources for grace-period deadlines.
//!
//! The interest core never reads wall time directly; it asks a [`Clock`].
//! Servers use [`MonotonicClock`], tests drive a [`ManualClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::types::Timestamp;

/// Monotonic time source.
pub trait Clock: Send + Sync {
    /// Current time. Must never go backwards.
    fn now(&self) -> Timestamp;
}

/// Seconds elapsed since the clock was created.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Start a clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_secs(self.origin.elapsed().as_secs_f64())
    }
}

/// A clock that only moves when told to. Lock-free; stores the `f64` bits.
#[derive(Debug, Default)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    /// A manual clock starting at `secs`.
    #[must_use]
    pub fn starting_at(secs: f64) -> Self {
        Self {
            bits: AtomicU64::new(secs.to_bits()),
        }
    }

    /// Jump to an absolute time. Earlier times are ignored.
    pub fn set(&self, secs: f64) {
        self.bits.fetch_max_f64(secs);
    }

    /// Move forward by `secs`.
    pub fn advance(&self, secs: f64) {
        let mut current = self.bits.load(Ordering::Acquire);
        loop {
            let next = (f64::from_bits(current) + secs.max(0.0)).to_bits();
            match self
                .bits
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_secs(f64::from_bits(self.bits.load(Ordering::Acquire)))
    }
}

/// `fetch_max` over `f64` values stored as bits.
trait FetchMaxF64 {
    fn fetch_max_f64(&self, value: f64);
}

impl FetchMaxF64 for AtomicU64 {
    fn fetch_max_f64(&self, value: f64) {
        let mut current = self.load(Ordering::Acquire);
        while f64::from_bits(current) < value {
            match self.compare_exchange_weak(
                current,
                value.to_bits(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }
}
