//! Atomic float accumulation through scaled integers.
//!
//! Parallel P2G splats many particles onto the same grid node. Integer atomic
//! adds are associative, so the accumulated sum is independent of thread
//! order (unlike a float CAS loop).

use std::sync::atomic::{AtomicI64, Ordering};

use crate::constants::FIXED_POINT_SCALE;

/// Fixed-point accumulator with `FIXED_POINT_SCALE` units per 1.0.
#[derive(Debug, Default)]
pub struct AtomicAccumulator(AtomicI64);

impl AtomicAccumulator {
    pub fn new() -> Self {
        Self(AtomicI64::new(0))
    }

    #[inline]
    pub fn add(&self, value: f32) {
        let scaled = (value as f64 * FIXED_POINT_SCALE).round() as i64;
        self.0.fetch_add(scaled, Ordering::Relaxed);
    }

    #[inline]
    pub fn load(&self) -> f32 {
        (self.0.load(Ordering::Relaxed) as f64 / FIXED_POINT_SCALE) as f32
    }

    #[inline]
    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}
