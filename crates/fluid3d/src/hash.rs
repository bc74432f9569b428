//! Stateless per-item randomness for parallel passes.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// PCG-RXS-M-XS 32-bit hash.
#[inline]
pub fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

/// Uniform float in [0, 1) from a hash input.
#[inline]
pub fn random01(input: u32) -> f32 {
    // Top 24 bits so the result is exactly representable and never 1.0.
    (pcg_hash(input) >> 8) as f32 / (1u32 << 24) as f32
}

/// Combine up to three keys into one hash input.
#[inline]
pub fn hash3(a: u32, b: u32, c: u32) -> u32 {
    pcg_hash(a ^ pcg_hash(b ^ pcg_hash(c)))
}

/// Uniformly distributed unit vector from a hash input.
pub fn random_unit_vector(input: u32) -> Vec3 {
    let z = random01(input) * 2.0 - 1.0;
    let phi = random01(pcg_hash(input)) * std::f32::consts::TAU;
    let ring = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(ring * phi.cos(), ring * phi.sin(), z)
}

/// Fixed pool of random unit vectors, identical for a given seed.
pub fn unit_vector_pool(seed: u64, count: usize) -> Vec<Vec3> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut pool = Vec::with_capacity(count);
    while pool.len() < count {
        let candidate = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        let length_sq = candidate.length_squared();
        if length_sq > 1e-4 && length_sq <= 1.0 {
            pool.push(candidate / length_sq.sqrt());
        }
    }
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random01_range_and_mean() {
        let n = 50_000;
        let mut sum = 0.0f64;
        for i in 0..n {
            let r = random01(i);
            assert!((0.0..1.0).contains(&r));
            sum += r as f64;
        }
        let mean = sum / n as f64;
        assert!((mean - 0.5).abs() < 0.01, "mean {}", mean);
    }

    #[test]
    fn test_unit_vectors_normalized() {
        for v in unit_vector_pool(7, 64) {
            assert!((v.length() - 1.0).abs() < 1e-5);
        }
        for i in 0..64 {
            assert!((random_unit_vector(i).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_pool_deterministic() {
        assert_eq!(unit_vector_pool(3, 16), unit_vector_pool(3, 16));
        assert_ne!(unit_vector_pool(3, 16), unit_vector_pool(4, 16));
    }
}
