//! Foam emission from trapped air and kinetic energy.

use rayon::prelude::*;

use super::FoamParticle;
use crate::config::FoamParams;
use crate::constants::DISTANCE_EPSILON;
use crate::hash::{hash3, random01, random_unit_vector};
use crate::particle::ParticleBuffers;
use crate::spatial::SpatialIndex;

/// Linear ramp clamped to [0, 1]: 0 at `min`, 1 at `max`.
#[inline]
pub fn ramp(value: f32, min: f32, max: f32) -> f32 {
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Round `value` down or up at random so the expected result equals `value`.
///
/// `random` must be uniform in [0, 1).
#[inline]
pub fn stochastic_round(value: f32, random: f32) -> u32 {
    let whole = value.floor();
    let extra = (random < value - whole) as u32;
    whole as u32 + extra
}

/// Number of foam particles for one fluid particle, capped at `max`.
#[inline]
pub fn spawn_count(potential: f32, random: f32, max: u32) -> u32 {
    if !potential.is_finite() || potential <= 0.0 {
        return 0;
    }
    stochastic_round(potential.min(max as f32), random).min(max)
}

/// Trapped-air measure of particle `i`: relative velocity of neighbors moving
/// across the line between the particles, weighted linearly by distance.
pub fn trapped_air_potential(particles: &ParticleBuffers, index: &SpatialIndex, i: usize) -> f32 {
    let h = index.cell_size();
    let pos = particles.position[i];
    let vel = particles.velocity[i];
    let mut potential = 0.0;

    index.for_each_neighbor(pos, |j| {
        if j == i {
            return;
        }
        let offset = pos - particles.position[j];
        let dst = offset.length();
        if dst >= h || dst <= DISTANCE_EPSILON {
            return;
        }
        let relative = vel - particles.velocity[j];
        let speed = relative.length();
        if speed <= DISTANCE_EPSILON {
            return;
        }
        let alignment = (relative / speed).dot(offset / dst);
        potential += speed * (1.0 - alignment) * (1.0 - dst / h);
    });

    potential
}

/// Emit new foam particles from every fluid particle.
///
/// Runs in parallel and returns the new particles in fluid-particle order;
/// slot assignment happens afterwards.
pub fn spawn_foam(
    particles: &ParticleBuffers,
    index: &SpatialIndex,
    params: &FoamParams,
    frame: u64,
    dt: f32,
) -> Vec<FoamParticle> {
    if params.spawn_rate <= 0.0 || dt <= 0.0 {
        return Vec::new();
    }
    let h = index.cell_size();
    let frame_key = frame as u32;

    (0..particles.len())
        .into_par_iter()
        .flat_map_iter(|i| {
            let vel = particles.velocity[i];
            let trapped_air = trapped_air_potential(particles, index, i);
            let kinetic = 0.5 * vel.length_squared();
            let potential = ramp(trapped_air, params.trapped_air_min, params.trapped_air_max)
                * ramp(kinetic, params.kinetic_energy_min, params.kinetic_energy_max)
                * params.spawn_rate
                * dt;

            let count = spawn_count(
                potential,
                random01(hash3(i as u32, frame_key, 0)),
                params.max_spawn_per_particle,
            );
            let pos = particles.position[i];

            (0..count).map(move |k| {
                let seed = hash3(i as u32, frame_key, k + 1);
                let offset = random_unit_vector(seed) * random01(seed ^ 0x9e37_79b9) * 0.5 * h;
                let t = random01(seed.rotate_left(16));
                FoamParticle {
                    position: pos + offset,
                    lifetime: params.lifetime_min + (params.lifetime_max - params.lifetime_min) * t,
                    velocity: vel,
                    scale: 1.0,
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_clamps() {
        assert_eq!(ramp(0.0, 5.0, 25.0), 0.0);
        assert_eq!(ramp(15.0, 5.0, 25.0), 0.5);
        assert_eq!(ramp(100.0, 5.0, 25.0), 1.0);
    }

    #[test]
    fn test_stochastic_round_bounds() {
        assert_eq!(stochastic_round(2.0, 0.0), 2);
        assert_eq!(stochastic_round(2.3, 0.29), 3);
        assert_eq!(stochastic_round(2.3, 0.31), 2);
    }

    #[test]
    fn test_spawn_count_capped_and_guarded() {
        assert_eq!(spawn_count(50.0, 0.5, 10), 10);
        assert_eq!(spawn_count(-1.0, 0.0, 10), 0);
        assert_eq!(spawn_count(f32::NAN, 0.0, 10), 0);
    }

    #[test]
    fn test_stochastic_round_is_unbiased() {
        for expected in [0.05f32, 0.5, 2.3, 7.75] {
            let n = 100_000u32;
            let total: u64 = (0..n)
                .map(|i| stochastic_round(expected, random01(hash3(i, 11, 0))) as u64)
                .sum();
            let mean = total as f64 / n as f64;
            assert!(
                (mean - expected as f64).abs() < 0.01,
                "mean {} for {}",
                mean,
                expected
            );
        }
    }
}
