//! Particle advection through the projected grid velocity.

use glam::Vec3;
use rayon::prelude::*;

use super::grid::MacGrid;
use crate::obstacle::Obstacle;
use crate::particle::ParticleBuffers;

/// Advection settings for one substep.
#[derive(Clone, Copy, Debug)]
pub struct AdvectParams<'a> {
    pub dt: f32,
    pub jitter_strength: f32,
    pub jitter_pool: &'a [Vec3],
    /// Offset into the jitter pool, advanced every frame.
    pub frame: u64,
    pub obstacle: Option<&'a Obstacle>,
    /// Particles are kept strictly inside `[domain_min + eps, domain_max - eps]`.
    pub domain_min: Vec3,
    pub domain_max: Vec3,
    pub epsilon: f32,
}

/// Move particles with RK2 (midpoint) through the post-projection field.
///
/// Afterwards each particle gets a velocity-proportional jitter drawn from the
/// fixed pool, is pushed out of the obstacle and clamped inside the domain.
pub fn advect_particles(grid: &MacGrid, particles: &mut ParticleBuffers, params: &AdvectParams) {
    let pool_len = params.jitter_pool.len();
    let frame = params.frame as usize;
    let lo = params.domain_min + params.epsilon;
    let hi = params.domain_max - params.epsilon;
    let dt = params.dt;

    particles
        .position
        .par_iter_mut()
        .zip(particles.velocity.par_iter_mut())
        .enumerate()
        .for_each(|(i, (position, velocity))| {
            let start = *position;
            let v1 = grid.sample_velocity(start);
            let midpoint = start + v1 * (0.5 * dt);
            let v2 = grid.sample_velocity(midpoint);
            let mut next = start + v2 * dt;

            if params.jitter_strength > 0.0 && pool_len > 0 {
                let dir = params.jitter_pool[(i.wrapping_add(frame)) % pool_len];
                next += dir * params.jitter_strength * velocity.length() * dt;
            }

            if let Some(obstacle) = params.obstacle {
                obstacle.resolve_collision(&mut next, velocity, 0.0);
            }

            *position = next.clamp(lo, hi);
        });
}
