//! Foam advection by class.
//!
//! Neighbor count decides how a foam particle moves:
//! - spray (few neighbors) flies ballistically with air drag
//! - bubbles (many neighbors) relax toward the fluid velocity and rise
//! - foam (in between) is carried along with the fluid surface

use glam::Vec3;
use rayon::prelude::*;

use super::FoamParticle;
use crate::config::{FoamParams, SimConfig};
use crate::kernels::SphKernels;
use crate::particle::ParticleBuffers;
use crate::spatial::SpatialIndex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FoamKind {
    Spray,
    Foam,
    Bubble,
}

#[inline]
pub fn classify(neighbor_count: u32, params: &FoamParams) -> FoamKind {
    if neighbor_count < params.spray_max_neighbors {
        FoamKind::Spray
    } else if neighbor_count > params.bubble_min_neighbors {
        FoamKind::Bubble
    } else {
        FoamKind::Foam
    }
}

/// Neighbor count and Poly6-weighted mean fluid velocity around a point.
fn sample_fluid(
    position: Vec3,
    particles: &ParticleBuffers,
    index: &SpatialIndex,
    kernels: &SphKernels,
) -> (u32, Option<Vec3>) {
    let h_sq = kernels.h * kernels.h;
    let mut count = 0;
    let mut velocity_sum = Vec3::ZERO;
    let mut weight_sum = 0.0;

    index.for_each_neighbor(position, |j| {
        let dst_sq = (particles.position[j] - position).length_squared();
        if dst_sq >= h_sq {
            return;
        }
        count += 1;
        let w = kernels.viscosity(dst_sq.sqrt());
        velocity_sum += particles.velocity[j] * w;
        weight_sum += w;
    });

    let mean = (weight_sum > 0.0).then(|| velocity_sum / weight_sum);
    (count, mean)
}

/// Advance every live foam particle by `dt`. Dead particles are left untouched.
pub fn update_foam(
    foam: &mut [FoamParticle],
    particles: &ParticleBuffers,
    index: &SpatialIndex,
    config: &SimConfig,
    dt: f32,
) {
    let params = &config.foam;
    let kernels = SphKernels::new(index.cell_size());
    let gravity = Vec3::new(0.0, config.gravity, 0.0);
    let half = config.half_bounds();

    foam.par_iter_mut()
        .filter(|p| p.is_alive())
        .for_each(|p| {
            let (neighbors, fluid_velocity) = sample_fluid(p.position, particles, index, &kernels);

            match classify(neighbors, params) {
                FoamKind::Spray => {
                    p.velocity += gravity * dt;
                    p.velocity -= p.velocity * (params.spray_drag * dt).min(1.0);
                }
                FoamKind::Bubble => {
                    let target = fluid_velocity.unwrap_or(p.velocity);
                    p.velocity += (target - p.velocity) * (params.bubble_drag * dt).min(1.0);
                    p.velocity -= gravity * params.bubble_buoyancy * dt;
                }
                FoamKind::Foam => {
                    if let Some(v) = fluid_velocity {
                        p.velocity = v;
                    }
                }
            }

            p.position = (p.position + p.velocity * dt).clamp(-half, half);
            p.lifetime -= dt;
            p.scale = p.lifetime.clamp(0.0, 1.0);
        });
}
