//! Pressure force from a linear equation of state plus a purely repulsive
//! near-pressure term that keeps particles from clumping.

use glam::Vec3;
use rayon::prelude::*;

use crate::config::SphParams;
use crate::constants::DISTANCE_EPSILON;
use crate::kernels::SphKernels;
use crate::particle::ParticleBuffers;
use crate::spatial::SpatialIndex;

/// Density and pressure values of one particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PressureSample {
    pub density: f32,
    pub pressure: f32,
    pub near_pressure: f32,
}

impl PressureSample {
    #[inline]
    pub fn new(density: f32, near_density: f32, params: &SphParams) -> Self {
        Self {
            density,
            pressure: params.pressure_multiplier * (density - params.target_density),
            near_pressure: params.near_pressure_multiplier * near_density,
        }
    }
}

/// Acceleration on particle i caused by neighbor j.
///
/// Both terms use the shared pressure and divide by `rho_i * rho_j`, so
/// swapping i and j flips the sign of the result.
#[inline]
pub fn pressure_pair_acceleration(
    offset_ij: Vec3,
    i: PressureSample,
    j: PressureSample,
    kernels: &SphKernels,
) -> Vec3 {
    let dst = offset_ij.length();
    if dst >= kernels.h || dst <= DISTANCE_EPSILON {
        return Vec3::ZERO;
    }
    let denominator = i.density * j.density;
    if denominator <= 0.0 {
        return Vec3::ZERO;
    }

    let dir = offset_ij / dst;
    let shared_pressure = (i.pressure + j.pressure) * 0.5;
    let shared_near_pressure = (i.near_pressure + j.near_pressure) * 0.5;

    dir * (kernels.density_derivative(dst) * shared_pressure
        + kernels.near_density_derivative(dst) * shared_near_pressure)
        / denominator
}

/// Accelerate every particle by its summed pressure pair terms.
pub fn apply_pressure_forces(
    particles: &mut ParticleBuffers,
    index: &SpatialIndex,
    kernels: &SphKernels,
    params: &SphParams,
    dt: f32,
) {
    let ParticleBuffers {
        predicted,
        velocity,
        density,
        near_density,
        ..
    } = particles;
    let (predicted, density, near_density) = (&*predicted, &*density, &*near_density);

    velocity.par_iter_mut().enumerate().for_each(|(i, velocity)| {
        if density[i] <= 0.0 {
            return;
        }
        let pos = predicted[i];
        let own = PressureSample::new(density[i], near_density[i], params);
        let mut accel = Vec3::ZERO;

        index.for_each_neighbor(pos, |j| {
            if j == i {
                return;
            }
            let other = PressureSample::new(density[j], near_density[j], params);
            accel += pressure_pair_acceleration(predicted[j] - pos, own, other, kernels);
        });

        *velocity += accel * dt;
    });
}
