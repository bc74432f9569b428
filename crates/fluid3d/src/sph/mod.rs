//! Smoothed particle hydrodynamics solver.
//!
//! One substep runs these stages in order, each a parallel pass over the
//! particles:
//! 1. External forces and predicted positions
//! 2. Spatial index build over the predicted positions
//! 3. Density and near density
//! 4. Pressure
//! 5. Viscosity
//! 6. Integration with boundary and obstacle collision

pub mod density;
pub mod forces;
pub mod integrate;
pub mod pressure;
pub mod viscosity;

use crate::config::SimConfig;
use crate::input::InputState;
use crate::kernels::SphKernels;
use crate::particle::ParticleBuffers;
use crate::spatial::SpatialIndex;

pub use density::compute_densities;
pub use forces::{apply_external_forces, external_acceleration};
pub use integrate::{integrate, resolve_bounds};
pub use pressure::{apply_pressure_forces, pressure_pair_acceleration, PressureSample};
pub use viscosity::apply_viscosity;

/// Advance the particles by one SPH substep of length `dt`.
pub fn substep(
    particles: &mut ParticleBuffers,
    index: &mut SpatialIndex,
    kernels: &SphKernels,
    config: &SimConfig,
    input: &InputState,
    dt: f32,
) {
    apply_external_forces(particles, config, input, dt);
    log::trace!("sph: external forces ({} particles)", particles.len());

    index.build(particles);

    compute_densities(particles, index, kernels);
    log::trace!("sph: densities");

    apply_pressure_forces(particles, index, kernels, &config.sph, dt);
    log::trace!("sph: pressure");

    apply_viscosity(particles, index, kernels, config.sph.viscosity_strength, dt);
    log::trace!("sph: viscosity");

    integrate(
        particles,
        config.half_bounds(),
        config.obstacle.as_ref(),
        config.collision_damping,
        dt,
    );
    log::trace!("sph: integrate");
}
