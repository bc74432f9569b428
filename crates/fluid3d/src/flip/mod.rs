//! PIC/FLIP solver on a staggered MAC grid.
//!
//! One substep, after the spatial index has sorted the particles by cell:
//! 1. Clear grid
//! 2. P2G
//! 3. Mark cells
//! 4. Normalize and snapshot pre-pressure velocity
//! 5. Add forces
//! 6. Enforce boundary
//! 7. Divergence
//! 8. Jacobi solve
//! 9. Apply pressure gradient
//! 10. Re-enforce boundary
//! 11. G2P
//! 12. Advect

pub mod accumulator;
pub mod advection;
pub mod forces;
pub mod grid;
pub mod pressure;
pub mod transfer;

use glam::Vec3;

use crate::config::SimConfig;
use crate::constants::{BOUNDARY_EPSILON_CELLS, JITTER_POOL_SIZE};
use crate::error::Result;
use crate::hash::unit_vector_pool;
use crate::input::InputState;
use crate::particle::ParticleBuffers;
use crate::spatial::SpatialIndex;

pub use accumulator::AtomicAccumulator;
pub use advection::{advect_particles, AdvectParams};
pub use forces::apply_forces;
pub use grid::{CellType, MacGrid};
pub use pressure::{
    apply_pressure_gradient, compute_divergence, divergence_l2, enforce_boundary,
    jacobi_iteration, max_abs_divergence, solve_pressure_jacobi,
};
pub use transfer::{grid_to_particles, mark_cells, normalize_velocities, particles_to_grid};

/// Grid plus the per-run state the FLIP substep needs.
#[derive(Debug)]
pub struct FlipSolver {
    pub grid: MacGrid,
    jitter_pool: Vec<Vec3>,
    target_per_cell: f32,
}

impl FlipSolver {
    pub fn new(config: &SimConfig) -> Result<Self> {
        let grid = MacGrid::new(
            config.domain_min(),
            config.bounds_size,
            config.flip.cell_size,
            config.obstacle.as_ref(),
        )?;
        Ok(Self {
            grid,
            jitter_pool: unit_vector_pool(config.spawn.seed, JITTER_POOL_SIZE),
            target_per_cell: config.target_particles_per_cell(),
        })
    }

    /// Advance the particles by one FLIP substep of length `dt`.
    pub fn substep(
        &mut self,
        particles: &mut ParticleBuffers,
        index: &mut SpatialIndex,
        config: &SimConfig,
        input: &InputState,
        frame: u64,
        dt: f32,
    ) {
        let flip = &config.flip;

        particles.predict_in_place();
        index.build(particles);

        // 1-4. Particles to grid
        let grid = &mut self.grid;
        grid.clear();
        particles_to_grid(grid, &particles.position, &particles.velocity);
        mark_cells(grid, &particles.position);
        normalize_velocities(grid);
        log::trace!(
            "flip: p2g ({} particles, {} fluid cells)",
            particles.len(),
            grid.fluid_cell_count()
        );

        // 5-6. Forces
        apply_forces(grid, config.gravity, input, &config.interaction, dt);
        enforce_boundary(grid, flip.open_top);

        // 7-10. Projection
        compute_divergence(grid, flip.density_correction, self.target_per_cell);
        solve_pressure_jacobi(grid, flip.jacobi_iterations);
        apply_pressure_gradient(grid);
        enforce_boundary(grid, flip.open_top);
        log::trace!("flip: projected with {} jacobi iterations", flip.jacobi_iterations);

        // 11-12. Grid to particles
        grid_to_particles(grid, particles, flip.fluidity);
        let params = AdvectParams {
            dt,
            jitter_strength: flip.jitter_strength,
            jitter_pool: &self.jitter_pool,
            frame,
            obstacle: config.obstacle.as_ref(),
            domain_min: config.domain_min(),
            domain_max: config.half_bounds(),
            epsilon: BOUNDARY_EPSILON_CELLS * flip.cell_size,
        };
        advect_particles(&self.grid, particles, &params);
        log::trace!("flip: advect");
    }

    /// Largest post-projection divergence, ignoring the density correction.
    pub fn max_divergence(&mut self) -> f32 {
        compute_divergence(&mut self.grid, 0.0, self.target_per_cell);
        max_abs_divergence(&self.grid)
    }
}
