//! Real-time 3D fluid simulation core
//!
//! Two interchangeable solvers advance one set of particles inside an
//! axis-aligned box:
//! - SPH with density, near-density pressure and viscosity over a sorted
//!   uniform grid
//! - PIC/FLIP with a staggered MAC grid and a Jacobi pressure projection
//!
//! An optional secondary-particle layer spawns spray, foam and bubbles from
//! either solver. Every stage is a data-parallel rayon pass.
//!
//! # Example
//!
//! ```
//! use fluid3d::{FluidSimulation3D, SimConfig};
//!
//! let mut sim = FluidSimulation3D::new(SimConfig::default()).unwrap();
//! sim.input_mut().pull = true;
//! sim.step(1.0 / 60.0);
//! assert!(sim.positions().iter().all(|p| p.is_finite()));
//! ```

pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod flip;
pub mod foam;
pub mod hash;
pub mod input;
pub mod kernels;
pub mod obstacle;
pub mod particle;
pub mod spatial;
pub mod spawn;
pub mod sph;
pub mod state;

pub use config::{
    FlipParams, FoamParams, InteractionParams, SimConfig, SolverKind, SpawnConfig, SpawnRegion,
    SphParams,
};
pub use diagnostics::SimulationStats;
pub use error::{ConfigError, Result};
pub use foam::{FoamBuffer, FoamParticle};
pub use glam::Vec3;
pub use input::InputState;
pub use obstacle::Obstacle;
pub use particle::ParticleBuffers;
pub use spatial::SpatialIndex;
pub use state::SimulationState;

/// Frame driver: owns the configuration, the state and the input.
#[derive(Debug)]
pub struct FluidSimulation3D {
    config: SimConfig,
    state: SimulationState,
    input: InputState,
    stats: SimulationStats,
}

impl FluidSimulation3D {
    pub fn new(config: SimConfig) -> Result<Self> {
        let state = SimulationState::new(&config)?;
        let sim = Self {
            config,
            state,
            input: InputState::default(),
            stats: SimulationStats::default(),
        };
        sim.log_reset();
        Ok(sim)
    }

    /// Replace the configuration and respawn from scratch.
    ///
    /// On error the previous simulation is kept unchanged.
    pub fn reset(&mut self, config: SimConfig) -> Result<()> {
        let state = SimulationState::new(&config)?;
        self.config = config;
        self.state = state;
        self.stats = SimulationStats::default();
        self.log_reset();
        Ok(())
    }

    fn log_reset(&self) {
        let res = self.state.index.resolution();
        log::info!(
            "Reset: {} particles, {:?} solver, grid {}x{}x{}",
            self.state.particle_count(),
            self.config.solver,
            res.x,
            res.y,
            res.z
        );
    }

    /// Length of one frame: the scaled wall time, capped at `1 / max_timestep_fps`.
    pub fn frame_time(&self, wall_dt: f32) -> f32 {
        let scaled = wall_dt * self.config.time_scale;
        if !scaled.is_finite() || scaled <= 0.0 {
            return 0.0;
        }
        scaled.min(1.0 / self.config.max_timestep_fps)
    }

    /// Advance one rendered frame of `iterations_per_frame` substeps.
    pub fn step(&mut self, wall_dt: f32) {
        let frame_time = self.frame_time(wall_dt);
        let substeps = self.config.iterations_per_frame;
        let dt = frame_time / substeps as f32;
        let frame = self.state.frame;

        let SimulationState {
            particles,
            index,
            kernels,
            flip,
            foam,
            ..
        } = &mut self.state;

        for _ in 0..substeps {
            match flip.as_mut() {
                Some(solver) => {
                    solver.substep(particles, index, &self.config, &self.input, frame, dt)
                }
                None => sph::substep(particles, index, kernels, &self.config, &self.input, dt),
            }
        }

        if let Some(foam) = foam.as_mut() {
            crate::foam::step_foam(foam, particles, index, &self.config, frame, frame_time);
        }

        let mut stats = SimulationStats::from_particles(frame, particles);
        if let Some(solver) = flip.as_mut() {
            stats.max_divergence = solver.max_divergence();
        }
        stats.live_foam = foam.as_ref().map_or(0, FoamBuffer::live_count);

        self.state.frame += 1;

        if stats.has_non_finite() {
            log::warn!(
                "Frame {}: {} particles with non-finite state",
                stats.frame,
                stats.non_finite
            );
        }
        log::debug!(
            "Frame {}: dt={:.5} substeps={} max_speed={:.3} live_foam={}",
            stats.frame,
            dt,
            substeps,
            stats.max_speed,
            stats.live_foam
        );
        self.stats = stats;
    }

    // ========== Accessors ==========

    pub fn positions(&self) -> &[Vec3] {
        &self.state.particles.position
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.state.particles.velocity
    }

    pub fn densities(&self) -> &[f32] {
        &self.state.particles.density
    }

    pub fn particle_count(&self) -> usize {
        self.state.particle_count()
    }

    /// Every foam slot, alive or not. Check `lifetime > 0` before drawing.
    pub fn foam_particles(&self) -> &[FoamParticle] {
        self.state
            .foam
            .as_ref()
            .map(FoamBuffer::particles)
            .unwrap_or(&[])
    }

    pub fn live_foam_count(&self) -> usize {
        self.state.foam.as_ref().map_or(0, FoamBuffer::live_count)
    }

    /// Positions as raw bytes for GPU upload.
    pub fn positions_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.positions())
    }

    /// Foam slots as raw bytes for GPU upload.
    pub fn foam_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.foam_particles())
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Statistics of the last completed frame.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }
}
