//! All mutable simulation data, passed by reference into each stage.

use glam::Vec3;

use crate::config::{within_limit, SimConfig, SolverKind};
use crate::constants::MAX_PARTICLES;
use crate::error::{ConfigError, Result};
use crate::flip::FlipSolver;
use crate::foam::FoamBuffer;
use crate::kernels::SphKernels;
use crate::particle::ParticleBuffers;
use crate::spatial::SpatialIndex;
use crate::spawn::spawn_positions;

/// Particles, spatial index and solver-specific buffers of one run.
///
/// Independent instances share nothing, so several simulations may coexist.
#[derive(Debug)]
pub struct SimulationState {
    pub particles: ParticleBuffers,
    pub index: SpatialIndex,
    pub kernels: SphKernels,
    /// Present when the FLIP solver is selected
    pub flip: Option<FlipSolver>,
    /// Present when foam is enabled
    pub foam: Option<FoamBuffer>,
    /// Frames completed since the last reset
    pub frame: u64,
}

impl SimulationState {
    /// Validate the configuration and spawn its particle layout.
    pub fn new(config: &SimConfig) -> Result<Self> {
        config.validate()?;
        Self::with_particles(config, spawn_positions(config), config.spawn.initial_velocity)
    }

    /// Validate the configuration and start from explicit particle positions.
    pub fn with_particles(config: &SimConfig, positions: Vec<Vec3>, velocity: Vec3) -> Result<Self> {
        config.validate()?;
        within_limit("particles", Some(positions.len() as u64), MAX_PARTICLES)?;

        let particles = ParticleBuffers::from_particles(positions, velocity);
        let index = SpatialIndex::new(
            config.domain_min(),
            config.bounds_size,
            config.grid_cell_size(),
            particles.len(),
        );
        let res = index.resolution();
        if res.x == 0 || res.y == 0 || res.z == 0 {
            return Err(ConfigError::EmptyGrid(res.x, res.y, res.z));
        }

        let flip = match config.solver {
            SolverKind::Flip => Some(FlipSolver::new(config)?),
            SolverKind::Sph => None,
        };
        let foam = config
            .foam
            .enabled
            .then(|| FoamBuffer::new(config.foam.capacity));

        Ok(Self {
            particles,
            index,
            kernels: SphKernels::new(config.sph.smoothing_radius),
            flip,
            foam,
            frame: 0,
        })
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sph_state_has_no_grid() {
        let state = SimulationState::new(&SimConfig::default()).unwrap();
        assert!(state.particle_count() > 0);
        assert!(state.flip.is_none());
        assert!(state.foam.is_none());
        assert_eq!(state.index.resolution(), glam::UVec3::splat(10));
    }

    #[test]
    fn test_flip_state_allocates_grid() {
        let config = SimConfig {
            solver: SolverKind::Flip,
            ..Default::default()
        };
        let state = SimulationState::new(&config).unwrap();
        let grid = &state.flip.as_ref().unwrap().grid;
        assert_eq!((grid.width, grid.height, grid.depth), (20, 20, 20));
        assert_eq!(state.index.resolution(), glam::UVec3::splat(20));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = SimConfig::default();
        config.sph.smoothing_radius = 0.0;
        assert!(SimulationState::new(&config).is_err());
    }

    #[test]
    fn test_oversized_grid_is_an_error_not_a_panic() {
        let mut config = SimConfig::default();
        config.sph.smoothing_radius = 1e-3;
        assert!(matches!(
            SimulationState::new(&config),
            Err(ConfigError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_foam_allocated_when_enabled() {
        let mut config = SimConfig::default();
        config.foam.enabled = true;
        config.foam.capacity = 128;
        let state = SimulationState::new(&config).unwrap();
        assert_eq!(state.foam.as_ref().map(FoamBuffer::capacity), Some(128));
    }
}
