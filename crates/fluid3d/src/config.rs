//! Simulation configuration.
//!
//! Every field is a plain number with a documented valid range. The core only
//! consumes configuration; `validate` is the single place where ranges are
//! enforced, and it runs on every reset.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::{GRAVITY, MAX_GRID_CELLS, MAX_PARTICLES};
use crate::error::{ConfigError, Result};
use crate::obstacle::Obstacle;
use crate::spatial::grid_resolution;
use crate::spawn::lattice_counts;

/// Which solver advances the primary particles.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum SolverKind {
    /// Smoothed particle hydrodynamics over the sorted uniform grid.
    #[default]
    Sph,
    /// PIC/FLIP with a staggered MAC grid and Jacobi projection.
    Flip,
}

/// An axis-aligned box that is filled with particles on reset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnRegion {
    pub centre: Vec3,
    pub size: Vec3,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub regions: Vec<SpawnRegion>,
    /// Particles per unit volume (> 0).
    pub density: f32,
    /// Jitter as a fraction of the particle spacing (>= 0).
    pub jitter: f32,
    pub initial_velocity: Vec3,
    /// Seed for the jitter generator, so every reset spawns the same layout.
    pub seed: u64,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            regions: vec![SpawnRegion {
                centre: Vec3::new(-0.45, -0.25, 0.0),
                size: Vec3::new(1.0, 1.4, 1.6),
            }],
            density: 600.0,
            jitter: 0.25,
            initial_velocity: Vec3::ZERO,
            seed: 42,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphParams {
    /// Kernel support radius and spatial cell size (> 0).
    pub smoothing_radius: f32,
    pub target_density: f32,
    /// Stiffness of the linear equation of state (>= 0).
    pub pressure_multiplier: f32,
    /// Stiffness of the purely repulsive near pressure (>= 0).
    pub near_pressure_multiplier: f32,
    /// Viscosity strength (>= 0).
    pub viscosity_strength: f32,
}

impl Default for SphParams {
    fn default() -> Self {
        Self {
            smoothing_radius: 0.2,
            target_density: 630.0,
            pressure_multiplier: 288.0,
            near_pressure_multiplier: 2.25,
            viscosity_strength: 0.001,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlipParams {
    /// Edge length of a MAC cell (> 0).
    pub cell_size: f32,
    /// PIC/FLIP blend in [0, 1]: 0 = pure PIC, 1 = pure FLIP.
    pub fluidity: f32,
    /// Fixed Jacobi iteration budget per substep (>= 1).
    pub jacobi_iterations: u32,
    /// Strength of the artificial divergence added to over-full cells (>= 0).
    pub density_correction: f32,
    /// Rest particle count per cell; derived from the spawn density when unset.
    pub target_particles_per_cell: Option<f32>,
    /// Velocity-proportional advection jitter (>= 0).
    pub jitter_strength: f32,
    /// Let the top face carry downward flow instead of acting as a wall.
    pub open_top: bool,
}

impl Default for FlipParams {
    fn default() -> Self {
        Self {
            cell_size: 0.1,
            fluidity: 0.97,
            jacobi_iterations: 50,
            density_correction: 1.0,
            target_particles_per_cell: None,
            jitter_strength: 0.02,
            open_top: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionParams {
    /// Radius of influence around the input point or ray (> 0).
    pub radius: f32,
    /// Magnitude of the pull/push acceleration (>= 0).
    pub strength: f32,
}

impl Default for InteractionParams {
    fn default() -> Self {
        Self {
            radius: 0.4,
            strength: 40.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoamParams {
    pub enabled: bool,
    /// Ring buffer capacity.
    pub capacity: usize,
    /// Foam particles per second at full trapped-air and kinetic potential.
    pub spawn_rate: f32,
    pub trapped_air_min: f32,
    pub trapped_air_max: f32,
    pub kinetic_energy_min: f32,
    pub kinetic_energy_max: f32,
    pub lifetime_min: f32,
    pub lifetime_max: f32,
    pub max_spawn_per_particle: u32,
    /// Fewer neighbors than this classifies a particle as spray.
    pub spray_max_neighbors: u32,
    /// More neighbors than this classifies a particle as a bubble.
    pub bubble_min_neighbors: u32,
    /// Linear air drag on spray (1/s).
    pub spray_drag: f32,
    /// Upward acceleration of bubbles as a multiple of |gravity|.
    pub bubble_buoyancy: f32,
    /// Rate at which bubbles relax toward the local fluid velocity (1/s).
    pub bubble_drag: f32,
}

impl Default for FoamParams {
    fn default() -> Self {
        Self {
            enabled: false,
            capacity: 65_536,
            spawn_rate: 70.0,
            trapped_air_min: 5.0,
            trapped_air_max: 25.0,
            kinetic_energy_min: 15.0,
            kinetic_energy_max: 80.0,
            lifetime_min: 5.0,
            lifetime_max: 15.0,
            max_spawn_per_particle: crate::constants::MAX_FOAM_SPAWN_PER_PARTICLE,
            spray_max_neighbors: 6,
            bubble_min_neighbors: 15,
            spray_drag: 0.5,
            bubble_buoyancy: 1.4,
            bubble_drag: 3.0,
        }
    }
}

/// Complete configuration consumed by `SimulationState::new`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub solver: SolverKind,
    /// Full extent of the domain, centred on the origin.
    pub bounds_size: Vec3,
    /// Signed acceleration along Y.
    pub gravity: f32,
    /// Fraction of normal velocity kept on collision, in [0, 1].
    pub collision_damping: f32,
    pub time_scale: f32,
    /// Frames are never simulated with a step longer than `1 / max_timestep_fps`.
    pub max_timestep_fps: f32,
    pub iterations_per_frame: u32,
    pub spawn: SpawnConfig,
    pub sph: SphParams,
    pub flip: FlipParams,
    pub interaction: InteractionParams,
    pub obstacle: Option<Obstacle>,
    pub foam: FoamParams,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            solver: SolverKind::Sph,
            bounds_size: Vec3::splat(2.0),
            gravity: GRAVITY,
            collision_damping: 0.95,
            time_scale: 1.0,
            max_timestep_fps: 60.0,
            iterations_per_frame: 3,
            spawn: SpawnConfig::default(),
            sph: SphParams::default(),
            flip: FlipParams::default(),
            interaction: InteractionParams::default(),
            obstacle: None,
            foam: FoamParams::default(),
        }
    }
}

impl SimConfig {
    /// Half extent of the domain.
    pub fn half_bounds(&self) -> Vec3 {
        self.bounds_size * 0.5
    }

    /// Lower corner of the domain.
    pub fn domain_min(&self) -> Vec3 {
        -self.half_bounds()
    }

    /// Cell size of the grid the active solver runs on.
    pub fn grid_cell_size(&self) -> f32 {
        match self.solver {
            SolverKind::Sph => self.sph.smoothing_radius,
            SolverKind::Flip => self.flip.cell_size,
        }
    }

    /// Resolve the per-cell rest particle count for the FLIP density correction.
    pub fn target_particles_per_cell(&self) -> f32 {
        self.flip
            .target_particles_per_cell
            .unwrap_or_else(|| self.spawn.density * self.flip.cell_size.powi(3))
            .max(1.0)
    }

    /// Cells in the grid of the active solver, or `None` if the count does not
    /// fit in a `u64`.
    pub fn grid_cell_count(&self) -> Option<u64> {
        let res = grid_resolution(self.bounds_size, self.grid_cell_size());
        if !res.is_finite() || res.max_element() > u32::MAX as f32 {
            return None;
        }
        (res.x as u64)
            .checked_mul(res.y as u64)?
            .checked_mul(res.z as u64)
    }

    /// Particles the spawn regions produce, or `None` on overflow.
    pub fn spawn_particle_count(&self) -> Option<u64> {
        self.spawn.regions.iter().try_fold(0u64, |total, region| {
            let c = lattice_counts(region, self.spawn.density);
            let count = (c.x as u64)
                .checked_mul(c.y as u64)?
                .checked_mul(c.z as u64)?;
            total.checked_add(count)
        })
    }

    /// Reject any configuration the solvers cannot run with.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("bounds_size.x", self.bounds_size.x),
            ("bounds_size.y", self.bounds_size.y),
            ("bounds_size.z", self.bounds_size.z),
            ("max_timestep_fps", self.max_timestep_fps),
            ("spawn.density", self.spawn.density),
            ("sph.smoothing_radius", self.sph.smoothing_radius),
            ("flip.cell_size", self.flip.cell_size),
            ("interaction.radius", self.interaction.radius),
        ] {
            positive(field, value)?;
        }

        for (field, value) in [
            ("gravity", self.gravity),
            ("time_scale", self.time_scale),
            ("spawn.jitter", self.spawn.jitter),
            ("sph.target_density", self.sph.target_density),
            ("sph.pressure_multiplier", self.sph.pressure_multiplier),
            ("sph.near_pressure_multiplier", self.sph.near_pressure_multiplier),
            ("sph.viscosity_strength", self.sph.viscosity_strength),
            ("flip.density_correction", self.flip.density_correction),
            ("flip.jitter_strength", self.flip.jitter_strength),
            ("interaction.strength", self.interaction.strength),
        ] {
            finite(field, value)?;
        }

        for (field, value) in [
            ("time_scale", self.time_scale),
            ("spawn.jitter", self.spawn.jitter),
            ("sph.pressure_multiplier", self.sph.pressure_multiplier),
            ("sph.near_pressure_multiplier", self.sph.near_pressure_multiplier),
            ("sph.viscosity_strength", self.sph.viscosity_strength),
            ("flip.density_correction", self.flip.density_correction),
            ("flip.jitter_strength", self.flip.jitter_strength),
            ("interaction.strength", self.interaction.strength),
        ] {
            non_negative(field, value)?;
        }

        unit_range("collision_damping", self.collision_damping)?;
        unit_range("flip.fluidity", self.flip.fluidity)?;

        if self.iterations_per_frame == 0 {
            return Err(ConfigError::ZeroIterations {
                field: "iterations_per_frame",
            });
        }
        if self.flip.jacobi_iterations == 0 {
            return Err(ConfigError::ZeroIterations {
                field: "flip.jacobi_iterations",
            });
        }
        if let Some(target) = self.flip.target_particles_per_cell {
            positive("flip.target_particles_per_cell", target)?;
        }

        if self.spawn.regions.is_empty() {
            return Err(ConfigError::NoSpawnRegions);
        }
        for region in &self.spawn.regions {
            if !region.centre.is_finite() {
                return Err(ConfigError::NonFinite {
                    field: "spawn.regions.centre",
                });
            }
            positive("spawn.regions.size", region.size.min_element())?;
        }

        within_limit("grid cells", self.grid_cell_count(), MAX_GRID_CELLS)?;
        within_limit("particles", self.spawn_particle_count(), MAX_PARTICLES)?;

        if let Some(obstacle) = &self.obstacle {
            obstacle.validate()?;
        }

        if self.foam.enabled {
            self.validate_foam()?;
        }

        Ok(())
    }

    fn validate_foam(&self) -> Result<()> {
        let foam = &self.foam;
        if foam.capacity == 0 {
            return Err(ConfigError::FoamCapacity);
        }
        non_negative("foam.spawn_rate", foam.spawn_rate)?;
        non_negative("foam.spray_drag", foam.spray_drag)?;
        non_negative("foam.bubble_buoyancy", foam.bubble_buoyancy)?;
        non_negative("foam.bubble_drag", foam.bubble_drag)?;
        positive("foam.lifetime_min", foam.lifetime_min)?;
        if foam.lifetime_max < foam.lifetime_min {
            return Err(ConfigError::OutOfRange {
                field: "foam.lifetime_max",
                value: foam.lifetime_max,
                min: foam.lifetime_min,
                max: f32::MAX,
            });
        }
        for (field, min, max) in [
            ("foam.trapped_air_max", foam.trapped_air_min, foam.trapped_air_max),
            ("foam.kinetic_energy_max", foam.kinetic_energy_min, foam.kinetic_energy_max),
        ] {
            finite(field, min)?;
            finite(field, max)?;
            if max <= min {
                return Err(ConfigError::OutOfRange {
                    field,
                    value: max,
                    min,
                    max: f32::MAX,
                });
            }
        }
        Ok(())
    }
}

fn finite(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { field })
    }
}

fn positive(field: &'static str, value: f32) -> Result<()> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<()> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: f32::MAX,
        })
    }
}

/// `None` stands for a count too large to represent at all.
pub(crate) fn within_limit(what: &'static str, count: Option<u64>, max: u64) -> Result<()> {
    match count {
        Some(count) if count <= max => Ok(()),
        count => Err(ConfigError::TooLarge {
            what,
            count: count.unwrap_or(u64::MAX),
            max,
        }),
    }
}

fn unit_range(field: &'static str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: 1.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_negative_radius_rejected() {
        let mut config = SimConfig::default();
        config.sph.smoothing_radius = -0.1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive {
                field: "sph.smoothing_radius",
                ..
            })
        ));
    }

    #[test]
    fn test_damping_out_of_range_rejected() {
        let mut config = SimConfig::default();
        config.collision_damping = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "collision_damping",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_substeps_rejected() {
        let mut config = SimConfig::default();
        config.iterations_per_frame = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroIterations { .. })
        ));
    }

    #[test]
    fn test_nan_bounds_rejected() {
        let mut config = SimConfig::default();
        config.bounds_size.y = f32::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::NonFinite { .. })));
    }

    #[test]
    fn test_foam_ranges_checked_only_when_enabled() {
        let mut config = SimConfig::default();
        config.foam.capacity = 0;
        assert!(config.validate().is_ok());

        config.foam.enabled = true;
        assert_eq!(config.validate(), Err(ConfigError::FoamCapacity));
    }

    #[test]
    fn test_tiny_radius_rejected_as_too_large() {
        let mut config = SimConfig::default();
        config.sph.smoothing_radius = 1e-3;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooLarge {
                what: "grid cells",
                ..
            })
        ));
    }

    #[test]
    fn test_inactive_solver_grid_not_limited() {
        let mut config = SimConfig::default();
        config.flip.cell_size = 1e-4;
        assert_eq!(config.validate(), Ok(()));
        config.solver = SolverKind::Flip;
        assert!(matches!(config.validate(), Err(ConfigError::TooLarge { .. })));
    }

    #[test]
    fn test_huge_spawn_rejected() {
        let mut config = SimConfig::default();
        config.spawn.density = 1e30;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooLarge {
                what: "particles",
                ..
            })
        ));
    }

    #[test]
    fn test_default_counts() {
        let config = SimConfig::default();
        assert_eq!(config.grid_cell_count(), Some(1000));
        assert!(config.spawn_particle_count().is_some_and(|n| n > 0));
    }

    #[test]
    fn test_target_particles_per_cell_derived_from_spawn_density() {
        let mut config = SimConfig::default();
        config.spawn.density = 8000.0;
        config.flip.cell_size = 0.1;
        assert!((config.target_particles_per_cell() - 8.0).abs() < 1e-3);

        config.flip.target_particles_per_cell = Some(3.0);
        assert_eq!(config.target_particles_per_cell(), 3.0);
    }
}
