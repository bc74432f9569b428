//! Per-frame simulation diagnostics.

use rayon::prelude::*;

use crate::particle::ParticleBuffers;

/// Summary of the particle state after a frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationStats {
    pub frame: u64,
    pub particle_count: usize,
    pub max_speed: f32,
    /// `0.5 * sum |v|^2` with unit particle mass
    pub kinetic_energy: f32,
    /// Mean of the density buffer (SPH density, or particles per cell for FLIP)
    pub mean_density: f32,
    /// Largest post-projection divergence (FLIP only)
    pub max_divergence: f32,
    pub live_foam: usize,
    /// Particles with a NaN or infinite position or velocity
    pub non_finite: usize,
}

impl SimulationStats {
    /// Compute the particle statistics; grid and foam fields are filled in by
    /// the caller.
    pub fn from_particles(frame: u64, particles: &ParticleBuffers) -> Self {
        let n = particles.len();
        let (max_speed, energy) = particles
            .velocity
            .par_iter()
            .map(|v| {
                let speed_sq = v.length_squared();
                (speed_sq.sqrt(), 0.5 * speed_sq)
            })
            .reduce(|| (0.0, 0.0), |a, b| (a.0.max(b.0), a.1 + b.1));
        let density_sum: f32 = particles.density.par_iter().sum();

        Self {
            frame,
            particle_count: n,
            max_speed,
            kinetic_energy: energy,
            mean_density: if n > 0 { density_sum / n as f32 } else { 0.0 },
            max_divergence: 0.0,
            live_foam: 0,
            non_finite: particles.non_finite_count(),
        }
    }

    /// Whether any reported quantity is NaN or infinite.
    pub fn has_non_finite(&self) -> bool {
        self.non_finite > 0
            || !self.max_speed.is_finite()
            || !self.kinetic_energy.is_finite()
            || !self.mean_density.is_finite()
            || !self.max_divergence.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_stats_from_particles() {
        let mut particles =
            ParticleBuffers::from_particles(vec![Vec3::ZERO, Vec3::ONE], Vec3::ZERO);
        particles.velocity[1] = Vec3::new(3.0, 4.0, 0.0);
        particles.density = vec![2.0, 4.0];

        let stats = SimulationStats::from_particles(7, &particles);
        assert_eq!(stats.frame, 7);
        assert_eq!(stats.particle_count, 2);
        assert!((stats.max_speed - 5.0).abs() < 1e-6);
        assert!((stats.kinetic_energy - 12.5).abs() < 1e-5);
        assert!((stats.mean_density - 3.0).abs() < 1e-6);
        assert!(!stats.has_non_finite());
    }

    #[test]
    fn test_nan_detected() {
        let mut particles = ParticleBuffers::from_particles(vec![Vec3::ZERO], Vec3::ZERO);
        particles.position[0].x = f32::NAN;
        let stats = SimulationStats::from_particles(0, &particles);
        assert_eq!(stats.non_finite, 1);
        assert!(stats.has_non_finite());
    }
}
