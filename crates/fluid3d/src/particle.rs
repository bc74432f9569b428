//! Primary fluid particles, stored as parallel per-field arrays.
//!
//! The spatial index rewrites these arrays in cell order every substep, so
//! each field has a scratch twin the sort gathers into before copying back.

use glam::Vec3;

/// Per-particle attribute arrays plus the sort scratch buffers.
#[derive(Clone, Debug, Default)]
pub struct ParticleBuffers {
    /// World position
    pub position: Vec<Vec3>,
    /// Position extrapolated by the fixed lookahead, used for neighbor search
    pub predicted: Vec<Vec3>,
    /// Current velocity
    pub velocity: Vec<Vec3>,
    /// Broad-kernel density, recomputed every substep
    pub density: Vec<f32>,
    /// Sharp-kernel density, recomputed every substep
    pub near_density: Vec<f32>,

    pub(crate) sorted_position: Vec<Vec3>,
    pub(crate) sorted_predicted: Vec<Vec3>,
    pub(crate) sorted_velocity: Vec<Vec3>,
}

impl ParticleBuffers {
    /// Allocate buffers for the given particles.
    pub fn from_particles(positions: Vec<Vec3>, velocity: Vec3) -> Self {
        let count = positions.len();
        Self {
            predicted: positions.clone(),
            position: positions,
            velocity: vec![velocity; count],
            density: vec![0.0; count],
            near_density: vec![0.0; count],
            sorted_position: vec![Vec3::ZERO; count],
            sorted_predicted: vec![Vec3::ZERO; count],
            sorted_velocity: vec![Vec3::ZERO; count],
        }
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.position.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }

    /// Copy current positions into the predicted buffer (no lookahead).
    pub fn predict_in_place(&mut self) {
        self.predicted.copy_from_slice(&self.position);
    }

    /// Copy the sorted scratch buffers back into the primary buffers.
    pub(crate) fn copy_back_sorted(&mut self) {
        self.position.copy_from_slice(&self.sorted_position);
        self.predicted.copy_from_slice(&self.sorted_predicted);
        self.velocity.copy_from_slice(&self.sorted_velocity);
    }

    /// Number of particles whose position or velocity is NaN or infinite.
    pub fn non_finite_count(&self) -> usize {
        self.position
            .iter()
            .zip(&self.velocity)
            .filter(|(p, v)| !p.is_finite() || !v.is_finite())
            .count()
    }
}
