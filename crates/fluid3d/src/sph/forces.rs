//! External forces: gravity plus the pointer pull/push interaction.

use glam::Vec3;
use rayon::prelude::*;

use crate::config::SimConfig;
use crate::constants::{DISTANCE_EPSILON, PREDICTION_LOOKAHEAD};
use crate::input::InputState;
use crate::particle::ParticleBuffers;

/// Acceleration on one particle.
///
/// Inside the interaction radius gravity fades out (only while pulling), the
/// particle is drawn toward the input point and its velocity is damped so it
/// does not orbit.
#[inline]
pub fn external_acceleration(
    position: Vec3,
    velocity: Vec3,
    gravity: f32,
    input_point: Vec3,
    radius: f32,
    strength: f32,
) -> Vec3 {
    let gravity_accel = Vec3::new(0.0, gravity, 0.0);
    if strength == 0.0 {
        return gravity_accel;
    }

    let offset = input_point - position;
    let dst_sq = offset.length_squared();
    if dst_sq >= radius * radius {
        return gravity_accel;
    }

    let dst = dst_sq.sqrt();
    let centre_t = 1.0 - dst / radius;
    let dir_to_centre = if dst > DISTANCE_EPSILON {
        offset / dst
    } else {
        Vec3::ZERO
    };
    let gravity_weight = 1.0 - centre_t * (strength / 10.0).clamp(0.0, 1.0);

    gravity_accel * gravity_weight + dir_to_centre * centre_t * strength - velocity * centre_t
}

/// Apply external forces and compute predicted positions.
pub fn apply_external_forces(
    particles: &mut ParticleBuffers,
    config: &SimConfig,
    input: &InputState,
    dt: f32,
) {
    let strength = input.signed_strength(config.interaction.strength);
    let radius = config.interaction.radius;
    let gravity = config.gravity;
    let input_point = input.position;

    particles
        .velocity
        .par_iter_mut()
        .zip(particles.predicted.par_iter_mut())
        .zip(particles.position.par_iter())
        .for_each(|((velocity, predicted), &position)| {
            let accel =
                external_acceleration(position, *velocity, gravity, input_point, radius, strength);
            *velocity += accel * dt;
            *predicted = position + *velocity * PREDICTION_LOOKAHEAD;
        });
}
