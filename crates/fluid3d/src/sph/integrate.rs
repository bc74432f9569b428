use glam::Vec3;
use rayon::prelude::*;

use crate::obstacle::Obstacle;
use crate::particle::ParticleBuffers;

/// Keep a particle inside `[-half_bounds, half_bounds]`.
///
/// Each axis that left the box is clamped to the wall and its velocity
/// component is reversed and scaled by `damping`.
#[inline]
pub fn resolve_bounds(position: &mut Vec3, velocity: &mut Vec3, half_bounds: Vec3, damping: f32) {
    for axis in 0..3 {
        if position[axis].abs() > half_bounds[axis] {
            position[axis] = half_bounds[axis] * position[axis].signum();
            velocity[axis] *= -damping;
        }
    }
}

/// Advance positions and resolve domain and obstacle collisions.
///
/// The walls are resolved again after the obstacle push, so an obstacle that
/// crosses a wall never moves a particle out of the domain.
pub fn integrate(
    particles: &mut ParticleBuffers,
    half_bounds: Vec3,
    obstacle: Option<&Obstacle>,
    damping: f32,
    dt: f32,
) {
    particles
        .position
        .par_iter_mut()
        .zip(particles.velocity.par_iter_mut())
        .for_each(|(position, velocity)| {
            *position += *velocity * dt;
            resolve_bounds(position, velocity, half_bounds, damping);
            if let Some(obstacle) = obstacle {
                if obstacle.resolve_collision(position, velocity, damping) {
                    resolve_bounds(position, velocity, half_bounds, damping);
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_particle_moves_freely() {
        let mut particles = ParticleBuffers::from_particles(vec![Vec3::ZERO], Vec3::new(1.0, 2.0, 3.0));
        integrate(&mut particles, Vec3::ONE, None, 0.5, 0.1);
        assert!((particles.position[0] - Vec3::new(0.1, 0.2, 0.3)).length() < 1e-6);
        assert_eq!(particles.velocity[0], Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_only_offending_axis_reflected() {
        let mut position = Vec3::new(1.2, 0.5, -0.5);
        let mut velocity = Vec3::new(3.0, 1.0, -1.0);
        resolve_bounds(&mut position, &mut velocity, Vec3::ONE, 0.5);
        assert_eq!(position, Vec3::new(1.0, 0.5, -0.5));
        assert_eq!(velocity, Vec3::new(-1.5, 1.0, -1.0));
    }

    #[test]
    fn test_obstacle_collision_applied() {
        let obstacle = Obstacle::Sphere {
            centre: Vec3::ZERO,
            radius: 0.5,
        };
        let mut particles =
            ParticleBuffers::from_particles(vec![Vec3::new(0.0, 0.55, 0.0)], Vec3::new(0.0, -2.0, 0.0));
        integrate(&mut particles, Vec3::ONE, Some(&obstacle), 1.0, 0.05);
        assert!((particles.position[0].y - 0.5).abs() < 1e-5);
        assert!(particles.velocity[0].y > 0.0);
    }

    #[test]
    fn test_obstacle_through_floor_keeps_particle_inside() {
        // Box bottom at y = -1.05, below the floor of the unit domain.
        let obstacle = Obstacle::Box {
            centre: Vec3::new(0.0, -0.75, 0.0),
            half_size: Vec3::splat(0.3),
            rotation: glam::Quat::IDENTITY,
        };
        let mut particles =
            ParticleBuffers::from_particles(vec![Vec3::new(0.0, -0.98, 0.0)], Vec3::new(0.0, -1.0, 0.0));
        integrate(&mut particles, Vec3::ONE, Some(&obstacle), 0.5, 0.01);

        let p = particles.position[0];
        assert!(p.abs().cmple(Vec3::ONE).all(), "escaped: {:?}", p);
        assert_eq!(p.y, -1.0);
        assert!(particles.velocity[0].is_finite());
    }
}
