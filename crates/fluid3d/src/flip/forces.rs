//! Body forces applied directly to the face velocities.

use glam::Vec3;
use rayon::prelude::*;

use super::grid::MacGrid;
use crate::config::InteractionParams;
use crate::constants::{DISTANCE_EPSILON, POINTER_DRAG};
use crate::input::InputState;
use crate::kernels::smoothstep;

/// Closest point on the ray `origin + t * direction`, `t >= 0`.
#[inline]
fn closest_on_ray(origin: Vec3, direction: Vec3, point: Vec3) -> Vec3 {
    let t = (point - origin).dot(direction).max(0.0);
    origin + direction * t
}

/// Gravity on the v faces plus the pointer ray interaction.
///
/// Faces within `interaction.radius` of the ray are pulled toward it (or
/// pushed away) and dragged along with the pointer velocity, both weighted by
/// a smoothstep falloff of the perpendicular distance.
pub fn apply_forces(
    grid: &mut MacGrid,
    gravity: f32,
    input: &InputState,
    interaction: &InteractionParams,
    dt: f32,
) {
    let gravity_dv = gravity * dt;
    grid.velocity[1].par_iter_mut().for_each(|v| *v += gravity_dv);

    let strength = input.signed_strength(interaction.strength);
    let direction = input.ray_direction.normalize_or_zero();
    if strength == 0.0 || direction == Vec3::ZERO {
        return;
    }

    let radius = interaction.radius;
    let drag = (POINTER_DRAG * dt).min(1.0);
    let origin = input.ray_origin;
    let pointer_velocity = input.pointer_velocity;

    for axis in 0..3 {
        let mut field = std::mem::take(&mut grid.velocity[axis]);
        {
            let grid = &*grid;
            field.par_iter_mut().enumerate().for_each(|(idx, v)| {
                let (i, j, k) = grid.face_coords(axis, idx);
                let p = grid.face_position(axis, i, j, k);
                let offset = closest_on_ray(origin, direction, p) - p;
                let dst = offset.length();
                if dst >= radius {
                    return;
                }

                let influence = 1.0 - smoothstep(0.0, radius, dst);
                let to_ray = if dst > DISTANCE_EPSILON {
                    offset / dst
                } else {
                    Vec3::ZERO
                };
                *v += to_ray[axis] * strength * influence * dt;
                *v += (pointer_velocity[axis] - *v) * influence * drag;
            });
        }
        grid.velocity[axis] = field;
    }
}
