//! Particle-Grid transfer functions for PIC/FLIP.
//!
//! P2G: Scatter particle velocity to the faces with trilinear tent weights.
//! G2P: Gather the projected field back, blending PIC and FLIP.

use std::sync::atomic::Ordering;

use glam::Vec3;
use rayon::prelude::*;

use super::grid::{CellType, MacGrid};
use crate::constants::WEIGHT_EPSILON;
use crate::particle::ParticleBuffers;

/// Splat `velocity * weight` and `weight` onto the 8 nodes of every
/// staggered component.
pub fn particles_to_grid(grid: &MacGrid, positions: &[Vec3], velocities: &[Vec3]) {
    positions
        .par_iter()
        .zip(velocities.par_iter())
        .for_each(|(&position, &velocity)| {
            for axis in 0..3 {
                let momentum = &grid.momentum[axis];
                let weight = &grid.weight[axis];
                let component = velocity[axis];
                grid.for_each_face_node(axis, position, |idx, w| {
                    weight[idx].add(w);
                    momentum[idx].add(component * w);
                });
            }
        });
}

/// Count particles per cell and classify every cell.
///
/// Obstacle cells are solid regardless of their particle count.
pub fn mark_cells(grid: &mut MacGrid, positions: &[Vec3]) {
    {
        let grid = &*grid;
        positions.par_iter().for_each(|&position| {
            grid.particle_count[grid.cell_of(position)].fetch_add(1, Ordering::Relaxed);
        });
    }

    let MacGrid {
        cell_type,
        particle_count,
        obstacle_solid,
        ..
    } = grid;

    cell_type
        .par_iter_mut()
        .zip(particle_count.par_iter())
        .zip(obstacle_solid.par_iter())
        .for_each(|((cell_type, count), &solid)| {
            *cell_type = if solid {
                CellType::Solid
            } else if count.load(Ordering::Relaxed) > 0 {
                CellType::Fluid
            } else {
                CellType::Air
            };
        });
}

/// Divide accumulated momentum by weight and snapshot the result for the
/// FLIP delta. Nodes with no weight get zero velocity.
pub fn normalize_velocities(grid: &mut MacGrid) {
    let MacGrid {
        velocity,
        momentum,
        weight,
        ..
    } = grid;

    for axis in 0..3 {
        velocity[axis]
            .par_iter_mut()
            .zip(momentum[axis].par_iter())
            .zip(weight[axis].par_iter())
            .for_each(|((velocity, momentum), weight)| {
                let w = weight.load();
                *velocity = if w > WEIGHT_EPSILON {
                    momentum.load() / w
                } else {
                    0.0
                };
            });
    }

    grid.store_pre_pressure_velocities();
}

/// Transfer grid velocities to particles (G2P).
///
/// `pic` is the projected field sampled at the particle, `flip` the particle's
/// own velocity plus the grid change over this substep; `fluidity` blends
/// them. Samples are normalized by the in-range weight so particles near the
/// walls are not slowed by missing nodes. Particle density is set to the
/// particle count of its cell.
pub fn grid_to_particles(grid: &MacGrid, particles: &mut ParticleBuffers, fluidity: f32) {
    let ParticleBuffers {
        position,
        velocity,
        density,
        ..
    } = particles;

    velocity
        .par_iter_mut()
        .zip(density.par_iter_mut())
        .zip(position.par_iter())
        .for_each(|((velocity, density), &position)| {
            for axis in 0..3 {
                let post_field = &grid.velocity[axis];
                let pre_field = &grid.velocity_pre_pressure[axis];
                let mut post = 0.0;
                let mut pre = 0.0;
                let mut weight_sum = 0.0;

                grid.for_each_face_node(axis, position, |idx, w| {
                    post += post_field[idx] * w;
                    pre += pre_field[idx] * w;
                    weight_sum += w;
                });

                if weight_sum > WEIGHT_EPSILON {
                    let pic = post / weight_sum;
                    let flip = velocity[axis] + (post - pre) / weight_sum;
                    velocity[axis] = pic + (flip - pic) * fluidity;
                }
            }

            *density = grid.particle_count[grid.cell_of(position)].load(Ordering::Relaxed) as f32;
        });
}
