use glam::Vec3;
use rayon::prelude::*;

use crate::kernels::SphKernels;
use crate::particle::ParticleBuffers;
use crate::spatial::SpatialIndex;

/// Pull each velocity toward its neighbors' velocities.
///
/// Neighbor velocities are read from a snapshot taken before the pass, so the
/// result does not depend on iteration order.
pub fn apply_viscosity(
    particles: &mut ParticleBuffers,
    index: &SpatialIndex,
    kernels: &SphKernels,
    viscosity_strength: f32,
    dt: f32,
) {
    if viscosity_strength == 0.0 {
        return;
    }

    let ParticleBuffers {
        predicted,
        velocity,
        sorted_velocity: snapshot,
        ..
    } = particles;
    snapshot.copy_from_slice(velocity);
    let (predicted, snapshot) = (&*predicted, &*snapshot);
    let h_sq = kernels.h * kernels.h;

    velocity.par_iter_mut().enumerate().for_each(|(i, velocity)| {
        let pos = predicted[i];
        let own = snapshot[i];
        let mut force = Vec3::ZERO;

        index.for_each_neighbor(pos, |j| {
            if j == i {
                return;
            }
            let dst_sq = (predicted[j] - pos).length_squared();
            if dst_sq >= h_sq {
                return;
            }
            force += (snapshot[j] - own) * kernels.viscosity(dst_sq.sqrt());
        });

        *velocity += force * viscosity_strength * dt;
    });
}
