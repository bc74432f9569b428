use rayon::prelude::*;

use crate::kernels::SphKernels;
use crate::particle::ParticleBuffers;
use crate::spatial::SpatialIndex;

/// Density and near density at each predicted position.
pub fn compute_densities(
    particles: &mut ParticleBuffers,
    index: &SpatialIndex,
    kernels: &SphKernels,
) {
    let h_sq = kernels.h * kernels.h;
    let ParticleBuffers {
        predicted,
        density,
        near_density,
        ..
    } = particles;
    let predicted = &*predicted;

    density
        .par_iter_mut()
        .zip(near_density.par_iter_mut())
        .enumerate()
        .for_each(|(i, (density, near_density))| {
            let pos = predicted[i];
            let mut sum = 0.0;
            let mut near_sum = 0.0;

            index.for_each_neighbor(pos, |j| {
                let dst_sq = (predicted[j] - pos).length_squared();
                if dst_sq >= h_sq {
                    return;
                }
                let dst = dst_sq.sqrt();
                sum += kernels.density(dst);
                near_sum += kernels.near_density(dst);
            });

            *density = sum;
            *near_density = near_sum;
        });
}
