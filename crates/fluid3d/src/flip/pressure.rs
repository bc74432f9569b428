//! Pressure projection for 3D incompressible flow.
//!
//! Uses Jacobi iteration with a 6-neighbor stencil, a fixed iteration budget
//! and double-buffered pressure so every cell of an iteration is independent.

use std::sync::atomic::Ordering;

use rayon::prelude::*;

use super::grid::{CellType, MacGrid};

/// Zero the wall-normal velocity on domain faces and on faces touching a
/// solid cell (free slip). With `open_top` the top faces only lose their
/// upward component.
pub fn enforce_boundary(grid: &mut MacGrid, open_top: bool) {
    for axis in 0..3 {
        let mut field = std::mem::take(&mut grid.velocity[axis]);
        {
            let grid = &*grid;
            let cells_along = [grid.width, grid.height, grid.depth][axis];
            field.par_iter_mut().enumerate().for_each(|(idx, v)| {
                let (i, j, k) = grid.face_coords(axis, idx);
                let c = [i, j, k][axis];
                if c == 0 {
                    *v = 0.0;
                } else if c == cells_along {
                    *v = if axis == 1 && open_top { v.min(0.0) } else { 0.0 };
                } else {
                    let (lower, upper) = MacGrid::face_cells(axis, i, j, k);
                    if grid.is_solid(lower[0], lower[1], lower[2])
                        || grid.is_solid(upper[0], upper[1], upper[2])
                    {
                        *v = 0.0;
                    }
                }
            });
        }
        grid.velocity[axis] = field;
    }
}

/// Compute divergence of the velocity field in fluid cells.
///
/// Cells holding more than `target_per_cell` particles get an extra negative
/// divergence of `density_correction * (count / target - 1)`, which makes the
/// solve push particles out of over-full cells.
pub fn compute_divergence(grid: &mut MacGrid, density_correction: f32, target_per_cell: f32) {
    let mut divergence = std::mem::take(&mut grid.divergence);
    {
        let grid = &*grid;
        let scale = 1.0 / grid.cell_size;
        let [u, v, w] = &grid.velocity;

        divergence.par_iter_mut().enumerate().for_each(|(idx, div)| {
            if grid.cell_type[idx] != CellType::Fluid {
                *div = 0.0;
                return;
            }
            let (i, j, k) = grid.cell_coords(idx);

            let du = u[grid.face_index(0, i + 1, j, k)] - u[grid.face_index(0, i, j, k)];
            let dv = v[grid.face_index(1, i, j + 1, k)] - v[grid.face_index(1, i, j, k)];
            let dw = w[grid.face_index(2, i, j, k + 1)] - w[grid.face_index(2, i, j, k)];
            let mut value = scale * (du + dv + dw);

            let count = grid.particle_count[idx].load(Ordering::Relaxed) as f32;
            if density_correction > 0.0 && count > target_per_cell {
                value -= density_correction * (count / target_per_cell - 1.0);
            }
            *div = value;
        });
    }
    grid.divergence = divergence;
}

/// One Jacobi sweep from `grid.pressure` into the scratch buffer, then swap.
///
/// `p = (sum of non-solid neighbors - dx^2 * div) / count`. Air neighbors hold
/// zero pressure, out-of-domain neighbors are walls and are not counted.
pub fn jacobi_iteration(grid: &mut MacGrid) {
    let mut next = std::mem::take(&mut grid.pressure_scratch);
    {
        let grid = &*grid;
        let dx2 = grid.cell_size * grid.cell_size;
        let pressure = &grid.pressure;

        next.par_iter_mut().enumerate().for_each(|(idx, p)| {
            if grid.cell_type[idx] != CellType::Fluid {
                *p = 0.0;
                return;
            }
            let (i, j, k) = grid.cell_coords(idx);
            let (i, j, k) = (i as i64, j as i64, k as i64);

            let mut sum = 0.0;
            let mut count = 0u32;
            for (ni, nj, nk) in [
                (i - 1, j, k),
                (i + 1, j, k),
                (i, j - 1, k),
                (i, j + 1, k),
                (i, j, k - 1),
                (i, j, k + 1),
            ] {
                match grid.cell_type_at(ni, nj, nk) {
                    None | Some(CellType::Solid) => {}
                    Some(_) => {
                        sum += pressure[grid.cell_index(ni as usize, nj as usize, nk as usize)];
                        count += 1;
                    }
                }
            }

            *p = if count > 0 {
                (sum - dx2 * grid.divergence[idx]) / count as f32
            } else {
                0.0
            };
        });
    }
    grid.pressure_scratch = std::mem::replace(&mut grid.pressure, next);
}

/// Solve the pressure Poisson equation with a fixed number of Jacobi sweeps.
pub fn solve_pressure_jacobi(grid: &mut MacGrid, iterations: u32) {
    for _ in 0..iterations {
        jacobi_iteration(grid);
    }
}

/// Subtract the pressure gradient from faces adjacent to fluid.
///
/// `u -= (p_upper - p_lower) / dx`; faces touching a solid cell are zeroed.
/// Domain faces are left for the boundary pass.
pub fn apply_pressure_gradient(grid: &mut MacGrid) {
    for axis in 0..3 {
        let mut field = std::mem::take(&mut grid.velocity[axis]);
        {
            let grid = &*grid;
            let scale = 1.0 / grid.cell_size;
            let cells_along = [grid.width, grid.height, grid.depth][axis];

            field.par_iter_mut().enumerate().for_each(|(idx, v)| {
                let (i, j, k) = grid.face_coords(axis, idx);
                let c = [i, j, k][axis];
                if c == 0 || c == cells_along {
                    return;
                }
                let (lower, upper) = MacGrid::face_cells(axis, i, j, k);
                let lower_idx = grid.cell_index(lower[0] as usize, lower[1] as usize, lower[2] as usize);
                let upper_idx = grid.cell_index(i, j, k);
                let (lower_type, upper_type) = (grid.cell_type[lower_idx], grid.cell_type[upper_idx]);

                if lower_type == CellType::Solid || upper_type == CellType::Solid {
                    *v = 0.0;
                } else if lower_type == CellType::Fluid || upper_type == CellType::Fluid {
                    *v -= (grid.pressure[upper_idx] - grid.pressure[lower_idx]) * scale;
                }
            });
        }
        grid.velocity[axis] = field;
    }
}

/// L2 norm of the divergence over fluid cells.
pub fn divergence_l2(grid: &MacGrid) -> f32 {
    grid.divergence
        .par_iter()
        .map(|d| d * d)
        .sum::<f32>()
        .sqrt()
}

/// Largest absolute divergence over fluid cells.
pub fn max_abs_divergence(grid: &MacGrid) -> f32 {
    grid.divergence
        .par_iter()
        .map(|d| d.abs())
        .reduce(|| 0.0, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn grid(n: f32) -> MacGrid {
        MacGrid::new(Vec3::ZERO, Vec3::splat(n), 1.0, None).unwrap()
    }

    #[test]
    fn test_divergence_zero_velocity() {
        let mut grid = grid(4.0);
        grid.cell_type.fill(CellType::Fluid);
        compute_divergence(&mut grid, 0.0, 8.0);
        assert!(grid.divergence.iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_divergence_includes_w_component() {
        let mut grid = grid(4.0);
        let centre = grid.cell_index(2, 2, 2);
        grid.cell_type[centre] = CellType::Fluid;
        let front = grid.face_index(2, 2, 2, 3);
        grid.velocity[2][front] = 1.0;

        compute_divergence(&mut grid, 0.0, 8.0);
        assert!((grid.divergence[centre] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_density_correction_only_when_overfull() {
        let mut grid = grid(4.0);
        let a = grid.cell_index(1, 1, 1);
        let b = grid.cell_index(2, 2, 2);
        grid.cell_type[a] = CellType::Fluid;
        grid.cell_type[b] = CellType::Fluid;
        grid.particle_count[a].store(16, Ordering::Relaxed);
        grid.particle_count[b].store(4, Ordering::Relaxed);

        compute_divergence(&mut grid, 0.5, 8.0);
        assert!((grid.divergence[a] + 0.5).abs() < 1e-6);
        assert_eq!(grid.divergence[b], 0.0);
    }

    #[test]
    fn test_boundary_zeroes_walls_and_clamps_open_top() {
        let mut grid = grid(4.0);
        for field in &mut grid.velocity {
            field.fill(1.0);
        }
        enforce_boundary(&mut grid, true);

        assert_eq!(grid.velocity[0][grid.face_index(0, 0, 1, 1)], 0.0);
        assert_eq!(grid.velocity[0][grid.face_index(0, 4, 1, 1)], 0.0);
        assert_eq!(grid.velocity[1][grid.face_index(1, 1, 0, 1)], 0.0);
        // Upward flow through the open top is removed.
        assert_eq!(grid.velocity[1][grid.face_index(1, 1, 4, 1)], 0.0);
        assert_eq!(grid.velocity[0][grid.face_index(0, 2, 1, 1)], 1.0);

        for field in &mut grid.velocity {
            field.fill(-1.0);
        }
        enforce_boundary(&mut grid, true);
        assert_eq!(grid.velocity[1][grid.face_index(1, 1, 4, 1)], -1.0);
        enforce_boundary(&mut grid, false);
        assert_eq!(grid.velocity[1][grid.face_index(1, 1, 4, 1)], 0.0);
    }

    #[test]
    fn test_faces_touching_solid_zeroed() {
        let mut grid = grid(4.0);
        let solid = grid.cell_index(2, 2, 2);
        grid.cell_type[solid] = CellType::Solid;
        grid.velocity[0].fill(1.0);
        enforce_boundary(&mut grid, false);
        assert_eq!(grid.velocity[0][grid.face_index(0, 2, 2, 2)], 0.0);
        assert_eq!(grid.velocity[0][grid.face_index(0, 3, 2, 2)], 0.0);
        assert_eq!(grid.velocity[0][grid.face_index(0, 2, 1, 2)], 1.0);
    }

    #[test]
    fn test_single_fluid_cell_projected() {
        // One fluid cell in air with outflow on one face.
        let mut grid = grid(5.0);
        let centre = grid.cell_index(2, 2, 2);
        grid.cell_type[centre] = CellType::Fluid;
        let right = grid.face_index(0, 3, 2, 2);
        grid.velocity[0][right] = 1.0;

        compute_divergence(&mut grid, 0.0, 8.0);
        solve_pressure_jacobi(&mut grid, 1);
        apply_pressure_gradient(&mut grid);
        compute_divergence(&mut grid, 0.0, 8.0);

        // D = 6 with air neighbors: one sweep is exact.
        assert!(grid.divergence[centre].abs() < 1e-6);
        assert!(grid.pressure[centre] < 0.0);
    }
}
