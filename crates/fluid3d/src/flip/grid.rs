//! 3D MAC (Marker-and-Cell) staggered grid.

use std::sync::atomic::{AtomicU32, Ordering};

use glam::{IVec3, UVec3, Vec3};
use rayon::prelude::*;

use super::accumulator::AtomicAccumulator;
use crate::constants::RESOLUTION_TOLERANCE;
use crate::error::{ConfigError, Result};
use crate::kernels::tent;
use crate::obstacle::Obstacle;

/// Cell classification for the pressure solve.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum CellType {
    /// Obstacle (no flow)
    Solid,
    /// Contains fluid particles
    Fluid,
    /// Empty air
    #[default]
    Air,
}

/// MAC grid with staggered velocities over the domain box.
///
/// Velocity components are indexed by axis (0 = u, 1 = v, 2 = w) and stored
/// on cell faces:
/// - u on YZ faces at x = i * dx, size (width+1) * height * depth
/// - v on XZ faces at y = j * dx, size width * (height+1) * depth
/// - w on XY faces at z = k * dx, size width * height * (depth+1)
///
/// Pressure, divergence, cell type and particle counts live at cell centers.
/// All coordinates are relative to `origin`, the lower domain corner.
#[derive(Debug)]
pub struct MacGrid {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub cell_size: f32,
    pub origin: Vec3,

    /// Face velocities per axis
    pub velocity: [Vec<f32>; 3],
    /// Face velocities right after normalization, before forces and projection
    pub velocity_pre_pressure: [Vec<f32>; 3],
    /// P2G accumulated `velocity * weight` per axis
    pub(crate) momentum: [Vec<AtomicAccumulator>; 3],
    /// P2G accumulated weight per axis
    pub(crate) weight: [Vec<AtomicAccumulator>; 3],

    pub pressure: Vec<f32>,
    pub(crate) pressure_scratch: Vec<f32>,
    pub divergence: Vec<f32>,
    pub cell_type: Vec<CellType>,
    /// Particles per cell from the last mark pass
    pub particle_count: Vec<AtomicU32>,
    /// Cells whose centre lies inside the obstacle
    pub(crate) obstacle_solid: Vec<bool>,
}

impl MacGrid {
    /// Grid covering `[origin, origin + size]` with cubic cells.
    ///
    /// Resolution is `ceil(size / cell_size)` per axis, ignoring float noise
    /// in the quotient.
    pub fn new(origin: Vec3, size: Vec3, cell_size: f32, obstacle: Option<&Obstacle>) -> Result<Self> {
        let res = (size / cell_size - RESOLUTION_TOLERANCE).ceil();
        if !res.is_finite() || res.min_element() < 1.0 {
            let r = res.max(Vec3::ZERO).as_uvec3();
            return Err(ConfigError::EmptyGrid(r.x, r.y, r.z));
        }
        let res = res.as_uvec3();
        let (width, height, depth) = (res.x as usize, res.y as usize, res.z as usize);
        let cell_count = width * height * depth;
        let face_counts = [
            (width + 1) * height * depth,
            width * (height + 1) * depth,
            width * height * (depth + 1),
        ];

        let mut grid = Self {
            width,
            height,
            depth,
            cell_size,
            origin,
            velocity: face_counts.map(|n| vec![0.0; n]),
            velocity_pre_pressure: face_counts.map(|n| vec![0.0; n]),
            momentum: face_counts.map(|n| (0..n).map(|_| AtomicAccumulator::new()).collect()),
            weight: face_counts.map(|n| (0..n).map(|_| AtomicAccumulator::new()).collect()),
            pressure: vec![0.0; cell_count],
            pressure_scratch: vec![0.0; cell_count],
            divergence: vec![0.0; cell_count],
            cell_type: vec![CellType::Air; cell_count],
            particle_count: (0..cell_count).map(|_| AtomicU32::new(0)).collect(),
            obstacle_solid: vec![false; cell_count],
        };

        if let Some(obstacle) = obstacle {
            grid.rasterize_obstacle(obstacle);
        }

        Ok(grid)
    }

    fn rasterize_obstacle(&mut self, obstacle: &Obstacle) {
        let (width, height) = (self.width, self.height);
        let origin = self.origin;
        let dx = self.cell_size;
        self.obstacle_solid
            .par_iter_mut()
            .enumerate()
            .for_each(|(idx, solid)| {
                let i = idx % width;
                let j = (idx / width) % height;
                let k = idx / (width * height);
                let centre = origin + (Vec3::new(i as f32, j as f32, k as f32) + 0.5) * dx;
                *solid = obstacle.signed_distance(centre) < 0.0;
            });
    }

    pub fn resolution(&self) -> UVec3 {
        UVec3::new(self.width as u32, self.height as u32, self.depth as u32)
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height * self.depth
    }

    // ========== Index functions ==========

    /// Index into cell-centered arrays.
    #[inline]
    pub fn cell_index(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.width * (j + self.height * k)
    }

    /// Cell coordinates of a cell-centered index.
    #[inline]
    pub fn cell_coords(&self, idx: usize) -> (usize, usize, usize) {
        (
            idx % self.width,
            (idx / self.width) % self.height,
            idx / (self.width * self.height),
        )
    }

    /// Dimensions of the face array for one axis.
    #[inline]
    pub fn face_dims(&self, axis: usize) -> (usize, usize, usize) {
        match axis {
            0 => (self.width + 1, self.height, self.depth),
            1 => (self.width, self.height + 1, self.depth),
            _ => (self.width, self.height, self.depth + 1),
        }
    }

    /// Index into the face array of one axis.
    #[inline]
    pub fn face_index(&self, axis: usize, i: usize, j: usize, k: usize) -> usize {
        let (fw, fh, _) = self.face_dims(axis);
        i + fw * (j + fh * k)
    }

    /// Face coordinates of a face-array index.
    #[inline]
    pub fn face_coords(&self, axis: usize, idx: usize) -> (usize, usize, usize) {
        let (fw, fh, _) = self.face_dims(axis);
        (idx % fw, (idx / fw) % fh, idx / (fw * fh))
    }

    /// Offset of the face nodes of `axis` from the cell corner, in cells.
    #[inline]
    pub fn face_offset(axis: usize) -> Vec3 {
        let mut offset = Vec3::splat(0.5);
        offset[axis] = 0.0;
        offset
    }

    /// World position of a face node.
    #[inline]
    pub fn face_position(&self, axis: usize, i: usize, j: usize, k: usize) -> Vec3 {
        self.origin
            + (Vec3::new(i as f32, j as f32, k as f32) + Self::face_offset(axis)) * self.cell_size
    }

    /// Cell containing a world position, clamped into the grid.
    #[inline]
    pub fn cell_of(&self, position: Vec3) -> usize {
        let cell = ((position - self.origin) / self.cell_size).floor();
        let cell = if cell.is_finite() { cell } else { Vec3::ZERO };
        let max = IVec3::new(self.width as i32, self.height as i32, self.depth as i32) - 1;
        let c = cell.as_ivec3().clamp(IVec3::ZERO, max);
        self.cell_index(c.x as usize, c.y as usize, c.z as usize)
    }

    /// Whether the cell at signed coordinates is solid. Out of range is not.
    #[inline]
    pub fn is_solid(&self, i: i64, j: i64, k: i64) -> bool {
        if i < 0 || j < 0 || k < 0 {
            return false;
        }
        let (i, j, k) = (i as usize, j as usize, k as usize);
        if i >= self.width || j >= self.height || k >= self.depth {
            return false;
        }
        self.cell_type[self.cell_index(i, j, k)] == CellType::Solid
    }

    /// Cell type at signed coordinates, or `None` outside the grid.
    #[inline]
    pub fn cell_type_at(&self, i: i64, j: i64, k: i64) -> Option<CellType> {
        if i < 0 || j < 0 || k < 0 {
            return None;
        }
        let (i, j, k) = (i as usize, j as usize, k as usize);
        if i >= self.width || j >= self.height || k >= self.depth {
            return None;
        }
        Some(self.cell_type[self.cell_index(i, j, k)])
    }

    /// The two cells a face separates: (cell below along `axis`, cell above).
    #[inline]
    pub fn face_cells(axis: usize, i: usize, j: usize, k: usize) -> ([i64; 3], [i64; 3]) {
        let upper = [i as i64, j as i64, k as i64];
        let mut lower = upper;
        lower[axis] -= 1;
        (lower, upper)
    }

    /// Visit the 8 tent-weighted face nodes of `axis` around a world position.
    ///
    /// Nodes outside the face array are skipped, so the visited weights sum to
    /// less than 1 near the domain edge.
    #[inline]
    pub fn for_each_face_node<F: FnMut(usize, f32)>(&self, axis: usize, position: Vec3, mut visit: F) {
        let g = (position - self.origin) / self.cell_size - Self::face_offset(axis);
        let base = g.floor();
        let frac = g - base;
        if !base.is_finite() {
            return;
        }
        let base = base.as_ivec3();
        let (fw, fh, fd) = self.face_dims(axis);

        for dk in 0..2 {
            let nk = base.z + dk;
            if nk < 0 || nk >= fd as i32 {
                continue;
            }
            let wz = tent(frac.z - dk as f32);
            for dj in 0..2 {
                let nj = base.y + dj;
                if nj < 0 || nj >= fh as i32 {
                    continue;
                }
                let wy = tent(frac.y - dj as f32);
                for di in 0..2 {
                    let ni = base.x + di;
                    if ni < 0 || ni >= fw as i32 {
                        continue;
                    }
                    let w = tent(frac.x - di as f32) * wy * wz;
                    visit(self.face_index(axis, ni as usize, nj as usize, nk as usize), w);
                }
            }
        }
    }

    /// Trilinear sample of one component, normalized by the in-range weight.
    #[inline]
    pub fn sample_axis(&self, field: &[f32], axis: usize, position: Vec3) -> f32 {
        let mut sum = 0.0;
        let mut weight_sum = 0.0;
        self.for_each_face_node(axis, position, |idx, w| {
            sum += field[idx] * w;
            weight_sum += w;
        });
        if weight_sum > crate::constants::WEIGHT_EPSILON {
            sum / weight_sum
        } else {
            0.0
        }
    }

    /// Trilinear sample of the post-projection velocity.
    pub fn sample_velocity(&self, position: Vec3) -> Vec3 {
        Vec3::new(
            self.sample_axis(&self.velocity[0], 0, position),
            self.sample_axis(&self.velocity[1], 1, position),
            self.sample_axis(&self.velocity[2], 2, position),
        )
    }

    // ========== Reset/clear ==========

    /// Zero accumulators, counts and scalar fields for a new substep.
    pub fn clear(&mut self) {
        for axis in 0..3 {
            self.momentum[axis].par_iter().for_each(AtomicAccumulator::reset);
            self.weight[axis].par_iter().for_each(AtomicAccumulator::reset);
        }
        self.particle_count
            .par_iter()
            .for_each(|count| count.store(0, Ordering::Relaxed));
        self.pressure.fill(0.0);
        self.pressure_scratch.fill(0.0);
        self.divergence.fill(0.0);
    }

    /// Store current velocities as pre-pressure (for the FLIP delta).
    pub fn store_pre_pressure_velocities(&mut self) {
        for axis in 0..3 {
            self.velocity_pre_pressure[axis].copy_from_slice(&self.velocity[axis]);
        }
    }

    /// Number of fluid cells.
    pub fn fluid_cell_count(&self) -> usize {
        self.cell_type.iter().filter(|&&t| t == CellType::Fluid).count()
    }
}
