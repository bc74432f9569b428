//! Uniform-grid spatial index built with a parallel counting sort.
//!
//! Build phases, each a full parallel pass:
//! 1. Hash: linear cell index of every predicted position
//! 2. Count: atomic per-cell histogram; the pre-increment value is the rank
//! 3. Scan: hierarchical exclusive prefix sum into `cell_start`
//! 4. Scatter: destination = `cell_start[cell] + rank`, no further atomics
//! 5. Reorder: gather every particle field into scratch buffers
//! 6. Copy-back: scratch buffers become the primary buffers
//!
//! After a build, the particles of cell `c` occupy the contiguous range
//! `cell_start[c]..cell_start[c + 1]`.

pub mod prefix_sum;

use std::sync::atomic::{AtomicU32, Ordering};

use glam::{IVec3, UVec3, Vec3};
use rayon::prelude::*;

use crate::constants::RESOLUTION_TOLERANCE;
use crate::particle::ParticleBuffers;

pub use prefix_sum::{exclusive_scan, exclusive_scan_blocked};

/// Cells per axis, `ceil(domain_size / cell_size)` and at least 1, as floats
/// so callers can range-check before converting.
pub fn grid_resolution(domain_size: Vec3, cell_size: f32) -> Vec3 {
    (domain_size / cell_size - RESOLUTION_TOLERANCE)
        .ceil()
        .max(Vec3::ONE)
}

/// Counting-sort spatial index over a fixed axis-aligned domain.
#[derive(Debug)]
pub struct SpatialIndex {
    domain_min: Vec3,
    cell_size: f32,
    inv_cell_size: f32,
    resolution: UVec3,

    /// Linear cell index per particle, in pre-sort order
    cell_keys: Vec<u32>,
    /// Position of each particle among the particles sharing its cell
    ranks: Vec<u32>,
    /// Histogram with one sentinel bucket at `total_cells`
    counts: Vec<AtomicU32>,
    /// Exclusive prefix sum of `counts`; length `total_cells + 1`
    cell_start: Vec<u32>,
    /// Scatter target, indexed by sorted slot, holding the source particle
    slots: Vec<AtomicU32>,
    /// Sorted slot -> source particle index of the last build
    order: Vec<u32>,
}

impl SpatialIndex {
    /// Create an index covering `[domain_min, domain_min + domain_size]`.
    ///
    /// Resolution is `ceil(domain_size / cell_size)` per axis, at least 1.
    pub fn new(domain_min: Vec3, domain_size: Vec3, cell_size: f32, particle_count: usize) -> Self {
        let resolution = grid_resolution(domain_size, cell_size).as_uvec3();
        let total_cells = resolution.x as usize * resolution.y as usize * resolution.z as usize;

        Self {
            domain_min,
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            resolution,
            cell_keys: vec![0; particle_count],
            ranks: vec![0; particle_count],
            counts: (0..=total_cells).map(|_| AtomicU32::new(0)).collect(),
            cell_start: vec![0; total_cells + 1],
            slots: (0..particle_count).map(|_| AtomicU32::new(0)).collect(),
            order: (0..particle_count as u32).collect(),
        }
    }

    pub fn resolution(&self) -> UVec3 {
        self.resolution
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn domain_min(&self) -> Vec3 {
        self.domain_min
    }

    /// Number of cells, excluding the sentinel.
    pub fn total_cells(&self) -> usize {
        self.cell_start.len() - 1
    }

    /// Start table of the last build; `cell_start()[total_cells()]` is the particle count.
    pub fn cell_start(&self) -> &[u32] {
        &self.cell_start
    }

    /// Sorted slot -> pre-sort particle index of the last build.
    pub fn order(&self) -> &[u32] {
        &self.order
    }

    /// Sorted particle range of one cell.
    #[inline]
    pub fn cell_range(&self, cell: usize) -> std::ops::Range<usize> {
        self.cell_start[cell] as usize..self.cell_start[cell + 1] as usize
    }

    /// Integer cell coordinates, clamped into the grid.
    #[inline]
    pub fn cell_coords(&self, position: Vec3) -> IVec3 {
        let cell = ((position - self.domain_min) * self.inv_cell_size).floor();
        // Non-finite positions land in cell 0 rather than an arbitrary cast.
        let cell = if cell.is_finite() { cell } else { Vec3::ZERO };
        cell.as_ivec3()
            .clamp(IVec3::ZERO, self.resolution.as_ivec3() - IVec3::ONE)
    }

    /// Collision-free linear index `x + nx * (y + ny * z)`.
    #[inline]
    pub fn linear_index(&self, cell: IVec3) -> usize {
        let res = self.resolution;
        (cell.x as u32 + res.x * (cell.y as u32 + res.y * cell.z as u32)) as usize
    }

    /// Linear cell index of a world position.
    #[inline]
    pub fn cell_of(&self, position: Vec3) -> usize {
        self.linear_index(self.cell_coords(position))
    }

    /// Rebuild the index from `particles.predicted` and reorder every
    /// particle field into cell order.
    pub fn build(&mut self, particles: &mut ParticleBuffers) {
        let n = particles.len();
        if self.cell_keys.len() != n {
            self.resize(n);
        }

        self.compute_keys(&particles.predicted);
        self.count_cells();
        self.scan_counts();
        self.scatter();
        self.canonicalize_order();
        self.gather(particles);
        particles.copy_back_sorted();

        log::trace!(
            "spatial index: {} particles in {} cells",
            n,
            self.total_cells()
        );
    }

    fn resize(&mut self, particle_count: usize) {
        self.cell_keys.resize(particle_count, 0);
        self.ranks.resize(particle_count, 0);
        self.slots = (0..particle_count).map(|_| AtomicU32::new(0)).collect();
        self.order = (0..particle_count as u32).collect();
    }

    /// Phase 1: hash.
    fn compute_keys(&mut self, predicted: &[Vec3]) {
        let index = &*self;
        let keys: Vec<u32> = predicted
            .par_iter()
            .map(|&p| index.cell_of(p) as u32)
            .collect();
        self.cell_keys = keys;
    }

    /// Phase 2: clear and count, recording each particle's rank.
    fn count_cells(&mut self) {
        self.counts
            .par_iter()
            .for_each(|count| count.store(0, Ordering::Relaxed));

        let counts = &self.counts;
        self.ranks
            .par_iter_mut()
            .zip(self.cell_keys.par_iter())
            .for_each(|(rank, &key)| {
                *rank = counts[key as usize].fetch_add(1, Ordering::Relaxed);
            });
    }

    /// Phase 3: exclusive prefix sum of the histogram.
    fn scan_counts(&mut self) {
        self.cell_start
            .par_iter_mut()
            .zip(self.counts.par_iter())
            .for_each(|(start, count)| *start = count.load(Ordering::Relaxed));
        exclusive_scan(&mut self.cell_start);
    }

    /// Phase 4: contention-free scatter of particle indices to their slots.
    fn scatter(&mut self) {
        let cell_start = &self.cell_start;
        let slots = &self.slots;
        self.cell_keys
            .par_iter()
            .zip(self.ranks.par_iter())
            .enumerate()
            .for_each(|(i, (&key, &rank))| {
                let destination = cell_start[key as usize] + rank;
                slots[destination as usize].store(i as u32, Ordering::Relaxed);
            });

        self.order
            .par_iter_mut()
            .zip(self.slots.par_iter())
            .for_each(|(source, slot)| *source = slot.load(Ordering::Relaxed));
    }

    /// Ranks come from racing atomics, so the order inside a cell depends on
    /// thread interleaving. Sorting each cell's run by source index makes the
    /// permutation a stable counting sort and the build deterministic.
    fn canonicalize_order(&mut self) {
        let keys = &self.cell_keys;
        self.order
            .par_chunk_by_mut(|&a, &b| keys[a as usize] == keys[b as usize])
            .for_each(|run| run.sort_unstable());
    }

    /// Phase 5: gather into scratch. Writes are sequential, reads are random.
    fn gather(&self, particles: &mut ParticleBuffers) {
        let order = &self.order;
        let ParticleBuffers {
            position,
            predicted,
            velocity,
            sorted_position,
            sorted_predicted,
            sorted_velocity,
            ..
        } = particles;
        let (position, predicted, velocity) = (&*position, &*predicted, &*velocity);

        sorted_position
            .par_iter_mut()
            .zip(sorted_predicted.par_iter_mut())
            .zip(sorted_velocity.par_iter_mut())
            .zip(order.par_iter())
            .for_each(|(((pos, pred), vel), &source)| {
                let source = source as usize;
                *pos = position[source];
                *pred = predicted[source];
                *vel = velocity[source];
            });
    }

    /// Visit every sorted particle index in the 3x3x3 block around `position`.
    ///
    /// The three cells of each x-row are contiguous in index space, so each
    /// row is a single `cell_start` range lookup.
    #[inline]
    pub fn for_each_neighbor<F: FnMut(usize)>(&self, position: Vec3, mut visit: F) {
        let centre = self.cell_coords(position);
        let max = self.resolution.as_ivec3() - IVec3::ONE;
        let x_min = (centre.x - 1).max(0);
        let x_max = (centre.x + 1).min(max.x);

        for z in (centre.z - 1).max(0)..=(centre.z + 1).min(max.z) {
            for y in (centre.y - 1).max(0)..=(centre.y + 1).min(max.y) {
                let first = self.linear_index(IVec3::new(x_min, y, z));
                let last = self.linear_index(IVec3::new(x_max, y, z));
                let start = self.cell_start[first] as usize;
                let end = self.cell_start[last + 1] as usize;
                for j in start..end {
                    visit(j);
                }
            }
        }
    }

    /// Same block as `for_each_neighbor`, visited one cell at a time.
    pub fn for_each_neighbor_by_cell<F: FnMut(usize)>(&self, position: Vec3, mut visit: F) {
        let centre = self.cell_coords(position);
        let max = self.resolution.as_ivec3() - IVec3::ONE;
        for z in (centre.z - 1).max(0)..=(centre.z + 1).min(max.z) {
            for y in (centre.y - 1).max(0)..=(centre.y + 1).min(max.y) {
                for x in (centre.x - 1).max(0)..=(centre.x + 1).min(max.x) {
                    for j in self.cell_range(self.linear_index(IVec3::new(x, y, z))) {
                        visit(j);
                    }
                }
            }
        }
    }
}
