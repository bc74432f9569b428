//! Deterministic initial particle layout.
//!
//! Each spawn region is filled with a regular lattice at the configured number
//! density, then every point is jittered by a seeded generator so repeated
//! resets produce identical layouts.

use glam::{UVec3, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{SimConfig, SpawnRegion};

/// Lattice points per axis for a region at `density` particles per unit volume.
pub fn lattice_counts(region: &SpawnRegion, density: f32) -> UVec3 {
    let per_length = density.cbrt();
    (region.size * per_length).round().max(Vec3::ONE).as_uvec3()
}

/// Spawn positions for every region, in region order.
pub fn spawn_positions(config: &SimConfig) -> Vec<Vec3> {
    let spawn = &config.spawn;
    let mut rng = ChaCha8Rng::seed_from_u64(spawn.seed);
    let half = config.half_bounds();

    let total: usize = spawn
        .regions
        .iter()
        .map(|region| {
            let c = lattice_counts(region, spawn.density);
            c.x as usize * c.y as usize * c.z as usize
        })
        .sum();
    let mut positions = Vec::with_capacity(total);

    for region in &spawn.regions {
        let counts = lattice_counts(region, spawn.density);
        let spacing = region.size / counts.as_vec3();
        let min = region.centre - region.size * 0.5;
        let jitter = spacing * spawn.jitter;

        for z in 0..counts.z {
            for y in 0..counts.y {
                for x in 0..counts.x {
                    let lattice = min + (UVec3::new(x, y, z).as_vec3() + 0.5) * spacing;
                    let offset = Vec3::new(
                        rng.gen_range(-0.5..0.5),
                        rng.gen_range(-0.5..0.5),
                        rng.gen_range(-0.5..0.5),
                    ) * jitter;
                    positions.push((lattice + offset).clamp(-half, half));
                }
            }
        }
    }

    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpawnConfig;

    fn config_with(region: SpawnRegion, density: f32) -> SimConfig {
        SimConfig {
            spawn: SpawnConfig {
                regions: vec![region],
                density,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_count_matches_density() {
        let config = config_with(
            SpawnRegion {
                centre: Vec3::ZERO,
                size: Vec3::splat(0.5),
            },
            1000.0,
        );
        // 10 per unit length -> 5 per axis
        assert_eq!(spawn_positions(&config).len(), 125);
    }

    #[test]
    fn test_spawn_is_deterministic() {
        let config = SimConfig::default();
        assert_eq!(spawn_positions(&config), spawn_positions(&config));
    }

    #[test]
    fn test_spawn_stays_in_bounds() {
        let config = config_with(
            SpawnRegion {
                centre: Vec3::new(0.9, 0.0, 0.0),
                size: Vec3::splat(0.5),
            },
            2000.0,
        );
        let half = config.half_bounds();
        for p in spawn_positions(&config) {
            assert!(p.abs().cmple(half).all(), "{:?} outside bounds", p);
        }
    }

    #[test]
    fn test_tiny_region_spawns_one() {
        let config = config_with(
            SpawnRegion {
                centre: Vec3::ZERO,
                size: Vec3::splat(1e-3),
            },
            1.0,
        );
        assert_eq!(spawn_positions(&config).len(), 1);
    }
}
