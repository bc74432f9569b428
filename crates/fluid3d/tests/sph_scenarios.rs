//! SPH stage scenarios
//!
//! Drives the SPH stages, alone and through full frames, on tiny particle sets.

use fluid3d::sph::{apply_external_forces, apply_pressure_forces, compute_densities, integrate};
use fluid3d::{
    kernels::SphKernels, FluidSimulation3D, InputState, ParticleBuffers, SimConfig, SpatialIndex,
    SpawnConfig, SpawnRegion, Vec3,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn index_for(config: &SimConfig, particles: &ParticleBuffers) -> SpatialIndex {
    SpatialIndex::new(
        config.domain_min(),
        config.bounds_size,
        config.sph.smoothing_radius,
        particles.len(),
    )
}

/// Velocity change of every particle caused by the pressure stage alone.
fn pressure_delta(config: &SimConfig, particles: &mut ParticleBuffers, dt: f32) -> Vec<Vec3> {
    let kernels = SphKernels::new(config.sph.smoothing_radius);
    let mut index = index_for(config, particles);
    index.build(particles);
    compute_densities(particles, &index, &kernels);

    let before = particles.velocity.clone();
    apply_pressure_forces(particles, &index, &kernels, &config.sph, dt);
    particles
        .velocity
        .iter()
        .zip(&before)
        .map(|(after, before)| *after - *before)
        .collect()
}

#[test]
fn test_square_of_four_particles() {
    let config = SimConfig {
        gravity: -10.0,
        ..Default::default()
    };
    let half_side = 0.25 * config.sph.smoothing_radius;
    let mut particles = ParticleBuffers::from_particles(
        vec![
            Vec3::new(-half_side, 0.0, -half_side),
            Vec3::new(half_side, 0.0, -half_side),
            Vec3::new(-half_side, 0.0, half_side),
            Vec3::new(half_side, 0.0, half_side),
        ],
        Vec3::ZERO,
    );

    apply_external_forces(&mut particles, &config, &InputState::default(), 0.01);
    for v in &particles.velocity {
        assert!((v.y + 0.1).abs() < 1e-6, "velocity after gravity: {:?}", v);
    }

    let delta = pressure_delta(&config, &mut particles, 0.01);

    let d0 = particles.density[0];
    assert!(d0 > 0.0);
    for d in &particles.density {
        assert!((d - d0).abs() < 1e-4 * d0, "densities differ: {:?}", particles.density);
    }

    let total: Vec3 = delta.iter().copied().sum();
    let magnitude: f32 = delta.iter().map(|d| d.length()).sum();
    assert!(magnitude > 0.0);
    assert!(total.length() < 1e-4 * magnitude, "net pressure impulse {:?}", total);
}

#[test]
fn test_single_particle_falls_and_bounces_on_floor() {
    let gravity = -10.0;
    let dt = 0.01;
    let config = SimConfig {
        gravity,
        collision_damping: 0.8,
        iterations_per_frame: 1,
        spawn: SpawnConfig {
            regions: vec![SpawnRegion {
                centre: Vec3::new(0.0, -0.9, 0.0),
                size: Vec3::splat(1e-3),
            }],
            density: 1.0,
            jitter: 0.0,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut sim = FluidSimulation3D::new(config).unwrap();
    assert_eq!(sim.particle_count(), 1);

    let mut bounced = false;
    for _ in 0..100 {
        let before = sim.velocities()[0].y;
        sim.step(dt);
        let after = sim.velocities()[0];
        if after.y > 0.0 {
            // Gravity acts first in the substep, then the floor reflects.
            let impact = before + gravity * dt;
            assert_eq!(sim.positions()[0].y, -1.0);
            assert!(
                (after.y + 0.8 * impact).abs() < 1e-4,
                "impact {} rebound {}",
                impact,
                after.y
            );
            bounced = true;
            break;
        }
        assert!(after.y <= 0.0);
    }
    assert!(bounced, "particle never reached the floor");
}

#[test]
fn test_integrate_reflects_at_floor() {
    let mut particles =
        ParticleBuffers::from_particles(vec![Vec3::new(0.0, -0.99, 0.0)], Vec3::new(0.0, -2.0, 0.0));

    integrate(&mut particles, Vec3::ONE, None, 0.8, 0.01);

    assert_eq!(particles.position[0].y, -1.0);
    assert!((particles.velocity[0].y - 1.6).abs() < 1e-6);
}

#[test]
fn test_pressure_conserves_momentum_in_random_cloud() {
    let config = SimConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let positions: Vec<Vec3> = (0..400)
        .map(|_| {
            Vec3::new(
                rng.gen_range(-0.2..0.2),
                rng.gen_range(-0.2..0.2),
                rng.gen_range(-0.2..0.2),
            )
        })
        .collect();
    let mut particles = ParticleBuffers::from_particles(positions, Vec3::ZERO);

    let delta = pressure_delta(&config, &mut particles, 1.0 / 180.0);

    let total: Vec3 = delta.iter().copied().sum();
    let magnitude: f32 = delta.iter().map(|d| d.length()).sum();
    assert!(magnitude > 0.0);
    assert!(
        total.length() < 1e-3 * magnitude,
        "net {:?} vs total magnitude {}",
        total,
        magnitude
    );
}

#[test]
fn test_particles_stay_inside_bounds() {
    let config = SimConfig {
        spawn: SpawnConfig {
            regions: vec![SpawnRegion {
                centre: Vec3::new(0.5, 0.5, 0.0),
                size: Vec3::splat(0.6),
            }],
            density: 1000.0,
            initial_velocity: Vec3::new(8.0, 6.0, -7.0),
            ..Default::default()
        },
        ..Default::default()
    };
    let half = config.half_bounds();
    let mut sim = FluidSimulation3D::new(config).unwrap();

    for _ in 0..30 {
        sim.step(1.0 / 60.0);
        for p in sim.positions() {
            assert!(p.is_finite());
            assert!(p.abs().cmple(half + 1e-5).all(), "escaped: {:?}", p);
        }
    }
}
