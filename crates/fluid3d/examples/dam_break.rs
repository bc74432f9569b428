//! Dam-break diagnostic: collapse a water column and print per-frame stats.
//!
//! Usage: `cargo run --release --example dam_break -- [sph|flip] [frames] [foam]`

use fluid3d::{FluidSimulation3D, SimConfig, SolverKind, SpawnConfig, SpawnRegion, Vec3};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let solver = match args.first().map(String::as_str) {
        Some("flip") => SolverKind::Flip,
        _ => SolverKind::Sph,
    };
    let frames: u32 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(240);
    let foam = args.iter().any(|a| a == "foam");

    let mut config = SimConfig {
        solver,
        spawn: SpawnConfig {
            regions: vec![SpawnRegion {
                centre: Vec3::new(-0.6, -0.2, 0.0),
                size: Vec3::new(0.7, 1.5, 1.8),
            }],
            ..Default::default()
        },
        ..Default::default()
    };
    config.foam.enabled = foam;

    let mut sim = match FluidSimulation3D::new(config) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            std::process::exit(1);
        }
    };

    println!("=== DAM BREAK ({:?}, {} particles) ===\n", solver, sim.particle_count());

    let dt = 1.0 / 60.0;
    let start = std::time::Instant::now();
    for frame in 0..frames {
        sim.step(dt);
        let stats = sim.stats();

        if frame % 20 == 0 || stats.has_non_finite() {
            println!(
                "Frame {:4}: max_speed={:7.3} ke={:9.3} density={:8.2} div={:8.4} foam={:6}",
                frame,
                stats.max_speed,
                stats.kinetic_energy,
                stats.mean_density,
                stats.max_divergence,
                stats.live_foam
            );
        }
        if stats.has_non_finite() {
            println!("\n!!! {} particles went non-finite, stopping", stats.non_finite);
            break;
        }
    }

    let elapsed = start.elapsed().as_secs_f32();
    println!(
        "\n{} frames in {:.2}s ({:.1} ms/frame)",
        frames,
        elapsed,
        1000.0 * elapsed / frames.max(1) as f32
    );
}
