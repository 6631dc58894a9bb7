//! Basic demonstration of the swarm simulation core.
//!
//! Run with: cargo run --example basic_demo
//! Set RUST_LOG=swarm_sim=debug for per-pass spawn logs.

use swarm_sim::{CameraView, EnemyTypeConfig, Float3, Heightfield, SwarmConfig, SwarmDriver, SwarmError};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), SwarmError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("swarm_sim=info")))
        .init();

    println!("=== Swarm Arena - Simulation Demo ===\n");

    let mut config = SwarmConfig {
        count_log_interval: 1.0,
        enemy_types: vec![
            EnemyTypeConfig {
                radius: 40.0,
                speed: 650.0,
                ..Default::default()
            },
            EnemyTypeConfig {
                radius: 90.0,
                speed: 300.0,
                hp: 60.0,
                force_spawn_out_of_view: true,
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    config.spawn.auto_spawn_count = 1500;

    // Rolling hills under the arena
    let mut terrain = Heightfield::new(256, 256, 200.0);
    terrain.fill_with(|x, y| 120.0 * (x * 0.0007).sin() * (y * 0.0005).cos());

    let mut driver = SwarmDriver::new(config, terrain)?;
    let queued = driver.queue_auto_spawn();
    println!("Queued {queued} enemies for progressive spawn\n");

    let player = Float3::ZERO;
    let dt = 1.0 / 60.0;
    for frame in 0..600 {
        // Slow orbit so spawns land on every side of the player
        let angle = frame as f32 * dt * 0.3;
        let camera = CameraView::new(
            Float3::new(0.0, 0.0, 400.0),
            Float3::new(angle.cos(), angle.sin(), -0.1),
            90.0,
        );
        driver.frame(dt, camera, player);

        if (frame + 1) % 120 == 0 {
            let snap = driver.snapshot();
            println!(
                "--- Frame {} (t={:.1}s) --- alive={} pending={} visible={} instances={}",
                frame + 1,
                snap.time,
                snap.alive,
                snap.pending_total(),
                snap.visible,
                driver.batches().instance_total()
            );
        }

        if frame == 300 {
            println!("\n--- Volley and blast at the player's feet ---\n");
            for i in 0..32 {
                let a = i as f32 / 32.0 * std::f32::consts::TAU;
                driver.spawn_projectile(player, Float3::new(a.cos(), a.sin(), 0.0));
            }
            let report = driver.apply_radial_damage(player, 2500.0, 25.0);
            println!("Blast hit {} enemies, killed {}\n", report.hit, report.killed.len());
        }
    }

    println!("\n=== Final State (JSON) ===\n");
    println!("{}", driver.snapshot().to_json_pretty()?);

    driver.profiler().log_summary();
    Ok(())
}
