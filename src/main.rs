use anyhow::Result;
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use transport_engine::engine::{scenario, Settings, TickContext};

#[derive(Parser)]
#[command(name = "transport_engine")]
#[command(about = "Deterministic transport & traffic simulation engine")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "1000")]
    ticks: u64,

    /// RNG seed; identical seeds reproduce identical runs
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Expected vehicle spawns per tick
    #[arg(long, default_value = "1.0")]
    spawn_rate: f32,

    /// Grid size of the demo city network
    #[arg(long, default_value = "4")]
    grid: usize,

    /// Use adaptive signal timing instead of fixed-time
    #[arg(long)]
    adaptive_signals: bool,

    /// Disable highway ramp metering
    #[arg(long)]
    no_ramp_metering: bool,

    /// Log a summary every N ticks
    #[arg(long, default_value = "100")]
    summary_every: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let settings = Settings {
        spawn_rate: cli.spawn_rate,
        adaptive_signals_enabled: cli.adaptive_signals,
        ramp_metering_enabled: !cli.no_ramp_metering,
        ..Settings::default()
    };

    info!(
        "running {} ticks on a {}x{} grid (seed {})",
        cli.ticks, cli.grid, cli.grid, cli.seed
    );

    let (mut system, _grid) =
        scenario::signalized_grid(cli.grid, 300.0, cli.adaptive_signals, settings)?;
    let mut rng = StdRng::seed_from_u64(cli.seed);

    let mut total_spawned = 0u64;
    let mut total_arrived = 0u64;
    let mut total_failed_routes = 0u64;
    let mut total_failed_spawns = 0u64;

    for tick in 0..cli.ticks {
        let mut ctx = TickContext::new(tick, &mut rng);
        let delta = system.tick(&mut ctx)?;

        total_spawned += delta.spawned as u64;
        total_arrived += delta.throughput as u64;
        total_failed_routes += delta.failed_routes as u64;
        total_failed_spawns += delta.failed_spawns as u64;

        if cli.summary_every > 0 && (tick + 1) % cli.summary_every == 0 {
            info!(
                "tick {:>6}: active={:<4} waiting={:<4} avg_speed={:>5.1} m/s congestion={:.3} congested_segments={}",
                delta.tick,
                delta.active_vehicles,
                delta.waiting_vehicles,
                delta.average_speed,
                delta.congestion_index,
                delta.congested_segments.len()
            );
        }
    }

    info!("=== SIMULATION COMPLETE ===");
    info!("Total vehicles spawned: {total_spawned}");
    info!("Total vehicles arrived: {total_arrived}");
    info!("Failed spawns: {total_failed_spawns}");
    info!("Failed routes: {total_failed_routes}");
    info!(
        "Success rate: {:.1}%",
        if total_spawned > 0 {
            total_arrived as f64 / total_spawned as f64 * 100.0
        } else {
            0.0
        }
    );
    Ok(())
}
