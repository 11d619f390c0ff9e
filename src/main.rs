use anyhow::{bail, Result};
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::{Duration, Instant};

use track_pid_sim::{
    config::{SimulationConfig, VehicleSpec},
    simulation::{ControlMode, SimulationClock, SimulationState},
};

/// Frame cadence of the console loop.
const FRAME_DT: f64 = 1.0 / 60.0;

#[derive(Parser)]
#[command(name = "track-pid-sim")]
#[command(about = "Lateral PID control sandbox: vehicles tracking a planar course")]
struct Args {
    /// Track configuration file
    #[arg(short, long, default_value = "track.toml")]
    track: String,

    /// Vehicles configuration file
    #[arg(long, default_value = "vehicles.toml")]
    vehicles: String,

    /// Random seed for reproducible disturbances
    #[arg(short, long)]
    seed: Option<u64>,

    /// Controller mode: P, PD or PID
    #[arg(short, long)]
    mode: Option<ControlMode>,

    /// Simulated seconds to run (overrides the config)
    #[arg(short, long)]
    duration: Option<f64>,

    /// Replace the configured roster with this many randomized demo vehicles
    #[arg(long)]
    demo: Option<usize>,

    /// Run as fast as possible instead of in real time
    #[arg(long)]
    headless: bool,

    /// Simulation speed multiplier
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Enable verbose logging for detailed simulation progress
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();
    info!("Starting track PID simulator");

    let config = SimulationConfig::load_from_files(&args.track, &args.vehicles)?;
    let params = &config.vehicles.simulation;
    info!(
        "Loaded configuration: track '{}' ({} points), {} vehicle(s)",
        config.track.track.name,
        config.track.track.points.len(),
        config.vehicles.vehicles.len()
    );

    let seed = args.seed.or(config.vehicles.random.seed);
    let mode = args.mode.unwrap_or(params.mode);
    let duration = args.duration.unwrap_or(params.duration);

    let specs: Vec<VehicleSpec> = match args.demo {
        Some(count) => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            info!("Generating {} demo vehicle(s)", count);
            (0..count).map(|i| VehicleSpec::demo(i, &mut rng)).collect()
        }
        None => config.vehicles.vehicles.clone(),
    };

    if !(args.speed > 0.0 && args.speed.is_finite()) {
        bail!("Speed multiplier must be positive, got {}", args.speed);
    }

    if specs.is_empty() {
        bail!("No vehicles to simulate; add [[vehicles]] entries or pass --demo N");
    }

    let track = Arc::new(config.track.track.build_model());
    let mut state = SimulationState::from_specs(track, &specs, mode, seed);

    let mut clock = SimulationClock::new(params.fixed_dt, params.max_frame_dt);
    clock.set_time_scale(args.speed);

    info!("=== Simulation Configuration ===");
    info!("Mode: {}", mode);
    info!("Physics timestep: {:.4}s ({:.1} Hz)", clock.fixed_dt(), 1.0 / clock.fixed_dt());
    info!("Duration: {:.1}s simulated{}", duration, if args.headless { " (headless)" } else { "" });
    if let Some(seed) = seed {
        info!("Random Seed: {}", seed);
    }

    let started = Instant::now();
    let mut last_frame = Instant::now();
    let mut last_report = 0.0;

    while state.time < duration {
        let frame_start = Instant::now();
        let frame_dt = if args.headless {
            FRAME_DT
        } else {
            let dt = frame_start.duration_since(last_frame).as_secs_f64();
            last_frame = frame_start;
            dt
        };

        clock.advance(frame_dt, &mut state);

        if state.time - last_report >= params.telemetry_interval {
            last_report = state.time;
            info!("t={:.2}s ({} ticks)", state.time, clock.total_ticks());
            for telemetry in state.telemetry() {
                info!("  {}", telemetry.summary());
            }
        }

        if !args.headless {
            let target = Duration::from_secs_f64(FRAME_DT);
            let elapsed = frame_start.elapsed();
            if elapsed < target {
                std::thread::sleep(target - elapsed);
            }
        }
    }

    info!("Simulation completed!");
    info!("Wall time: {:.2}s, simulated: {:.2}s, ticks: {}", started.elapsed().as_secs_f64(), state.time, state.ticks);
    info!("Final ranking (lower score is better):");
    for (place, id) in state.ranking().into_iter().enumerate() {
        if let Some(vehicle) = state.vehicle(id) {
            info!(
                "  {}. {} score={:.3} laps={} best lap={}",
                place + 1,
                vehicle.name,
                vehicle.score,
                vehicle.lap,
                vehicle.best_lap_time.map_or("-".to_string(), |t| format!("{:.2}s", t))
            );
        }
    }

    Ok(())
}
