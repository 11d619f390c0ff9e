use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use track_pid_sim::{
    config::{SimulationConfig, VehicleSpec},
    simulation::{ControlMode, SimulationState, SEARCH_WINDOW},
};

fn load_config() -> SimulationConfig {
    SimulationConfig::load_from_files("track.toml", "vehicles.toml")
        .expect("Failed to load configuration")
}

fn benchmark_fleet_step(c: &mut Criterion) {
    let config = load_config();
    let track = Arc::new(config.track.track.build_model());
    let mut state = SimulationState::from_specs(track, &config.vehicles.vehicles, ControlMode::Pid, Some(42));
    let dt = config.vehicles.simulation.fixed_dt;

    // Get everyone up to speed first
    for _ in 0..600 {
        state.step(dt);
    }

    c.bench_function("fleet_step", |b| {
        b.iter(|| {
            state.step(black_box(dt));
        })
    });
}

fn benchmark_projection(c: &mut Criterion) {
    let config = load_config();
    let track = config.track.track.build_model();
    let target = track.sample(track.len() / 3).position;

    let mut group = c.benchmark_group("projection");
    group.bench_function("windowed", |b| {
        b.iter(|| track.nearest_projection(black_box(target.x), black_box(target.y + 1.0), track.len() / 3, SEARCH_WINDOW))
    });
    // Hint on the far side forces a full relock scan
    group.bench_function("relock", |b| {
        b.iter(|| track.nearest_projection(black_box(target.x), black_box(target.y + 1.0), 0, SEARCH_WINDOW))
    });
    group.finish();
}

fn benchmark_fleet_scaling(c: &mut Criterion) {
    let config = load_config();
    let track = Arc::new(config.track.track.build_model());
    let dt = config.vehicles.simulation.fixed_dt;

    let mut group = c.benchmark_group("fleet_scaling");

    for vehicle_count in [10, 50, 100, 200].iter() {
        let mut rng = StdRng::seed_from_u64(42);
        let specs: Vec<VehicleSpec> = (0..*vehicle_count).map(|i| VehicleSpec::demo(i, &mut rng)).collect();
        let mut state = SimulationState::from_specs(track.clone(), &specs, ControlMode::Pid, Some(42));

        group.bench_with_input(
            format!("{}_vehicles", vehicle_count),
            vehicle_count,
            |b, _vehicle_count| {
                b.iter(|| {
                    state.step(black_box(dt));
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_fleet_step,
    benchmark_projection,
    benchmark_fleet_scaling
);
criterion_main!(benches);
