use rand::rngs::StdRng;
use rand::SeedableRng;
use std::f64::consts::PI;
use track_pid_sim::config::{DisturbanceParams, VehicleSpec};
use track_pid_sim::simulation::{
    wrap_pi, ControlMode, Disturbance, GainUpdate, Gains, Point, SpawnPose, TrackModel, Vehicle, VehicleId,
};

const DT: f64 = 1.0 / 120.0;

fn square(side: f64, spacing: f64) -> Vec<Point> {
    let corners = [
        Point::new(0.0, 0.0),
        Point::new(side, 0.0),
        Point::new(side, side),
        Point::new(0.0, side),
    ];
    let per_side = (side / spacing).round() as usize;
    let mut points = Vec::new();
    for k in 0..4 {
        let a = corners[k];
        let b = corners[(k + 1) % 4];
        for j in 0..per_side {
            points.push(a + (b - a) * (j as f64 / per_side as f64));
        }
    }
    points
}

fn circle(radius: f64, n: usize) -> Vec<Point> {
    (0..n)
        .map(|i| {
            let a = 2.0 * PI * i as f64 / n as f64;
            Point::new(radius * a.cos(), radius * a.sin())
        })
        .collect()
}

fn straight_track() -> TrackModel {
    let points: Vec<Point> = (0..=300).map(|i| Point::new(i as f64, 0.0)).collect();
    TrackModel::new(&points, 2.0, false)
}

fn calm_spec(gains: Gains) -> VehicleSpec {
    VehicleSpec {
        gains,
        disturbance: DisturbanceParams { p_step: 0.0, ..DisturbanceParams::default() },
        ..VehicleSpec::default()
    }
}

fn spawn_vehicle(spec: &VehicleSpec, track: &TrackModel) -> Vehicle {
    Vehicle::new(VehicleId(0), spec, track.spawn_pose(0, 1), StdRng::seed_from_u64(7))
}

#[test]
fn test_heading_wrap_range() {
    let mut angle = -7.0 * PI;
    while angle <= 7.0 * PI {
        let wrapped = wrap_pi(angle);
        assert!(wrapped > -PI && wrapped <= PI, "wrap_pi({}) = {}", angle, wrapped);
        let turns = (angle - wrapped) / (2.0 * PI);
        assert!((turns - turns.round()).abs() < 1e-9, "wrap_pi({}) moved by {} turns", angle, turns);
        angle += 0.173;
    }

    assert_eq!(wrap_pi(PI), PI);
    assert_eq!(wrap_pi(-PI), PI);
    assert!((wrap_pi(3.0 * PI).abs() - PI).abs() < 1e-9);
    assert!((wrap_pi(0.5) - 0.5).abs() < 1e-15);
}

#[test]
fn test_speed_lag_reaches_95_percent() {
    let track = straight_track();
    let spec = calm_spec(Gains::default());
    let mut vehicle = spawn_vehicle(&spec, &track);

    let ticks = (3.0 * spec.tau_v / DT).ceil() as usize;
    for _ in 0..ticks {
        let report = vehicle.step(DT, &track, ControlMode::Pid);
        assert_eq!(report.off_track, 0.0);
        assert_eq!(report.wall_multiplier, 1.0);
    }

    assert!(vehicle.speed >= 0.95 * spec.max_speed, "speed {} after 3 tau", vehicle.speed);
    assert!(vehicle.speed < spec.max_speed);
}

#[test]
fn test_square_track_proportional_first_side() {
    // At 1 m/s the run ends on the first side; corners are covered by the damped test below
    let track = TrackModel::new(&square(10.0, 0.1), 2.0, true);
    let spec = VehicleSpec {
        max_speed: 1.0,
        ..calm_spec(Gains { kp: 1.0, ki: 0.0, kd: 0.0, df_hz: 10.0, aw: 0.5 })
    };
    let mut vehicle = spawn_vehicle(&spec, &track);
    assert_eq!(vehicle.position, Point::new(0.0, 0.0));

    for _ in 0..1000 {
        let report = vehicle.step(DT, &track, ControlMode::Pid);
        assert!(report.cross_track_error.abs() < 0.5, "error {}", report.cross_track_error);
    }
    assert!(vehicle.position.x > 5.0, "vehicle barely moved: {:?}", vehicle.position);
}

#[test]
fn test_square_track_corners_with_damping() {
    let track = TrackModel::new(&square(10.0, 0.1), 2.0, true);
    let spec = VehicleSpec {
        max_speed: 3.0,
        steer_limit_deg: 80.0,
        ..calm_spec(Gains { kp: 1.0, ki: 0.0, kd: 1.0, df_hz: 10.0, aw: 0.5 })
    };
    let mut vehicle = spawn_vehicle(&spec, &track);

    let mut worst: f64 = 0.0;
    for _ in 0..1000 {
        let report = vehicle.step(DT, &track, ControlMode::Pd);
        worst = worst.max(report.cross_track_error.abs());
    }

    // Past the first corner and still inside the lane
    assert!(vehicle.position.y > 2.0, "never turned the corner: {:?}", vehicle.position);
    assert!(worst < track.lane_half_width(), "left the lane: {}", worst);
}

#[test]
fn test_laps_counted_on_closed_track() {
    let track = TrackModel::new(&circle(30.0, 600), 2.0, true);
    let spec = VehicleSpec { tau_v: 0.5, ..calm_spec(Gains::default()) };
    let mut vehicle = spawn_vehicle(&spec, &track);

    for _ in 0..(60.0 / DT) as usize {
        let report = vehicle.step(DT, &track, ControlMode::Pd);
        assert!(report.cross_track_error.abs() < 0.5);
    }

    // 600 m at 10 m/s on a 188.5 m loop
    assert_eq!(vehicle.lap, 3);
    let last = vehicle.last_lap_time.expect("a completed lap");
    assert!(last > 17.0 && last < 21.0, "lap time {}", last);
    assert!(vehicle.best_lap_time.unwrap() <= last);
    assert!(vehicle.lap_time < last);
}

#[test]
fn test_spawn_index_past_end_does_not_count_lap() {
    let track = TrackModel::new(&circle(30.0, 600), 2.0, true);
    let start = track.sample(0);
    // Index recorded against a denser course than the one loaded
    let spawn = SpawnPose { x: start.position.x, y: start.position.y, heading: PI / 2.0, index: 1000 };
    let mut vehicle = Vehicle::new(VehicleId(0), &calm_spec(Gains::default()), spawn, StdRng::seed_from_u64(3));

    vehicle.step(DT, &track, ControlMode::Pid);
    assert_eq!(vehicle.track_index, 0);
    assert_eq!(vehicle.lap, 0);
    assert_eq!(vehicle.last_lap_time, None);
}

#[test]
fn test_no_laps_on_open_track() {
    let track = straight_track();
    let mut vehicle = spawn_vehicle(&calm_spec(Gains::default()), &track);
    for _ in 0..3000 {
        vehicle.step(DT, &track, ControlMode::Pid);
    }
    assert_eq!(vehicle.lap, 0);
    assert!((vehicle.lap_time - 3000.0 * DT).abs() < 1e-6);
}

#[test]
fn test_wall_penalty_and_score() {
    let track = straight_track();
    let spec = calm_spec(Gains::default());
    let spawn = SpawnPose { x: 50.0, y: 4.0, heading: 0.0, index: 50 };
    let mut vehicle = Vehicle::new(VehicleId(0), &spec, spawn, StdRng::seed_from_u64(1));

    let report = vehicle.step(DT, &track, ControlMode::Pid);
    assert!((report.cross_track_error - 4.0).abs() < 1e-12);
    assert!((report.off_track - 2.0).abs() < 1e-12);
    // 1 - 0.8 * 2 is below the floor
    assert_eq!(report.wall_multiplier, spec.wall.v_min_ratio);

    // Saturated right turn
    assert!((vehicle.steering + vehicle.steer_limit).abs() < 1e-12);

    let expected = (16.0 + 0.05 * vehicle.steer_limit.powi(2) + 0.5 * 4.0) * DT;
    assert!((vehicle.score - expected).abs() < 1e-12, "score {} != {}", vehicle.score, expected);

    let expected_speed = spec.max_speed * spec.wall.v_min_ratio * DT / spec.tau_v;
    assert!((vehicle.speed - expected_speed).abs() < 1e-12);
}

#[test]
fn test_centered_vehicle_scores_nothing() {
    let track = straight_track();
    let mut vehicle = spawn_vehicle(&calm_spec(Gains::default()), &track);
    for _ in 0..600 {
        vehicle.step(DT, &track, ControlMode::Pid);
    }
    assert!(vehicle.score.abs() < 1e-12);
    assert!(vehicle.position.y.abs() < 1e-12);
}

#[test]
fn test_disturbance_lifecycle() {
    let track = straight_track();
    let spec = VehicleSpec {
        disturbance: DisturbanceParams { p_step: 1.0, duration: 0.5, yaw_rate: 0.35 },
        ..VehicleSpec::default()
    };
    let mut vehicle = spawn_vehicle(&spec, &track);

    vehicle.step(DT, &track, ControlMode::Pid);
    match vehicle.disturbance {
        Disturbance::Disturbed { yaw_rate, remaining } => {
            assert_eq!(yaw_rate.abs(), 0.35);
            assert!((remaining - (0.5 - DT)).abs() < 1e-12);
        }
        Disturbance::Idle => panic!("certain disturbance did not trigger"),
    }

    // No new trials while one is running out
    vehicle.disturbance_params.p_step = 0.0;
    for _ in 0..30 {
        vehicle.step(DT, &track, ControlMode::Pid);
    }
    assert!(vehicle.disturbance.is_active());

    for _ in 0..40 {
        vehicle.step(DT, &track, ControlMode::Pid);
    }
    assert_eq!(vehicle.disturbance, Disturbance::Idle);
    assert_eq!(vehicle.disturbance.yaw_rate(), 0.0);
}

#[test]
fn test_zero_probability_never_disturbs() {
    let track = straight_track();
    let mut vehicle = spawn_vehicle(&calm_spec(Gains::default()), &track);
    for _ in 0..5000 {
        vehicle.step(DT, &track, ControlMode::Pid);
        assert!(!vehicle.disturbance.is_active());
    }
}

#[test]
fn test_disturbance_turns_uncontrolled_vehicle() {
    let track = straight_track();
    let spec = VehicleSpec {
        gains: Gains { kp: 0.0, ki: 0.0, kd: 0.0, df_hz: 10.0, aw: 0.5 },
        disturbance: DisturbanceParams { p_step: 1.0, duration: 10.0, yaw_rate: 0.35 },
        ..VehicleSpec::default()
    };
    let mut vehicle = spawn_vehicle(&spec, &track);
    for _ in 0..60 {
        vehicle.step(DT, &track, ControlMode::Pid);
    }
    let bias = vehicle.disturbance.yaw_rate();
    assert!((vehicle.heading - bias * 60.0 * DT).abs() < 1e-9);
}

#[test]
fn test_set_gains_survives_modes_and_reset() {
    let track = straight_track();
    let mut vehicle = spawn_vehicle(&calm_spec(Gains::default()), &track);

    vehicle.set_gains(&GainUpdate { ki: Some(0.2), kd: Some(1.1), ..GainUpdate::default() });
    let tuned = Gains { kp: 2.0, ki: 0.2, kd: 1.1, df_hz: 10.0, aw: 0.5 };
    assert_eq!(*vehicle.base_gains(), tuned);

    let report = vehicle.step(DT, &track, ControlMode::P);
    assert_eq!((report.active_gains.ki, report.active_gains.kd), (0.0, 0.0));
    assert_eq!(*vehicle.base_gains(), tuned);

    let report = vehicle.step(DT, &track, ControlMode::Pid);
    assert_eq!(report.active_gains, tuned);

    let spawn = track.spawn_pose(0, 1);
    vehicle.reset(spawn);
    assert_eq!(*vehicle.base_gains(), tuned);
    assert_eq!(vehicle.position, Point::new(spawn.x, spawn.y));
    assert_eq!((vehicle.lap, vehicle.lap_time, vehicle.score), (0, 0.0, 0.0));
    assert_eq!(vehicle.track_index, 0);
    assert_eq!(vehicle.controller().integral(), 0.0);
}

#[test]
fn test_reset_restores_spawn_after_driving() {
    let track = TrackModel::new(&circle(30.0, 600), 2.0, true);
    let mut vehicle = spawn_vehicle(&calm_spec(Gains::default()), &track);
    for _ in 0..2000 {
        vehicle.step(DT, &track, ControlMode::Pid);
    }
    assert!(vehicle.track_index > 0);

    vehicle.reset(track.spawn_pose(0, 1));
    assert_eq!(vehicle.position, track.sample(0).position);
    assert_eq!(vehicle.steering, 0.0);
    assert_eq!(vehicle.best_lap_time, None);
}

#[test]
fn test_reset_keeps_speed_and_disturbance() {
    let track = straight_track();
    let spec = VehicleSpec {
        disturbance: DisturbanceParams { p_step: 1.0, duration: 2.0, yaw_rate: 0.35 },
        ..VehicleSpec::default()
    };
    let mut vehicle = spawn_vehicle(&spec, &track);
    for _ in 0..60 {
        vehicle.step(DT, &track, ControlMode::Pid);
    }
    let speed = vehicle.speed;
    let disturbance = vehicle.disturbance;
    assert!(speed > 0.0);
    assert!(disturbance.is_active());

    vehicle.reset(track.spawn_pose(0, 1));
    assert_eq!(vehicle.speed, speed);
    assert_eq!(vehicle.disturbance, disturbance);
    assert_eq!(vehicle.position, Point::new(0.0, 0.0));

    // The carried disturbance runs out on its remaining time
    vehicle.disturbance_params.p_step = 0.0;
    for _ in 0..((2.0 / DT) as usize) {
        vehicle.step(DT, &track, ControlMode::Pid);
    }
    assert_eq!(vehicle.disturbance, Disturbance::Idle);
}

#[test]
fn test_lookahead_does_not_change_control() {
    let track = TrackModel::new(&circle(30.0, 600), 2.0, true);
    let short = VehicleSpec { lookahead: 2.0, ..calm_spec(Gains::default()) };
    let long = VehicleSpec { lookahead: 40.0, ..short.clone() };

    let mut a = spawn_vehicle(&short, &track);
    let mut b = spawn_vehicle(&long, &track);
    for _ in 0..1200 {
        a.step(DT, &track, ControlMode::Pid);
        b.step(DT, &track, ControlMode::Pid);
    }
    assert_eq!(a.position, b.position);
    assert_eq!(a.score, b.score);
}

#[test]
fn test_set_limits_floors() {
    let track = straight_track();
    let mut vehicle = spawn_vehicle(&calm_spec(Gains::default()), &track);

    vehicle.set_limits(Some(-3.0), Some(0.0), Some(0.0));
    assert_eq!(vehicle.max_speed, 0.0);
    assert_eq!(vehicle.lookahead, 0.1);
    assert!((vehicle.steer_limit - 0.1_f64.to_radians()).abs() < 1e-15);

    vehicle.set_limits(Some(12.0), None, Some(30.0));
    assert_eq!(vehicle.max_speed, 12.0);
    assert_eq!(vehicle.lookahead, 0.1);
    assert!((vehicle.steer_limit - 30.0_f64.to_radians()).abs() < 1e-15);
}

#[test]
fn test_degenerate_track_does_not_panic() {
    let track = TrackModel::new(&[Point::new(1.0, 1.0)], 2.0, true);
    let mut vehicle = spawn_vehicle(&calm_spec(Gains::default()), &track);
    for _ in 0..240 {
        let report = vehicle.step(DT, &track, ControlMode::Pid);
        assert_eq!(report.cross_track_error, 0.0);
    }
    assert_eq!(vehicle.steering, 0.0);
    assert!(vehicle.position.x.is_finite() && vehicle.position.y.is_finite());
}
