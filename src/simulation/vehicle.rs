use super::{
    wrap_pi, ControlMode, GainUpdate, Gains, PidController, PidOutput, Point, SpawnPose, TrackModel,
    MIN_DT,
};
use crate::config::{DisturbanceParams, VehicleSpec, WallParams};
use rand::rngs::StdRng;
use rand::Rng;

/// Half-width, in samples, of the projection search around the cached index.
pub const SEARCH_WINDOW: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Disturbance {
    Idle,
    Disturbed { yaw_rate: f64, remaining: f64 },
}

impl Disturbance {
    pub fn yaw_rate(&self) -> f64 {
        match self {
            Disturbance::Idle => 0.0,
            Disturbance::Disturbed { yaw_rate, .. } => *yaw_rate,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Disturbance::Disturbed { .. })
    }
}

/// Values from the most recent tick, kept for telemetry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub cross_track_error: f64,
    pub active_gains: Gains,
    pub pid: PidOutput,
    pub wall_multiplier: f64,
    pub off_track: f64,
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    pub name: String,
    pub team: String,
    pub display_index: usize,

    pub wheelbase: f64,
    pub max_speed: f64,
    /// Radians.
    pub steer_limit: f64,
    /// Carried for pure-pursuit style control; the lateral law does not use it.
    pub lookahead: f64,
    pub tau_v: f64,
    /// Explicit spawn pose from the roster entry; `None` uses the track's spawn grid.
    pub fixed_spawn: Option<SpawnPose>,
    pub disturbance_params: DisturbanceParams,
    pub wall: WallParams,

    pub position: Point,
    pub heading: f64,
    pub steering: f64,
    pub speed: f64,
    pub track_index: usize,
    pub lap: u32,
    pub lap_time: f64,
    pub last_lap_time: Option<f64>,
    pub best_lap_time: Option<f64>,
    pub score: f64,
    pub disturbance: Disturbance,

    pid: PidController,
    rng: StdRng,
    last_step: StepReport,
}

impl Vehicle {
    pub fn new(id: VehicleId, spec: &VehicleSpec, spawn: SpawnPose, rng: StdRng) -> Self {
        let pid = PidController::new(spec.gains);
        let mut vehicle = Self {
            id,
            name: spec.name.clone(),
            team: spec.team.clone(),
            display_index: id.0,
            wheelbase: spec.wheelbase,
            max_speed: spec.max_speed,
            steer_limit: spec.steer_limit_deg.to_radians(),
            lookahead: spec.lookahead,
            tau_v: spec.tau_v,
            fixed_spawn: spec.spawn,
            disturbance_params: spec.disturbance,
            wall: spec.wall,
            position: Point::new(spawn.x, spawn.y),
            heading: spawn.heading,
            steering: 0.0,
            speed: 0.0,
            track_index: spawn.index,
            lap: 0,
            lap_time: 0.0,
            last_lap_time: None,
            best_lap_time: None,
            score: 0.0,
            disturbance: Disturbance::Idle,
            pid,
            rng,
            last_step: StepReport {
                cross_track_error: 0.0,
                active_gains: spec.gains,
                pid: PidOutput::default(),
                wall_multiplier: 1.0,
                off_track: 0.0,
            },
        };
        vehicle.reset(spawn);
        vehicle
    }

    /// Last explicitly tuned gains, independent of the operating mode.
    pub fn base_gains(&self) -> &Gains {
        self.pid.gains()
    }

    pub fn controller(&self) -> &PidController {
        &self.pid
    }

    pub fn last_step(&self) -> &StepReport {
        &self.last_step
    }

    /// Puts the vehicle back on `spawn`. Base gains, current speed and any running
    /// disturbance carry over.
    pub fn reset(&mut self, spawn: SpawnPose) {
        self.position = Point::new(spawn.x, spawn.y);
        self.heading = spawn.heading;
        self.steering = 0.0;
        self.track_index = spawn.index;
        self.lap = 0;
        self.lap_time = 0.0;
        self.last_lap_time = None;
        self.best_lap_time = None;
        self.score = 0.0;
        self.pid.reset();
        self.last_step.cross_track_error = 0.0;
        self.last_step.pid = PidOutput::default();
        self.last_step.wall_multiplier = 1.0;
        self.last_step.off_track = 0.0;
    }

    pub fn reset_controller(&mut self) {
        self.pid.reset();
    }

    /// Applies the provided fields and makes the result the new base gains.
    pub fn set_gains(&mut self, update: &GainUpdate) {
        let gains = update.apply(self.pid.gains());
        self.pid.set_gains(gains);
        log::debug!(
            "{}: gains kp={:.3} ki={:.4} kd={:.3} df={:.1}Hz aw={:.2}",
            self.name, gains.kp, gains.ki, gains.kd, gains.df_hz, gains.aw
        );
    }

    /// Physical tuning from the UI side; values are floored to stay drivable.
    pub fn set_limits(&mut self, max_speed: Option<f64>, lookahead: Option<f64>, steer_limit_deg: Option<f64>) {
        if let Some(v) = max_speed {
            self.max_speed = v.max(0.0);
        }
        if let Some(l) = lookahead {
            self.lookahead = l.max(0.1);
        }
        if let Some(deg) = steer_limit_deg {
            self.steer_limit = deg.max(0.1).to_radians();
        }
    }

    pub fn step(&mut self, dt: f64, track: &TrackModel, mode: ControlMode) -> StepReport {
        let projection = track.nearest_projection(self.position.x, self.position.y, self.track_index, SEARCH_WINDOW);
        let previous_index = self.track_index;
        self.track_index = projection.index;
        let error = projection.cross_track_error;

        self.lap_time += dt;
        self.update_lap(previous_index, track);

        let active_gains = self.pid.gains().for_mode(mode);
        let pid = self.pid.step_with(&active_gains, -error, dt, -self.steer_limit, self.steer_limit);
        self.steering = pid.output;

        self.update_disturbance(dt);

        let off_track = (error.abs() - track.lane_half_width()).max(0.0);
        let wall_multiplier = (1.0 - self.wall.k_wall * off_track)
            .min(1.0)
            .max(self.wall.v_min_ratio);
        let commanded_speed = self.max_speed * wall_multiplier;

        self.speed += (commanded_speed - self.speed) * (dt / self.tau_v.max(MIN_DT));

        let yaw_rate = (self.speed / self.wheelbase) * self.steering.tan() + self.disturbance.yaw_rate();
        self.heading = wrap_pi(self.heading + yaw_rate * dt);
        self.position.x += self.speed * self.heading.cos() * dt;
        self.position.y += self.speed * self.heading.sin() * dt;

        self.score += (error * error + 0.05 * self.steering * self.steering + 0.5 * off_track * off_track) * dt;

        self.last_step = StepReport {
            cross_track_error: error,
            active_gains,
            pid,
            wall_multiplier,
            off_track,
        };
        self.last_step
    }

    fn update_disturbance(&mut self, dt: f64) {
        if !self.disturbance.is_active() && self.rng.gen::<f64>() < self.disturbance_params.p_step {
            let sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            self.disturbance = Disturbance::Disturbed {
                yaw_rate: sign * self.disturbance_params.yaw_rate,
                remaining: self.disturbance_params.duration,
            };
            log::debug!(
                "{}: yaw disturbance {:+.3} rad/s for {:.2}s",
                self.name,
                sign * self.disturbance_params.yaw_rate,
                self.disturbance_params.duration
            );
        }

        if let Disturbance::Disturbed { yaw_rate, remaining } = self.disturbance {
            let remaining = remaining - dt;
            self.disturbance = if remaining > 0.0 {
                Disturbance::Disturbed { yaw_rate, remaining }
            } else {
                Disturbance::Idle
            };
        }
    }

    fn update_lap(&mut self, previous_index: usize, track: &TrackModel) {
        let n = track.len();
        if !track.is_closed() || n < 4 {
            return;
        }

        // Explicit spawn indices may point past the end of a resampled course
        let previous_index = previous_index % n;
        let quarter = n / 4;
        if previous_index >= n - quarter && self.track_index < quarter {
            self.lap += 1;
            self.last_lap_time = Some(self.lap_time);
            self.best_lap_time = Some(match self.best_lap_time {
                Some(best) => best.min(self.lap_time),
                None => self.lap_time,
            });
            log::debug!("{}: lap {} in {:.2}s", self.name, self.lap, self.lap_time);
            self.lap_time = 0.0;
        }
    }
}
