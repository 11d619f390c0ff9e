use serde::Serialize;
use super::{Gains, Vehicle};

/// Read-only per-vehicle snapshot handed to whatever displays the run.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleTelemetry {
    pub id: usize,
    pub name: String,
    pub team: String,
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub steering: f64,
    pub speed: f64,
    pub max_speed: f64,
    pub lap: u32,
    pub lap_time: f64,
    pub last_lap_time: Option<f64>,
    pub best_lap_time: Option<f64>,
    pub score: f64,
    pub rank: usize,
    pub active_gains: Gains,
    pub p_term: f64,
    pub i_term: f64,
    pub d_term: f64,
    pub disturbance_yaw_rate: f64,
    pub wall_multiplier: f64,
    pub off_track: f64,
    pub cross_track_error: f64,
    pub track_index: usize,
}

impl VehicleTelemetry {
    pub fn capture(vehicle: &Vehicle, rank: usize) -> Self {
        let last = vehicle.last_step();
        Self {
            id: vehicle.id.0,
            name: vehicle.name.clone(),
            team: vehicle.team.clone(),
            x: vehicle.position.x,
            y: vehicle.position.y,
            heading: vehicle.heading,
            steering: vehicle.steering,
            speed: vehicle.speed,
            max_speed: vehicle.max_speed,
            lap: vehicle.lap,
            lap_time: vehicle.lap_time,
            last_lap_time: vehicle.last_lap_time,
            best_lap_time: vehicle.best_lap_time,
            score: vehicle.score,
            rank,
            active_gains: last.active_gains,
            p_term: last.pid.p,
            i_term: last.pid.i,
            d_term: last.pid.d,
            disturbance_yaw_rate: vehicle.disturbance.yaw_rate(),
            wall_multiplier: last.wall_multiplier,
            off_track: last.off_track,
            cross_track_error: last.cross_track_error,
            track_index: vehicle.track_index,
        }
    }

    /// One-line summary for log output.
    pub fn summary(&self) -> String {
        format!(
            "#{} {} [rank {}] lap {} ({:.2}s) e={:+.3}m v={:.2}/{:.2}m/s delta={:+.2}deg score={:.2} mu={:.2} off={:.2} dist={:+.3}rad/s",
            self.id,
            self.name,
            self.rank,
            self.lap,
            self.lap_time,
            self.cross_track_error,
            self.speed,
            self.max_speed,
            self.steering.to_degrees(),
            self.score,
            self.wall_multiplier,
            self.off_track,
            self.disturbance_yaw_rate,
        )
    }
}
