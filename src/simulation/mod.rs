use nalgebra::{Point2, Vector2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::VehicleSpec;
use crate::error::SimError;

pub mod track;
pub mod pid;
pub mod vehicle;
pub mod clock;
pub mod telemetry;

pub use track::*;
pub use pid::*;
pub use vehicle::*;
pub use clock::*;
pub use telemetry::*;

pub type Vec2 = Vector2<f64>;
pub type Point = Point2<f64>;

/// Which controller terms are live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum ControlMode {
    P,
    Pd,
    #[default]
    Pid,
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlMode::P => "P",
            ControlMode::Pd => "PD",
            ControlMode::Pid => "PID",
        };
        f.write_str(name)
    }
}

impl FromStr for ControlMode {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "P" => Ok(ControlMode::P),
            "PD" => Ok(ControlMode::Pd),
            "PID" => Ok(ControlMode::Pid),
            _ => Err(SimError::InvalidMode(s.to_string())),
        }
    }
}

impl TryFrom<String> for ControlMode {
    type Error = SimError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ControlMode> for String {
    fn from(mode: ControlMode) -> Self {
        mode.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SpawnPose {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    #[serde(default)]
    pub index: usize,
}

/// Wraps an angle into (-pi, pi].
pub fn wrap_pi(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

#[derive(Debug, Clone)]
pub struct SimulationState {
    pub track: Arc<TrackModel>,
    pub vehicles: Vec<Vehicle>,
    pub mode: ControlMode,
    pub time: f64,
    pub ticks: u64,
}

impl SimulationState {
    pub fn new(track: Arc<TrackModel>, mode: ControlMode) -> Self {
        Self {
            track,
            vehicles: Vec::new(),
            mode,
            time: 0.0,
            ticks: 0,
        }
    }

    /// Builds a fleet on `track`. With a seed, vehicle `i` draws from `seed + i`.
    pub fn from_specs(track: Arc<TrackModel>, specs: &[VehicleSpec], mode: ControlMode, seed: Option<u64>) -> Self {
        let mut state = Self::new(track, mode);
        let count = specs.len();

        for (i, spec) in specs.iter().enumerate() {
            let rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(i as u64)),
                None => StdRng::from_entropy(),
            };
            let spawn = spec.spawn.unwrap_or_else(|| state.track.spawn_pose(i, count));
            state.vehicles.push(Vehicle::new(VehicleId(i), spec, spawn, rng));
        }

        log::info!(
            "Fleet ready: {} vehicle(s) on a {:.1}m {} track, mode {}",
            count,
            state.track.total_length(),
            if state.track.is_closed() { "closed" } else { "open" },
            mode
        );
        state
    }

    /// Advances every vehicle by one fixed tick.
    pub fn step(&mut self, dt: f64) {
        for vehicle in &mut self.vehicles {
            vehicle.step(dt, &self.track, self.mode);
        }
        self.time += dt;
        self.ticks += 1;
    }

    /// Switching modes clears controller memory so the new law starts clean.
    pub fn set_mode(&mut self, mode: ControlMode) {
        if mode == self.mode {
            return;
        }
        log::info!("Control mode {} -> {}", self.mode, mode);
        self.mode = mode;
        for vehicle in &mut self.vehicles {
            vehicle.reset_controller();
        }
    }

    pub fn spawn_pose_for(&self, id: VehicleId) -> SpawnPose {
        self.vehicles
            .get(id.0)
            .and_then(|v| v.fixed_spawn)
            .unwrap_or_else(|| self.track.spawn_pose(id.0, self.vehicles.len()))
    }

    pub fn reset_all(&mut self) {
        for i in 0..self.vehicles.len() {
            let spawn = self.spawn_pose_for(VehicleId(i));
            self.vehicles[i].reset(spawn);
        }
        self.time = 0.0;
        self.ticks = 0;
        log::info!("Simulation reset");
    }

    /// Swaps in a new course and puts every vehicle back on its spawn pose.
    pub fn replace_track(&mut self, track: Arc<TrackModel>) {
        log::debug!("Replacing track: {} samples, {:.1}m", track.len(), track.total_length());
        self.track = track;
        self.reset_all();
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id.0)
    }

    pub fn vehicle_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(id.0)
    }

    pub fn apply_gains(&mut self, id: VehicleId, update: &GainUpdate) -> Result<(), SimError> {
        let vehicle = self.vehicle_mut(id).ok_or(SimError::UnknownVehicle(id))?;
        vehicle.set_gains(update);
        Ok(())
    }

    /// Vehicle ids ordered by score, best (lowest) first.
    pub fn ranking(&self) -> Vec<VehicleId> {
        let mut ids: Vec<_> = self.vehicles.iter().map(|v| (v.id, v.score)).collect();
        ids.sort_by(|a, b| a.1.total_cmp(&b.1));
        ids.into_iter().map(|(id, _)| id).collect()
    }

    pub fn telemetry(&self) -> Vec<VehicleTelemetry> {
        let ranking = self.ranking();
        self.vehicles
            .iter()
            .map(|vehicle| {
                let rank = ranking.iter().position(|id| *id == vehicle.id).map_or(0, |p| p + 1);
                VehicleTelemetry::capture(vehicle, rank)
            })
            .collect()
    }
}
