use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use super::Validate;
use crate::simulation::{ControlMode, Gains, SpawnPose, DEFAULT_FIXED_DT, DEFAULT_MAX_FRAME_DT};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VehiclesConfig {
    #[serde(default)]
    pub simulation: SimulationParams,
    #[serde(default)]
    pub random: RandomConfig,
    #[serde(default)]
    pub vehicles: Vec<VehicleSpec>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationParams {
    pub fixed_dt: f64,
    pub max_frame_dt: f64,
    pub mode: ControlMode,
    /// Simulated run length for the console runner, in seconds.
    pub duration: f64,
    /// Seconds between telemetry log lines.
    pub telemetry_interval: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            fixed_dt: DEFAULT_FIXED_DT,
            max_frame_dt: DEFAULT_MAX_FRAME_DT,
            mode: ControlMode::Pid,
            duration: 30.0,
            telemetry_interval: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RandomConfig {
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DisturbanceParams {
    /// Activation probability per tick.
    pub p_step: f64,
    /// Seconds.
    pub duration: f64,
    /// rad/s added to the yaw rate while active.
    pub yaw_rate: f64,
}

impl Default for DisturbanceParams {
    fn default() -> Self {
        Self {
            p_step: 1e-5,
            duration: 1.0,
            yaw_rate: 0.35,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WallParams {
    /// Speed floor as a fraction of max speed when far off the line.
    pub v_min_ratio: f64,
    /// Speed lost per meter outside the lane.
    pub k_wall: f64,
}

impl Default for WallParams {
    fn default() -> Self {
        Self {
            v_min_ratio: 0.15,
            k_wall: 0.8,
        }
    }
}

/// Everything needed to put one vehicle on the track. Missing fields take the defaults below.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VehicleSpec {
    pub name: String,
    pub team: String,
    pub wheelbase: f64,
    pub max_speed: f64,
    pub steer_limit_deg: f64,
    pub lookahead: f64,
    pub tau_v: f64,
    pub gains: Gains,
    pub disturbance: DisturbanceParams,
    pub wall: WallParams,
    pub spawn: Option<SpawnPose>,
}

impl Default for VehicleSpec {
    fn default() -> Self {
        Self {
            name: "car".to_string(),
            team: String::new(),
            wheelbase: 2.6,
            max_speed: 10.0,
            steer_limit_deg: 22.0,
            lookahead: 12.0,
            tau_v: 3.3,
            gains: Gains::default(),
            disturbance: DisturbanceParams::default(),
            wall: WallParams::default(),
            spawn: None,
        }
    }
}

impl VehicleSpec {
    /// Randomized vehicle for quick sessions without a roster.
    pub fn demo<R: Rng + ?Sized>(index: usize, rng: &mut R) -> Self {
        let unit = Uniform::new(0.0_f64, 1.0);
        let mut draw = |lo: f64, span: f64| lo + span * unit.sample(&mut *rng);

        let kp = draw(1.0, 3.0);
        let kd = draw(0.2, 1.6);
        let ki = if draw(0.0, 1.0) < 0.35 { draw(0.005, 0.03) } else { 0.0 };
        let df_hz = draw(8.0, 10.0);
        let aw = draw(0.4, 0.6);

        Self {
            name: format!("demo-{}", index),
            max_speed: draw(9.0, 5.0),
            lookahead: draw(10.0, 8.0),
            steer_limit_deg: draw(18.0, 10.0),
            gains: Gains { kp, ki, kd, df_hz, aw },
            ..Self::default()
        }
    }
}

impl Validate for VehiclesConfig {
    fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        if sim.fixed_dt <= 0.0 || !sim.fixed_dt.is_finite() {
            return Err(anyhow!("Fixed timestep must be positive"));
        }

        if !sim.max_frame_dt.is_finite() || sim.max_frame_dt < sim.fixed_dt {
            return Err(anyhow!(
                "Max frame dt ({}) must be finite and at least the fixed timestep ({})",
                sim.max_frame_dt, sim.fixed_dt
            ));
        }

        if sim.duration <= 0.0 || !sim.duration.is_finite() {
            return Err(anyhow!("Simulation duration must be positive and finite"));
        }

        if sim.telemetry_interval <= 0.0 || !sim.telemetry_interval.is_finite() {
            return Err(anyhow!("Telemetry interval must be positive and finite"));
        }

        for spec in &self.vehicles {
            spec.validate()?;
        }

        Ok(())
    }
}

impl Validate for VehicleSpec {
    fn validate(&self) -> Result<()> {
        let name = &self.name;

        if self.wheelbase <= 0.0 || !self.wheelbase.is_finite() {
            return Err(anyhow!("Wheelbase for '{}' must be positive", name));
        }

        if self.max_speed < 0.0 || !self.max_speed.is_finite() {
            return Err(anyhow!("Max speed for '{}' must be non-negative", name));
        }

        if self.steer_limit_deg <= 0.0 || self.steer_limit_deg >= 90.0 {
            return Err(anyhow!("Steering limit for '{}' must be in (0, 90) degrees", name));
        }

        if self.lookahead <= 0.0 {
            return Err(anyhow!("Lookahead for '{}' must be positive", name));
        }

        if self.tau_v <= 0.0 || !self.tau_v.is_finite() {
            return Err(anyhow!("Speed time constant for '{}' must be positive", name));
        }

        let g = &self.gains;
        if ![g.kp, g.ki, g.kd].iter().all(|k| k.is_finite()) {
            return Err(anyhow!("Gains for '{}' must be finite", name));
        }

        if g.df_hz <= 0.0 {
            return Err(anyhow!("Derivative cutoff for '{}' must be positive", name));
        }

        if g.aw < 0.0 {
            return Err(anyhow!("Anti-windup gain for '{}' must be non-negative", name));
        }

        let dist = &self.disturbance;
        if !(0.0..=1.0).contains(&dist.p_step) {
            return Err(anyhow!("Disturbance probability for '{}' must be in range [0, 1]", name));
        }

        if dist.duration < 0.0 || !dist.yaw_rate.is_finite() {
            return Err(anyhow!("Disturbance duration and yaw rate for '{}' must be sane", name));
        }

        let wall = &self.wall;
        if !(0.0..=1.0).contains(&wall.v_min_ratio) {
            return Err(anyhow!("Minimum speed ratio for '{}' must be in range [0, 1]", name));
        }

        if wall.k_wall < 0.0 {
            return Err(anyhow!("Wall gain for '{}' must be non-negative", name));
        }

        Ok(())
    }
}
