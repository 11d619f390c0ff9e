use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use super::ControlMode;

/// Smallest dt used as a denominator.
pub const MIN_DT: f64 = 1e-6;

/// Below this the integral gain is treated as zero for anti-windup.
const KI_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Gains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Derivative low-pass cutoff in Hz.
    pub df_hz: f64,
    /// Back-calculation anti-windup gain.
    pub aw: f64,
}

impl Default for Gains {
    fn default() -> Self {
        Self {
            kp: 2.0,
            ki: 0.0,
            kd: 0.8,
            df_hz: 10.0,
            aw: 0.5,
        }
    }
}

impl Gains {
    /// Gains actually applied under `mode`. The filter cutoff and anti-windup gain carry over.
    pub fn for_mode(&self, mode: ControlMode) -> Gains {
        match mode {
            ControlMode::P => Gains { ki: 0.0, kd: 0.0, ..*self },
            ControlMode::Pd => Gains { ki: 0.0, ..*self },
            ControlMode::Pid => *self,
        }
    }
}

/// Partial gain change; `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct GainUpdate {
    pub kp: Option<f64>,
    pub ki: Option<f64>,
    pub kd: Option<f64>,
    pub df_hz: Option<f64>,
    pub aw: Option<f64>,
}

impl GainUpdate {
    pub fn apply(&self, gains: &Gains) -> Gains {
        Gains {
            kp: self.kp.unwrap_or(gains.kp),
            ki: self.ki.unwrap_or(gains.ki),
            kd: self.kd.unwrap_or(gains.kd),
            df_hz: self.df_hz.unwrap_or(gains.df_hz),
            aw: self.aw.unwrap_or(gains.aw),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PidOutput {
    /// Clamped controller output.
    pub output: f64,
    pub p: f64,
    pub i: f64,
    pub d: f64,
}

/// Discrete PID with a one-pole filtered derivative and back-calculation anti-windup.
#[derive(Debug, Clone)]
pub struct PidController {
    gains: Gains,
    integral: f64,
    d_state: f64,
    prev_error: Option<f64>,
}

impl PidController {
    pub fn new(gains: Gains) -> Self {
        Self {
            gains,
            integral: 0.0,
            d_state: 0.0,
            prev_error: None,
        }
    }

    pub fn gains(&self) -> &Gains {
        &self.gains
    }

    pub fn set_gains(&mut self, gains: Gains) {
        self.gains = gains;
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn filtered_derivative(&self) -> f64 {
        self.d_state
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.d_state = 0.0;
        self.prev_error = None;
    }

    pub fn step(&mut self, error: f64, dt: f64, out_min: f64, out_max: f64) -> PidOutput {
        let gains = self.gains;
        self.step_with(&gains, error, dt, out_min, out_max)
    }

    /// One controller update using `gains` instead of the stored ones.
    ///
    /// The integral is accumulated before saturation; when the output clamps, the
    /// integral is pulled back by `aw * (clamped - raw) / ki` so it cannot run away
    /// while the output is pinned at a limit.
    pub fn step_with(&mut self, gains: &Gains, error: f64, dt: f64, out_min: f64, out_max: f64) -> PidOutput {
        let raw_derivative = match self.prev_error {
            Some(prev) => (error - prev) / dt.max(MIN_DT),
            None => 0.0,
        };
        self.prev_error = Some(error);

        let alpha = if gains.df_hz > 0.0 {
            1.0 - (-2.0 * PI * gains.df_hz * dt).exp()
        } else {
            0.0
        };
        self.d_state += alpha * (raw_derivative - self.d_state);

        let p = gains.kp * error;
        let d = gains.kd * self.d_state;

        self.integral += error * dt;
        let raw = p + gains.ki * self.integral + d;
        let output = raw.max(out_min).min(out_max);

        if gains.ki > KI_EPSILON && gains.aw.is_finite() && gains.aw > 0.0 {
            self.integral += gains.aw * (output - raw) / gains.ki;
        }

        PidOutput {
            output,
            p,
            i: gains.ki * self.integral,
            d,
        }
    }
}
