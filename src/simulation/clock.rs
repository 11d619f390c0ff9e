use super::{SimulationState, MIN_DT};

pub const DEFAULT_FIXED_DT: f64 = 1.0 / 120.0;
pub const DEFAULT_MAX_FRAME_DT: f64 = 0.05;

/// Fixed-timestep accumulator.
///
/// Frames arrive with whatever spacing the caller manages; physics always advances
/// in `fixed_dt` slices. Each frame is clamped to `max_frame_dt` so a stall does not
/// trigger a burst of catch-up ticks.
#[derive(Debug, Clone)]
pub struct SimulationClock {
    fixed_dt: f64,
    max_frame_dt: f64,
    time_scale: f64,
    accumulator: f64,
    paused: bool,
    total_ticks: u64,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(DEFAULT_FIXED_DT, DEFAULT_MAX_FRAME_DT)
    }
}

impl SimulationClock {
    pub fn new(fixed_dt: f64, max_frame_dt: f64) -> Self {
        Self {
            fixed_dt: fixed_dt.max(MIN_DT),
            max_frame_dt,
            time_scale: 1.0,
            accumulator: 0.0,
            paused: false,
            total_ticks: 0,
        }
    }

    pub fn fixed_dt(&self) -> f64 {
        self.fixed_dt
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        log::info!("Simulation {}", if self.paused { "paused" } else { "resumed" });
        self.paused
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale.max(0.0);
    }

    /// Feeds one frame of `frame_dt` seconds and runs every whole tick it covers.
    /// Returns the number of ticks executed.
    pub fn advance(&mut self, frame_dt: f64, state: &mut SimulationState) -> u32 {
        if self.paused || state.vehicles.is_empty() {
            return 0;
        }

        let frame_dt = (frame_dt * self.time_scale).max(0.0).min(self.max_frame_dt);
        self.accumulator += frame_dt;

        let mut ticks = 0;
        while self.accumulator >= self.fixed_dt {
            state.step(self.fixed_dt);
            self.accumulator -= self.fixed_dt;
            ticks += 1;
        }

        self.total_ticks += ticks as u64;
        ticks
    }
}
