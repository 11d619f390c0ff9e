use anyhow::{Context, Result};

pub mod course;
pub mod vehicles;

pub use course::*;
pub use vehicles::*;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub track: TrackConfig,
    pub vehicles: VehiclesConfig,
}

impl SimulationConfig {
    pub fn load_from_files(track_path: &str, vehicles_path: &str) -> Result<Self> {
        let track_content = std::fs::read_to_string(track_path)
            .with_context(|| format!("reading track config {}", track_path))?;
        let vehicles_content = std::fs::read_to_string(vehicles_path)
            .with_context(|| format!("reading vehicles config {}", vehicles_path))?;

        Self::from_toml(&track_content, &vehicles_content)
    }

    pub fn from_toml(track_toml: &str, vehicles_toml: &str) -> Result<Self> {
        let track: TrackConfig = toml::from_str(track_toml).context("parsing track config")?;
        let vehicles: VehiclesConfig = toml::from_str(vehicles_toml).context("parsing vehicles config")?;

        // Validate configurations
        track.validate()?;
        vehicles.validate()?;

        Ok(SimulationConfig { track, vehicles })
    }
}

pub trait Validate {
    fn validate(&self) -> Result<()>;
}
