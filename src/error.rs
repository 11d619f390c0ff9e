use thiserror::Error;
use crate::simulation::VehicleId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("no vehicle with id {0:?}")]
    UnknownVehicle(VehicleId),

    #[error("unknown control mode '{0}', expected P, PD or PID")]
    InvalidMode(String),
}
