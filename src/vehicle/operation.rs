//! Remote operations bound to their arguments

use super::{Vehicle, VehicleError};
use std::fmt;

/// A single remote call, ready to be applied to any vehicle
///
/// Arguments are already validated and unit-converted when an `Operation`
/// is built, so applying it is a plain call into the remote API.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    HonkHorn,
    FlashLights,
    LockDoors,
    UnlockDoors,
    StartCharging,
    StopCharging,
    OpenChargePort,
    SetChargeLimit(u8),
    StartClimate,
    StopClimate,
    /// Target temperature in Celsius, applied to both driver and passenger
    SetTemperature(f64),
}

impl Operation {
    /// Perform this operation against a vehicle
    pub async fn apply(&self, vehicle: &dyn Vehicle) -> Result<(), VehicleError> {
        match *self {
            Operation::HonkHorn => vehicle.honk_horn().await,
            Operation::FlashLights => vehicle.flash_lights().await,
            Operation::LockDoors => vehicle.lock_doors().await,
            Operation::UnlockDoors => vehicle.unlock_doors().await,
            Operation::StartCharging => vehicle.start_charging().await,
            Operation::StopCharging => vehicle.stop_charging().await,
            Operation::OpenChargePort => vehicle.open_charge_port().await,
            Operation::SetChargeLimit(percent) => vehicle.set_charge_limit(percent).await,
            Operation::StartClimate => vehicle.start_climate().await,
            Operation::StopClimate => vehicle.stop_climate().await,
            Operation::SetTemperature(celsius) => vehicle.set_temperature(celsius, celsius).await,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::HonkHorn => write!(f, "honk horn"),
            Operation::FlashLights => write!(f, "flash lights"),
            Operation::LockDoors => write!(f, "lock doors"),
            Operation::UnlockDoors => write!(f, "unlock doors"),
            Operation::StartCharging => write!(f, "start charging"),
            Operation::StopCharging => write!(f, "stop charging"),
            Operation::OpenChargePort => write!(f, "open charge port"),
            Operation::SetChargeLimit(percent) => write!(f, "set charge limit to {}%", percent),
            Operation::StartClimate => write!(f, "start climate"),
            Operation::StopClimate => write!(f, "stop climate"),
            Operation::SetTemperature(celsius) => write!(f, "set temperature to {:.1}C", celsius),
        }
    }
}
