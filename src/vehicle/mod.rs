//! Remote vehicle collaborator
//!
//! This module handles:
//! - The capability interface the relay drives (`Vehicle`, `VehicleConnector`)
//! - Binding each command to its remote call (`Operation`)
//! - A simulated fleet for development without a real remote endpoint

mod operation;
mod simulated;
mod traits;

#[cfg(test)]
pub mod mock;

pub use operation::Operation;
pub use simulated::SimulatedConnector;
pub use traits::{Credentials, Vehicle, VehicleConnector, VehicleError};
