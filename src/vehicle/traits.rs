//! Capability traits for the remote vehicle API

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by the remote vehicle API
///
/// The message text is whatever the remote side produced and is not
/// guaranteed to be stable across API versions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VehicleError {
    #[error("Vehicle unavailable: {0}")]
    Unavailable(String),

    #[error("Command rejected by vehicle: {0}")]
    Rejected(String),
}

/// Account credentials used once at startup to open the remote session
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One vehicle on the authenticated account
///
/// Every call either succeeds or returns an opaque [`VehicleError`]. The relay
/// never looks past success/failure.
#[async_trait]
pub trait Vehicle: Send + Sync {
    /// Human-readable name for logs
    fn display_name(&self) -> &str;

    async fn honk_horn(&self) -> Result<(), VehicleError>;

    async fn flash_lights(&self) -> Result<(), VehicleError>;

    async fn lock_doors(&self) -> Result<(), VehicleError>;

    async fn unlock_doors(&self) -> Result<(), VehicleError>;

    async fn start_charging(&self) -> Result<(), VehicleError>;

    async fn stop_charging(&self) -> Result<(), VehicleError>;

    async fn open_charge_port(&self) -> Result<(), VehicleError>;

    /// Set the charge limit in percent (1-100)
    async fn set_charge_limit(&self, percent: u8) -> Result<(), VehicleError>;

    async fn start_climate(&self) -> Result<(), VehicleError>;

    async fn stop_climate(&self) -> Result<(), VehicleError>;

    /// Set driver and passenger target temperatures in Celsius
    async fn set_temperature(&self, driver: f64, passenger: f64) -> Result<(), VehicleError>;
}

/// Factory for the remote session
#[async_trait]
pub trait VehicleConnector: Send + Sync {
    /// Authenticate and return the account's vehicles in a stable order
    async fn connect(&self, credentials: &Credentials) -> Result<Vec<Arc<dyn Vehicle>>>;

    /// Human-readable name for this connector
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_is_redacted() {
        let credentials = Credentials {
            client_id: "id".into(),
            client_secret: "top-secret".into(),
            username: "driver@example.com".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("driver@example.com"));
        assert!(!debug.contains("top-secret"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_vehicle_error_display() {
        let err = VehicleError::Unavailable("asleep".into());
        assert_eq!(err.to_string(), "Vehicle unavailable: asleep");
    }
}
