//! Simulated fleet for development
//!
//! Stands in for the remote API when no real endpoint is wired up. Each
//! vehicle keeps a little state so repeated commands log something sensible.
//! Like a real car it falls asleep when left alone: the first command after a
//! long idle period fails as unavailable and wakes it up.

use super::{Credentials, Vehicle, VehicleConnector, VehicleError};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use relay_shared::defaults;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{Duration, Instant};
use tracing::info;

/// Observable state of a simulated vehicle
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedState {
    pub locked: bool,
    pub charging: bool,
    pub charge_port_open: bool,
    pub charge_limit: u8,
    pub climate_on: bool,
    pub driver_temp: f64,
    pub passenger_temp: f64,
}

impl Default for SimulatedState {
    fn default() -> Self {
        Self {
            locked: true,
            charging: false,
            charge_port_open: false,
            charge_limit: 80,
            climate_on: false,
            driver_temp: 20.0,
            passenger_temp: 20.0,
        }
    }
}

impl fmt::Display for SimulatedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, port {}, limit {}%, climate {} at {:.1}/{:.1}C",
            if self.locked { "locked" } else { "unlocked" },
            if self.charging { "charging" } else { "not charging" },
            if self.charge_port_open { "open" } else { "closed" },
            self.charge_limit,
            if self.climate_on { "on" } else { "off" },
            self.driver_temp,
            self.passenger_temp
        )
    }
}

pub struct SimulatedVehicle {
    name: String,
    state: RwLock<SimulatedState>,
    last_active: Mutex<Instant>,
    sleep_after: Duration,
}

impl SimulatedVehicle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(SimulatedState::default()),
            last_active: Mutex::new(Instant::now()),
            sleep_after: Duration::from_millis(defaults::SIMULATED_SLEEP_AFTER_MS),
        }
    }

    /// Get a copy of the current state
    #[cfg(test)]
    pub async fn state(&self) -> SimulatedState {
        self.state.read().await.clone()
    }

    /// Record activity; fails once if the vehicle had fallen asleep
    async fn wake(&self) -> Result<(), VehicleError> {
        let mut last_active = self.last_active.lock().await;
        let now = Instant::now();
        let idle = now.duration_since(*last_active);
        *last_active = now;

        if idle >= self.sleep_after {
            let state = self.state.read().await;
            info!(
                "[SIM] {}: waking up after {:?} idle ({})",
                self.name, idle, *state
            );
            return Err(VehicleError::Unavailable(format!(
                "{} is asleep",
                self.name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Vehicle for SimulatedVehicle {
    fn display_name(&self) -> &str {
        &self.name
    }

    async fn honk_horn(&self) -> Result<(), VehicleError> {
        self.wake().await?;
        info!("[SIM] {}: honk", self.name);
        Ok(())
    }

    async fn flash_lights(&self) -> Result<(), VehicleError> {
        self.wake().await?;
        info!("[SIM] {}: flash", self.name);
        Ok(())
    }

    async fn lock_doors(&self) -> Result<(), VehicleError> {
        self.wake().await?;
        self.state.write().await.locked = true;
        info!("[SIM] {}: doors locked", self.name);
        Ok(())
    }

    async fn unlock_doors(&self) -> Result<(), VehicleError> {
        self.wake().await?;
        self.state.write().await.locked = false;
        info!("[SIM] {}: doors unlocked", self.name);
        Ok(())
    }

    async fn start_charging(&self) -> Result<(), VehicleError> {
        self.wake().await?;
        let mut state = self.state.write().await;
        if !state.charge_port_open {
            return Err(VehicleError::Rejected("charge port closed".into()));
        }
        state.charging = true;
        info!("[SIM] {}: charging started (limit {}%)", self.name, state.charge_limit);
        Ok(())
    }

    async fn stop_charging(&self) -> Result<(), VehicleError> {
        self.wake().await?;
        self.state.write().await.charging = false;
        info!("[SIM] {}: charging stopped", self.name);
        Ok(())
    }

    async fn open_charge_port(&self) -> Result<(), VehicleError> {
        self.wake().await?;
        self.state.write().await.charge_port_open = true;
        info!("[SIM] {}: charge port open", self.name);
        Ok(())
    }

    async fn set_charge_limit(&self, percent: u8) -> Result<(), VehicleError> {
        self.wake().await?;
        self.state.write().await.charge_limit = percent;
        info!("[SIM] {}: charge limit {}%", self.name, percent);
        Ok(())
    }

    async fn start_climate(&self) -> Result<(), VehicleError> {
        self.wake().await?;
        self.state.write().await.climate_on = true;
        info!("[SIM] {}: climate on", self.name);
        Ok(())
    }

    async fn stop_climate(&self) -> Result<(), VehicleError> {
        self.wake().await?;
        self.state.write().await.climate_on = false;
        info!("[SIM] {}: climate off", self.name);
        Ok(())
    }

    async fn set_temperature(&self, driver: f64, passenger: f64) -> Result<(), VehicleError> {
        self.wake().await?;
        let mut state = self.state.write().await;
        state.driver_temp = driver;
        state.passenger_temp = passenger;
        info!(
            "[SIM] {}: temperature driver={:.1}C passenger={:.1}C",
            self.name, driver, passenger
        );
        Ok(())
    }
}

/// Connector that "authenticates" locally and hands out simulated vehicles
pub struct SimulatedConnector {
    fleet_size: usize,
}

impl SimulatedConnector {
    pub fn new(fleet_size: usize) -> Self {
        Self { fleet_size }
    }
}

#[async_trait]
impl VehicleConnector for SimulatedConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Vec<Arc<dyn Vehicle>>> {
        if credentials.username.is_empty() || credentials.password.is_empty() {
            return Err(anyhow!("Missing username or password for remote session"));
        }

        info!(
            "[SIM] Session opened for {} ({} vehicles)",
            credentials.username, self.fleet_size
        );

        Ok((0..self.fleet_size)
            .map(|i| Arc::new(SimulatedVehicle::new(format!("sim-{}", i))) as Arc<dyn Vehicle>)
            .collect())
    }

    fn name(&self) -> &'static str {
        "Simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            username: "driver@example.com".into(),
            password: "pw".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_connect_returns_fleet() {
        let connector = SimulatedConnector::new(3);
        let vehicles = connector.connect(&credentials()).await.expect("connect failed");

        assert_eq!(vehicles.len(), 3);
        assert_eq!(vehicles[2].display_name(), "sim-2");
        assert_eq!(connector.name(), "Simulated");
    }

    #[tokio::test]
    async fn test_connect_requires_credentials() {
        let connector = SimulatedConnector::new(1);
        assert!(connector.connect(&Credentials::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_state_tracking() {
        let vehicle = SimulatedVehicle::new("sim-0");

        vehicle.unlock_doors().await.unwrap();
        vehicle.set_charge_limit(90).await.unwrap();
        vehicle.set_temperature(22.0, 22.0).await.unwrap();

        let state = vehicle.state().await;
        assert_eq!(
            state.to_string(),
            "unlocked, not charging, port closed, limit 90%, climate off at 22.0/22.0C"
        );
        assert!(!state.locked);
        assert_eq!(state.charge_limit, 90);
        assert_eq!(state.driver_temp, 22.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_vehicle_falls_asleep() {
        let vehicle = SimulatedVehicle::new("sim-0");
        vehicle.honk_horn().await.unwrap();

        tokio::time::advance(Duration::from_millis(defaults::SIMULATED_SLEEP_AFTER_MS)).await;

        assert!(matches!(
            vehicle.lock_doors().await,
            Err(VehicleError::Unavailable(_))
        ));
        // The failed call woke it up
        vehicle.lock_doors().await.unwrap();
        assert!(vehicle.state().await.locked);
    }

    #[tokio::test]
    async fn test_charging_needs_open_port() {
        let vehicle = SimulatedVehicle::new("sim-0");

        assert!(matches!(
            vehicle.start_charging().await,
            Err(VehicleError::Rejected(_))
        ));

        vehicle.open_charge_port().await.unwrap();
        vehicle.start_charging().await.unwrap();
        assert!(vehicle.state().await.charging);
    }
}
