//! Scripted vehicle double for tests
//!
//! Records every call with the (tokio) instant it happened and fails the
//! first `n` calls when asked to.

use super::{Vehicle, VehicleError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// A call observed by [`MockVehicle`]
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
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
    SetTemperature(f64, f64),
}

pub struct MockVehicle {
    name: String,
    failures_left: AtomicU32,
    log: Mutex<Vec<(MockCall, Instant)>>,
}

impl MockVehicle {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            failures_left: AtomicU32::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next `n` calls, then succeed
    pub fn failing(name: &str, n: u32) -> Self {
        let vehicle = Self::new(name);
        vehicle.failures_left.store(n, Ordering::SeqCst);
        vehicle
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.log.lock().unwrap().iter().map(|(call, _)| call.clone()).collect()
    }

    pub fn call_instants(&self) -> Vec<Instant> {
        self.log.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }

    fn record(&self, call: MockCall) -> Result<(), VehicleError> {
        self.log.lock().unwrap().push((call, Instant::now()));

        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(VehicleError::Unavailable(format!(
                "{} is asleep ({} failures left)",
                self.name,
                remaining - 1
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Vehicle for MockVehicle {
    fn display_name(&self) -> &str {
        &self.name
    }

    async fn honk_horn(&self) -> Result<(), VehicleError> {
        self.record(MockCall::HonkHorn)
    }

    async fn flash_lights(&self) -> Result<(), VehicleError> {
        self.record(MockCall::FlashLights)
    }

    async fn lock_doors(&self) -> Result<(), VehicleError> {
        self.record(MockCall::LockDoors)
    }

    async fn unlock_doors(&self) -> Result<(), VehicleError> {
        self.record(MockCall::UnlockDoors)
    }

    async fn start_charging(&self) -> Result<(), VehicleError> {
        self.record(MockCall::StartCharging)
    }

    async fn stop_charging(&self) -> Result<(), VehicleError> {
        self.record(MockCall::StopCharging)
    }

    async fn open_charge_port(&self) -> Result<(), VehicleError> {
        self.record(MockCall::OpenChargePort)
    }

    async fn set_charge_limit(&self, percent: u8) -> Result<(), VehicleError> {
        self.record(MockCall::SetChargeLimit(percent))
    }

    async fn start_climate(&self) -> Result<(), VehicleError> {
        self.record(MockCall::StartClimate)
    }

    async fn stop_climate(&self) -> Result<(), VehicleError> {
        self.record(MockCall::StopClimate)
    }

    async fn set_temperature(&self, driver: f64, passenger: f64) -> Result<(), VehicleError> {
        self.record(MockCall::SetTemperature(driver, passenger))
    }
}
