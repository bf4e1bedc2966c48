// Device queries and commands

use tracing::debug;

use crate::client::TapoClient;
use crate::error::Error;
use crate::models::{RawDeviceInfo, RawEnergyUsage, SetDeviceInfoParams};

impl TapoClient {
    /// Fetch model, firmware and relay state (`get_device_info`).
    pub async fn device_info(&self) -> Result<RawDeviceInfo, Error> {
        self.call::<(), _>("get_device_info", None).await
    }

    /// Switch the relay (`set_device_info` with `device_on`).
    pub async fn set_device_on(&self, on: bool) -> Result<(), Error> {
        debug!(on, "setting relay state");
        self.call_unit("set_device_info", Some(SetDeviceInfoParams { device_on: on }))
            .await
    }

    /// Fetch power and energy counters (`get_energy_usage`).
    ///
    /// Only energy-monitoring models (P110, P115) implement this; others
    /// answer with a device error code.
    pub async fn energy_usage(&self) -> Result<RawEnergyUsage, Error> {
        self.call::<(), _>("get_energy_usage", None).await
    }
}
