// ── Wire → domain conversions ──

use tapo_psu_api::{RawDeviceInfo, RawEnergyUsage};

use crate::model::{DeviceInfo, EnergyReading};

impl From<RawDeviceInfo> for DeviceInfo {
    fn from(raw: RawDeviceInfo) -> Self {
        Self {
            model: raw.model,
            firmware_version: raw.fw_ver,
            hardware_version: raw.hw_ver,
            on: raw.device_on,
            device_id: raw.device_id,
            nickname: raw.nickname,
        }
    }
}

impl From<RawEnergyUsage> for EnergyReading {
    fn from(raw: RawEnergyUsage) -> Self {
        Self {
            current_power_mw: raw.current_power,
            today_energy_wh: raw.today_energy,
            month_energy_wh: raw.month_energy,
            today_runtime_min: raw.today_runtime,
            month_runtime_min: raw.month_runtime,
        }
    }
}
