// ── Device domain types ──

use serde::Serialize;

/// Identity and relay state reported by the plug.
///
/// Produced fresh by every info query; the copy held by the live session
/// is the most recent successful one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub model: String,
    pub firmware_version: String,
    pub hardware_version: String,
    /// Relay state: `true` when the plug is powering its load.
    pub on: bool,
    pub device_id: Option<String>,
    pub nickname: Option<String>,
}

/// Energy counters. Advisory only: never feeds the power-state cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnergyReading {
    pub current_power_mw: u64,
    pub today_energy_wh: u64,
    pub month_energy_wh: u64,
    pub today_runtime_min: u64,
    pub month_runtime_min: u64,
}
