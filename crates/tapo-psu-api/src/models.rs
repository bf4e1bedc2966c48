// Wire models for the device JSON envelope.
//
// Field names follow the device's snake_case keys verbatim. Unknown keys
// are kept in `extra` so nothing is silently lost.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outgoing request: `{"method": ..., "params": ..., "requestTimeMils": ...}`.
#[derive(Debug, Serialize)]
pub(crate) struct Request<'a, P: Serialize> {
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<P>,
    #[serde(rename = "requestTimeMils")]
    pub request_time_mils: i64,
}

/// Incoming response: `{"error_code": 0, "result": {...}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub error_code: i32,
    pub result: Option<T>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginParams<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResult {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetDeviceInfoParams {
    pub device_on: bool,
}

/// Raw `get_device_info` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDeviceInfo {
    #[serde(default = "unknown")]
    pub model: String,
    #[serde(default = "unknown")]
    pub fw_ver: String,
    #[serde(default = "unknown")]
    pub hw_ver: String,
    pub device_on: bool,
    #[serde(default)]
    pub device_id: Option<String>,
    /// Base64-encoded user-assigned name.
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Raw `get_energy_usage` result. Power in milliwatts, energy in
/// watt-hours, runtime in minutes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEnergyUsage {
    #[serde(default)]
    pub current_power: u64,
    #[serde(default)]
    pub today_energy: u64,
    #[serde(default)]
    pub month_energy: u64,
    #[serde(default)]
    pub today_runtime: u64,
    #[serde(default)]
    pub month_runtime: u64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

fn unknown() -> String {
    "Unknown".into()
}
