// tapo-psu-api: Async Rust client for Tapo smart plugs (P100/P110 family)
//
// Speaks the device's JSON method envelope (`{method, params}` in,
// `{error_code, result}` out). The proprietary key exchange that normally
// wraps the envelope is not handled here.

pub mod auth;
pub mod client;
pub mod device;
pub mod error;
pub mod models;
pub mod transport;

pub use client::TapoClient;
pub use error::Error;
pub use models::{RawDeviceInfo, RawEnergyUsage};
pub use transport::TransportConfig;
