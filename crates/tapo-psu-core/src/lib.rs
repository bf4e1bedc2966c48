//! Device session layer between a PSU-control host and a Tapo smart plug.
//!
//! - **[`SessionManager`]** owns zero-or-one live device session, the
//!   cached power state, and the reconnect policy. Every operation either
//!   succeeds against a validated session or fails with a [`CoreError`];
//!   any device failure discards the session so the next call reconnects.
//!
//! - **[`BackgroundRefresher`]** is the fire-and-forget scheduler used by
//!   [`SessionManager::get_state`] once a cached value exists, so polling
//!   hosts never wait on the network in steady state.
//!
//! - **[`DeviceConnector`] / [`DeviceClient`]** form the seam to the device.
//!   [`TapoConnector`] is the production implementation backed by
//!   `tapo-psu-api`; tests substitute scripted fakes.
//!
//! - **[`PsuPlugin`]** is the host-facing wrapper: settings reload, one-time
//!   registration with the host's PSU controller, and the on/off/state calls.

pub mod config;
pub mod convert;
pub mod device;
pub mod error;
pub mod host;
pub mod model;
pub mod refresher;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{Credentials, DEFAULT_EXPECTED_MODEL, SessionConfig};
pub use device::{DeviceClient, DeviceConnector, DeviceError, DeviceTimeout, TapoConnector};
pub use error::{CoreError, ErrorKind};
pub use host::{PsuPlugin, PsuRegistry};
pub use model::{DeviceInfo, EnergyReading};
pub use refresher::BackgroundRefresher;
pub use session::{ConnectionState, SessionManager};
