// ── Runtime session configuration ──
//
// These types describe *how* to reach the plug. They carry credential
// data and tuning, but never touch disk. The host (or CLI) constructs a
// `SessionConfig` and hands it in.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

/// Model the plugin is built for. Other models still work, with a warning.
pub const DEFAULT_EXPECTED_MODEL: &str = "P110";

/// Address and account credentials for the plug.
///
/// Opaque to the session layer beyond the completeness check.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Host, IP or URL of the plug.
    pub address: String,
    /// Cloud account e-mail.
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// All three fields are non-empty. Connecting is skipped otherwise.
    pub fn is_complete(&self) -> bool {
        !self.address.trim().is_empty()
            && !self.username.is_empty()
            && !self.password.expose_secret().is_empty()
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new("", "", "")
    }
}

/// Configuration for one plug session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub credentials: Credentials,
    /// Query energy usage on every refresh (logged only).
    pub enable_energy_monitoring: bool,
    /// Upper bound on any single device call.
    pub timeout: Duration,
    /// Model reported by a correctly configured plug.
    pub expected_model: String,
}

impl SessionConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            enable_energy_monitoring: true,
            timeout: Duration::from_secs(10),
            expected_model: DEFAULT_EXPECTED_MODEL.into(),
        }
    }
}
