// Shared transport configuration for building reqwest::Client instances.

use std::time::Duration;

/// Transport settings for the device HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Hard per-request timeout. Plugs on a flaky Wi-Fi link can stall
    /// indefinitely without one.
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    /// Transport with the given request timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .user_agent(concat!("tapo-psu/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(crate::error::Error::Transport)
    }
}
