// ── Device seam ──
//
// The session layer only needs four operations from the plug. They are
// expressed as traits so the reconnect and cache policy can be exercised
// without hardware; `TapoConnector` binds them to `tapo-psu-api`.

use std::future::Future;
use std::time::Duration;

use tapo_psu_api::{TapoClient, TransportConfig};
use thiserror::Error;

use crate::config::Credentials;
use crate::model::{DeviceInfo, EnergyReading};

/// Boxed error returned by device implementations.
pub type DeviceError = Box<dyn std::error::Error + Send + Sync>;

/// A device call exceeded the configured timeout.
#[derive(Debug, Error)]
#[error("device call timed out after {0:?}")]
pub struct DeviceTimeout(pub Duration);

/// An authenticated handle to the plug.
pub trait DeviceClient: Send + Sync + 'static {
    fn get_info(&self) -> impl Future<Output = Result<DeviceInfo, DeviceError>> + Send;

    fn set_on(&self, on: bool) -> impl Future<Output = Result<(), DeviceError>> + Send;

    fn get_energy_usage(&self) -> impl Future<Output = Result<EnergyReading, DeviceError>> + Send;
}

/// Produces authenticated [`DeviceClient`]s from credentials
/// (handshake + login).
pub trait DeviceConnector: Send + Sync + 'static {
    type Client: DeviceClient;

    fn connect(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Self::Client, DeviceError>> + Send;
}

/// Run a device call with a hard upper bound.
///
/// Expiry is reported as a [`DeviceTimeout`] error and is otherwise
/// indistinguishable from any other device failure.
pub(crate) async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, DeviceError>
where
    F: Future<Output = Result<T, DeviceError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(Box::new(DeviceTimeout(limit))),
    }
}

// ── Tapo binding ─────────────────────────────────────────────────────

/// Connector for real plugs over HTTP.
#[derive(Debug, Clone, Default)]
pub struct TapoConnector {
    transport: TransportConfig,
}

impl TapoConnector {
    pub fn new(transport: TransportConfig) -> Self {
        Self { transport }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(TransportConfig::with_timeout(timeout))
    }
}

impl DeviceConnector for TapoConnector {
    type Client = TapoClient;

    async fn connect(&self, credentials: &Credentials) -> Result<TapoClient, DeviceError> {
        let mut client = TapoClient::new(&credentials.address, &self.transport)?;
        client
            .login(&credentials.username, &credentials.password)
            .await?;
        Ok(client)
    }
}

impl DeviceClient for TapoClient {
    async fn get_info(&self) -> Result<DeviceInfo, DeviceError> {
        Ok(self.device_info().await?.into())
    }

    async fn set_on(&self, on: bool) -> Result<(), DeviceError> {
        Ok(self.set_device_on(on).await?)
    }

    async fn get_energy_usage(&self) -> Result<EnergyReading, DeviceError> {
        Ok(self.energy_usage().await?.into())
    }
}
