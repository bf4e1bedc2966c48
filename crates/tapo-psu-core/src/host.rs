// ── Host boundary ──
//
// The PSU-control host drives the plug through three calls (on, off,
// state), pushes settings on init and on every save, and offers a
// registry the plugin joins once at startup. Older hosts have no
// registry; the plugin then stays passive.

use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::device::{DeviceConnector, TapoConnector};
use crate::error::CoreError;
use crate::session::SessionManager;

/// The host's PSU controller, which routes power requests to the
/// registered plugin.
pub trait PsuRegistry<C: DeviceConnector = TapoConnector> {
    fn register_plugin(&self, plugin: PsuPlugin<C>);
}

/// Host-facing plugin wrapping a [`SessionManager`].
pub struct PsuPlugin<C: DeviceConnector = TapoConnector> {
    session: SessionManager<C>,
}

impl<C: DeviceConnector> Clone for PsuPlugin<C> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
        }
    }
}

impl<C: DeviceConnector> PsuPlugin<C> {
    pub fn new(session: SessionManager<C>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager<C> {
        &self.session
    }

    /// Settings became available. Connects when credentials are complete;
    /// a failed connect is logged, not returned.
    pub async fn on_settings_initialized(&self, config: SessionConfig) {
        self.session.reload(config).await;
    }

    /// Settings were saved by the user.
    pub async fn on_settings_save(&self, config: SessionConfig) {
        self.session.reload(config).await;
    }

    /// Join the host's PSU controller. Returns whether registration
    /// happened.
    pub fn on_startup(&self, registry: Option<&dyn PsuRegistry<C>>) -> bool {
        let Some(registry) = registry else {
            warn!("the installed PSU control host does not support plugin registration");
            return false;
        };

        debug!("registering plugin with PSU control host");
        registry.register_plugin(self.clone());
        true
    }

    pub async fn turn_psu_on(&self) -> Result<(), CoreError> {
        self.session.turn_on().await
    }

    pub async fn turn_psu_off(&self) -> Result<(), CoreError> {
        self.session.turn_off().await
    }

    pub async fn get_psu_state(&self) -> Result<bool, CoreError> {
        self.session.get_state().await
    }
}
