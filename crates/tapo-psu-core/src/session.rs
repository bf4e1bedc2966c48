// ── Device session lifecycle ──
//
// Owns the (lazily established, self-healing) session to a single plug,
// the cached power state, and the policy deciding when a caller waits on
// the network and when it is served from cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::device::{DeviceClient, DeviceConnector, DeviceError, TapoConnector, with_timeout};
use crate::error::CoreError;
use crate::model::DeviceInfo;
use crate::refresher::BackgroundRefresher;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

// ── DeviceSession ────────────────────────────────────────────────

/// Zero-or-one live session. Any failed device call moves `Live` back to
/// `Absent`; the next operation reconnects on demand.
enum DeviceSession<T> {
    Absent,
    Live { client: Arc<T>, info: DeviceInfo },
}

impl<T> DeviceSession<T> {
    fn client(&self) -> Option<Arc<T>> {
        match self {
            Self::Absent => None,
            Self::Live { client, .. } => Some(Arc::clone(client)),
        }
    }

    fn is_live_with(&self, candidate: &Arc<T>) -> bool {
        matches!(self, Self::Live { client, .. } if Arc::ptr_eq(client, candidate))
    }
}

// ── SessionManager ───────────────────────────────────────────────

/// Session manager for one plug.
///
/// Cheaply cloneable via `Arc<Inner>`; clones share session, cache and
/// background refresher. All methods take `&self` and are safe to call
/// concurrently. The session lock is never held across device I/O, so a
/// slow background refresh does not stall a foreground command.
pub struct SessionManager<C: DeviceConnector = TapoConnector> {
    inner: Arc<Inner<C>>,
}

impl<C: DeviceConnector> Clone for SessionManager<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<C: DeviceConnector> {
    connector: C,
    config: ArcSwap<SessionConfig>,
    session: Mutex<DeviceSession<C::Client>>,
    /// Serializes connect attempts so a burst of callers finding no
    /// session performs a single connect.
    connect_lock: Mutex<()>,
    /// Last known relay state; `None` until the first successful fetch
    /// or command.
    power_state: watch::Sender<Option<bool>>,
    /// Bumped by every successful command and every reload. A refresh
    /// only writes the cache if no bump happened since it started.
    generation: AtomicU64,
    connection_state: watch::Sender<ConnectionState>,
    refresher: BackgroundRefresher,
}

impl SessionManager<TapoConnector> {
    /// Session manager talking to a real plug over HTTP.
    pub fn tapo(config: SessionConfig) -> Self {
        Self::new(TapoConnector::with_timeout(config.timeout), config)
    }
}

impl<C: DeviceConnector> SessionManager<C> {
    /// Create a session manager. Does NOT connect -- the first operation
    /// (or an explicit [`connect()`](Self::connect)) does.
    pub fn new(connector: C, config: SessionConfig) -> Self {
        let (power_state, _) = watch::channel(None);
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            inner: Arc::new(Inner {
                connector,
                config: ArcSwap::from_pointee(config),
                session: Mutex::new(DeviceSession::Absent),
                connect_lock: Mutex::new(()),
                power_state,
                generation: AtomicU64::new(0),
                connection_state,
                refresher: BackgroundRefresher::new(),
            }),
        }
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<SessionConfig> {
        self.inner.config.load_full()
    }

    /// The scheduler used for background refreshes.
    pub fn refresher(&self) -> &BackgroundRefresher {
        &self.inner.refresher
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Establish a session: login, then an info query to confirm the
    /// device answers and to log what it is.
    ///
    /// Returns `false` (never an error) when credentials are incomplete or
    /// any step fails; the session is left absent in both cases.
    pub async fn connect(&self) -> bool {
        let _guard = self.inner.connect_lock.lock().await;
        self.connect_locked().await.is_ok()
    }

    /// Apply new settings (host configuration-reload callback).
    ///
    /// Any live session was built from the previous credentials and is
    /// discarded. Connects right away when the new credentials are
    /// complete. The cached power state is kept.
    pub async fn reload(&self, config: SessionConfig) -> bool {
        debug!(?config, "settings reloaded");
        let _guard = self.inner.connect_lock.lock().await;

        self.inner.config.store(Arc::new(config));
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        let previous = std::mem::replace(
            &mut *self.inner.session.lock().await,
            DeviceSession::Absent,
        );
        if matches!(previous, DeviceSession::Live { .. }) {
            debug!("discarding session built from previous settings");
            self.inner
                .connection_state
                .send_replace(ConnectionState::Disconnected);
        }

        if !self.inner.config.load().credentials.is_complete() {
            debug!("credentials incomplete, staying disconnected");
            return false;
        }

        self.connect_locked().await.is_ok()
    }

    /// Connect with `connect_lock` held by the caller.
    async fn connect_locked(&self) -> Result<Arc<C::Client>, CoreError> {
        let config = self.inner.config.load_full();
        let address = config.credentials.address.clone();

        if !config.credentials.is_complete() {
            debug!("credentials incomplete, skipping connect");
            return Err(CoreError::DeviceUnreachable {
                address,
                reason: "credentials incomplete".into(),
            });
        }

        info!(%address, "connecting to device");
        self.inner
            .connection_state
            .send_replace(ConnectionState::Connecting);

        let established = async {
            let client =
                with_timeout(config.timeout, self.inner.connector.connect(&config.credentials))
                    .await?;
            let info = with_timeout(config.timeout, client.get_info()).await?;
            Ok::<_, DeviceError>((client, info))
        }
        .await;

        match established {
            Ok((client, info)) => {
                info!(
                    model = %info.model,
                    firmware = %info.firmware_version,
                    "connected to {} with firmware {}",
                    info.model,
                    info.firmware_version
                );
                if info.model != config.expected_model {
                    warn!(
                        expected = %config.expected_model,
                        model = %info.model,
                        "connected device is not a {}, continuing anyway",
                        config.expected_model
                    );
                }

                let client = Arc::new(client);
                *self.inner.session.lock().await = DeviceSession::Live {
                    client: Arc::clone(&client),
                    info,
                };
                self.inner
                    .connection_state
                    .send_replace(ConnectionState::Connected);
                Ok(client)
            }
            Err(e) => {
                error!(%address, error = %e, "failed to connect to device");
                *self.inner.session.lock().await = DeviceSession::Absent;
                self.inner
                    .connection_state
                    .send_replace(ConnectionState::Failed);
                Err(CoreError::DeviceUnreachable {
                    address,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Return the live client, connecting first if there is none.
    async fn ensure_connected(&self) -> Result<Arc<C::Client>, CoreError> {
        if let Some(client) = self.inner.session.lock().await.client() {
            return Ok(client);
        }

        let _guard = self.inner.connect_lock.lock().await;
        // Another caller may have connected while we waited.
        if let Some(client) = self.inner.session.lock().await.client() {
            return Ok(client);
        }
        self.connect_locked().await
    }

    /// Drop the session if it is still the one `client` came from.
    ///
    /// A failure on an old session must not discard a newer one that was
    /// established in the meantime.
    async fn invalidate(&self, client: &Arc<C::Client>) {
        let mut session = self.inner.session.lock().await;
        if session.is_live_with(client) {
            *session = DeviceSession::Absent;
            self.inner
                .connection_state
                .send_replace(ConnectionState::Disconnected);
            debug!("session discarded, next call reconnects");
        }
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Switch the plug on.
    pub async fn turn_on(&self) -> Result<(), CoreError> {
        self.set_power(true).await
    }

    /// Switch the plug off.
    pub async fn turn_off(&self) -> Result<(), CoreError> {
        self.set_power(false).await
    }

    async fn set_power(&self, on: bool) -> Result<(), CoreError> {
        let action = if on { "on" } else { "off" };
        let client = self.ensure_connected().await?;

        debug!("switching device {action}");
        let timeout = self.inner.config.load().timeout;
        match with_timeout(timeout, client.set_on(on)).await {
            Ok(()) => {
                // Optimistic: trust the command instead of re-querying.
                self.inner.generation.fetch_add(1, Ordering::AcqRel);
                self.inner.power_state.send_replace(Some(on));
                info!("device turned {action}");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to switch device {action}");
                self.invalidate(&client).await;
                Err(CoreError::CommandFailed {
                    action: action.into(),
                    reason: e.to_string(),
                })
            }
        }
    }

    // ── State ────────────────────────────────────────────────────

    /// Current relay state.
    ///
    /// With no cached value this waits for a device query. Once a value is
    /// cached it is returned immediately and a background refresh is
    /// triggered; a failure of that refresh is only logged.
    pub async fn get_state(&self) -> Result<bool, CoreError> {
        match self.power_state() {
            Some(on) => {
                self.refresh_in_background();
                Ok(on)
            }
            None => self.refresh().await,
        }
    }

    /// Query the plug and update the cache.
    ///
    /// A reading taken before a command or reload that completed while it
    /// was in flight is stale: the cache keeps the newer value and that
    /// value is returned.
    ///
    /// When energy monitoring is enabled, also logs current power draw;
    /// failures of that query are swallowed.
    pub async fn refresh(&self) -> Result<bool, CoreError> {
        let generation = self.inner.generation.load(Ordering::Acquire);
        let client = self.ensure_connected().await?;
        let config = self.inner.config.load_full();

        debug!("getting device state");
        let info = match with_timeout(config.timeout, client.get_info()).await {
            Ok(info) => info,
            Err(e) => {
                error!(error = %e, "failed to get device state");
                self.invalidate(&client).await;
                return Err(CoreError::QueryFailed {
                    reason: e.to_string(),
                });
            }
        };

        let mut on = info.on;
        let mut stale = false;
        self.inner.power_state.send_if_modified(|cached| {
            if self.inner.generation.load(Ordering::Acquire) != generation {
                stale = true;
                return false;
            }
            let changed = *cached != Some(on);
            *cached = Some(on);
            changed
        });
        if stale {
            debug!(read = on, "discarding state read before a newer command or reload");
            on = self.power_state().unwrap_or(on);
        }
        self.record_info(&client, info).await;

        if config.enable_energy_monitoring {
            match with_timeout(config.timeout, client.get_energy_usage()).await {
                Ok(reading) => debug!(
                    current_power_mw = reading.current_power_mw,
                    "current power consumption: {} mW",
                    reading.current_power_mw
                ),
                Err(e) => debug!(error = %e, "failed to get energy usage"),
            }
        }

        Ok(on)
    }

    fn refresh_in_background(&self) {
        let manager = self.clone();
        self.inner.refresher.fire("state refresh", async move {
            manager.refresh().await.map(|_| ())
        });
    }

    /// Keep the session's DeviceInfo current.
    async fn record_info(&self, client: &Arc<C::Client>, fresh: DeviceInfo) {
        let mut session = self.inner.session.lock().await;
        if let DeviceSession::Live { client: live, info } = &mut *session {
            if Arc::ptr_eq(live, client) {
                *info = fresh;
            }
        }
    }

    // ── Observation ──────────────────────────────────────────────

    /// Cached relay state without touching the device.
    pub fn power_state(&self) -> Option<bool> {
        *self.inner.power_state.borrow()
    }

    /// Subscribe to cache updates.
    pub fn subscribe_power_state(&self) -> watch::Receiver<Option<bool>> {
        self.inner.power_state.subscribe()
    }

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Whether a live session exists right now.
    pub async fn is_connected(&self) -> bool {
        self.inner.session.lock().await.client().is_some()
    }

    /// DeviceInfo of the live session, if any.
    pub async fn device_info(&self) -> Option<DeviceInfo> {
        match &*self.inner.session.lock().await {
            DeviceSession::Absent => None,
            DeviceSession::Live { info, .. } => Some(info.clone()),
        }
    }

    /// Stop background refreshes and wait for the one in flight.
    pub async fn shutdown(&self) {
        self.inner.refresher.shutdown().await;
    }
}
