#![allow(clippy::unwrap_used)]
// Session lifecycle, cache and refresh policy against a scripted device.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use secrecy::ExposeSecret;
use tokio::sync::Notify;

use tapo_psu_core::{
    ConnectionState, CoreError, Credentials, DeviceClient, DeviceConnector, DeviceError,
    DeviceInfo, EnergyReading, PsuPlugin, PsuRegistry, SessionConfig, SessionManager,
};

// ── Scripted device ─────────────────────────────────────────────────

struct FakeDevice {
    password: &'static str,
    model: Mutex<String>,
    on: AtomicBool,
    fail_connect: AtomicBool,
    fail_info: AtomicBool,
    fail_set: AtomicBool,
    fail_energy: AtomicBool,
    hang_info: AtomicBool,
    hold_info: AtomicBool,
    release: Notify,
    connects: AtomicUsize,
    info_calls: AtomicUsize,
    energy_calls: AtomicUsize,
}

impl FakeDevice {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            password: "p",
            model: Mutex::new("P110".into()),
            on: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
            fail_info: AtomicBool::new(false),
            fail_set: AtomicBool::new(false),
            fail_energy: AtomicBool::new(false),
            hang_info: AtomicBool::new(false),
            hold_info: AtomicBool::new(false),
            release: Notify::new(),
            connects: AtomicUsize::new(0),
            info_calls: AtomicUsize::new(0),
            energy_calls: AtomicUsize::new(0),
        })
    }

    fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }

    fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

struct FakeConnector {
    device: Arc<FakeDevice>,
}

struct FakeClient {
    device: Arc<FakeDevice>,
}

impl DeviceConnector for FakeConnector {
    type Client = FakeClient;

    async fn connect(&self, credentials: &Credentials) -> Result<FakeClient, DeviceError> {
        self.device.connects.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.device.fail_connect.load(Ordering::SeqCst)
            || credentials.password.expose_secret() != self.device.password
        {
            return Err("handshake failed".into());
        }
        Ok(FakeClient {
            device: Arc::clone(&self.device),
        })
    }
}

impl DeviceClient for FakeClient {
    async fn get_info(&self) -> Result<DeviceInfo, DeviceError> {
        let device = &self.device;
        device.info_calls.fetch_add(1, Ordering::SeqCst);
        // The relay is read when the request lands; a held reply is stale.
        let on = device.on.load(Ordering::SeqCst);
        if device.hold_info.swap(false, Ordering::SeqCst) {
            device.release.notified().await;
        }
        if device.hang_info.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if device.fail_info.load(Ordering::SeqCst) {
            return Err("connection reset by peer".into());
        }
        Ok(DeviceInfo {
            model: device.model.lock().unwrap().clone(),
            firmware_version: "1.3.0 Build 230905".into(),
            hardware_version: "1.0".into(),
            on,
            device_id: None,
            nickname: None,
        })
    }

    async fn set_on(&self, on: bool) -> Result<(), DeviceError> {
        if self.device.fail_set.load(Ordering::SeqCst) {
            return Err("connection reset by peer".into());
        }
        self.device.on.store(on, Ordering::SeqCst);
        Ok(())
    }

    async fn get_energy_usage(&self) -> Result<EnergyReading, DeviceError> {
        self.device.energy_calls.fetch_add(1, Ordering::SeqCst);
        if self.device.fail_energy.load(Ordering::SeqCst) {
            return Err("energy monitoring not supported".into());
        }
        Ok(EnergyReading {
            current_power_mw: 48_250,
            ..EnergyReading::default()
        })
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn config(password: &str) -> SessionConfig {
    SessionConfig {
        timeout: Duration::from_secs(1),
        ..SessionConfig::new(Credentials::new("10.0.0.5", "u", password))
    }
}

fn manager_with(device: &Arc<FakeDevice>, config: SessionConfig) -> SessionManager<FakeConnector> {
    SessionManager::new(
        FakeConnector {
            device: Arc::clone(device),
        },
        config,
    )
}

fn manager(device: &Arc<FakeDevice>) -> SessionManager<FakeConnector> {
    manager_with(device, config("p"))
}

/// Wait until the device has seen `calls` info queries.
async fn info_calls_reach(device: &FakeDevice, calls: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while FakeDevice::count(&device.info_calls) < calls {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("refresh never reached the device");
}

fn assert_unreachable(result: Result<impl std::fmt::Debug, CoreError>) {
    assert!(
        matches!(result, Err(CoreError::DeviceUnreachable { .. })),
        "expected DeviceUnreachable, got: {result:?}"
    );
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_p110_off_then_turn_on_serves_commanded_value() {
    let device = FakeDevice::new();
    let session = manager(&device);

    assert!(!session.get_state().await.unwrap());

    session.turn_on().await.unwrap();
    assert_eq!(session.power_state(), Some(true));
    assert!(session.get_state().await.unwrap());
    assert_eq!(FakeDevice::count(&device.connects), 1);
}

#[tokio::test]
async fn test_unreachable_first_call_then_fixed_credentials_succeed() {
    let device = FakeDevice::new();
    let session = manager_with(&device, config("wrong"));

    assert_unreachable(session.get_state().await);
    assert_eq!(session.power_state(), None);

    assert!(session.reload(config("p")).await);
    assert!(!session.get_state().await.unwrap());
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cache_follows_every_command() {
    let device = FakeDevice::new();
    let session = manager(&device);

    for on in [true, false, false, true, true, false] {
        if on {
            session.turn_on().await.unwrap();
        } else {
            session.turn_off().await.unwrap();
        }
        assert_eq!(session.power_state(), Some(on));
    }
    assert_eq!(FakeDevice::count(&device.connects), 1);
}

#[tokio::test]
async fn test_connect_failure_fails_every_operation_and_keeps_cache_unknown() {
    let device = FakeDevice::new();
    FakeDevice::set(&device.fail_connect, true);
    let session = manager(&device);

    assert_unreachable(session.turn_on().await);
    assert_unreachable(session.turn_off().await);
    assert_unreachable(session.get_state().await);

    assert_eq!(session.power_state(), None);
    assert!(!session.is_connected().await);
    assert_eq!(
        *session.connection_state().borrow(),
        ConnectionState::Failed
    );
}

#[tokio::test]
async fn test_connect_failure_keeps_prior_value() {
    let device = FakeDevice::new();
    let session = manager(&device);
    session.turn_on().await.unwrap();

    FakeDevice::set(&device.fail_set, true);
    let result = session.turn_off().await;
    assert!(matches!(result, Err(CoreError::CommandFailed { .. })));
    assert_eq!(session.power_state(), Some(true));

    FakeDevice::set(&device.fail_connect, true);
    assert_unreachable(session.turn_off().await);
    assert_unreachable(session.refresh().await);
    assert_eq!(session.power_state(), Some(true));
}

#[tokio::test]
async fn test_command_failure_invalidates_session_and_propagates() {
    let device = FakeDevice::new();
    let session = manager(&device);
    assert!(session.connect().await);

    FakeDevice::set(&device.fail_set, true);
    match session.turn_on().await {
        Err(CoreError::CommandFailed { action, reason }) => {
            assert_eq!(action, "on");
            assert!(reason.contains("connection reset"), "reason: {reason}");
        }
        other => panic!("expected CommandFailed, got: {other:?}"),
    }
    assert!(!session.is_connected().await);
    assert_eq!(session.power_state(), None);

    FakeDevice::set(&device.fail_set, false);
    session.turn_on().await.unwrap();
    assert_eq!(FakeDevice::count(&device.connects), 2);
    assert_eq!(session.power_state(), Some(true));
}

// ── State queries ───────────────────────────────────────────────────

#[tokio::test]
async fn test_first_get_state_fetches_synchronously() {
    let device = FakeDevice::new();
    FakeDevice::set(&device.on, true);
    let session = manager(&device);

    assert!(session.get_state().await.unwrap());
    assert_eq!(session.power_state(), Some(true));
    // One info query validates the session, one fetches the state.
    assert_eq!(FakeDevice::count(&device.info_calls), 2);
    assert!(!session.refresher().is_busy());
}

#[tokio::test]
async fn test_first_get_state_propagates_query_failure() {
    let device = FakeDevice::new();
    let session = manager(&device);
    assert!(session.connect().await);

    FakeDevice::set(&device.fail_info, true);
    let result = session.get_state().await;

    assert!(
        matches!(result, Err(CoreError::QueryFailed { .. })),
        "expected QueryFailed, got: {result:?}"
    );
    assert_eq!(session.power_state(), None);
    assert!(!session.is_connected().await);
}

#[tokio::test]
async fn test_cached_get_state_returns_immediately_and_refreshes_in_background() {
    let device = FakeDevice::new();
    let session = manager(&device);
    session.turn_off().await.unwrap();

    // Someone pressed the button on the plug.
    FakeDevice::set(&device.on, true);
    FakeDevice::set(&device.hold_info, true);
    let mut rx = session.subscribe_power_state();

    let state = tokio::time::timeout(Duration::from_millis(200), session.get_state())
        .await
        .expect("cached read must not wait on the device")
        .unwrap();
    assert!(!state);
    assert!(session.refresher().is_busy());

    device.release.notify_one();
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| *s == Some(true)))
        .await
        .expect("background refresh should update the cache")
        .unwrap();
}

#[tokio::test]
async fn test_background_refresh_failure_keeps_stale_value() {
    let device = FakeDevice::new();
    let session = manager(&device);
    session.turn_on().await.unwrap();

    FakeDevice::set(&device.fail_info, true);
    assert!(session.get_state().await.unwrap());
    session.refresher().drain().await;

    assert_eq!(session.power_state(), Some(true));
    assert!(!session.is_connected().await);
}

#[tokio::test]
async fn test_overlapping_background_refreshes_are_coalesced() {
    let device = FakeDevice::new();
    let session = manager(&device);
    session.turn_on().await.unwrap();
    let before = FakeDevice::count(&device.info_calls);

    FakeDevice::set(&device.hold_info, true);
    for _ in 0..3 {
        assert!(session.get_state().await.unwrap());
    }
    tokio::task::yield_now().await;

    device.release.notify_one();
    session.refresher().drain().await;

    assert_eq!(FakeDevice::count(&device.info_calls) - before, 1);
}

#[tokio::test]
async fn test_command_wins_over_refresh_that_read_before_it() {
    let device = FakeDevice::new();
    let session = manager(&device);
    session.turn_off().await.unwrap();
    let before = FakeDevice::count(&device.info_calls);

    FakeDevice::set(&device.hold_info, true);
    assert!(!session.get_state().await.unwrap());
    info_calls_reach(&device, before + 1).await;

    session.turn_on().await.unwrap();
    assert_eq!(session.power_state(), Some(true));

    device.release.notify_one();
    session.refresher().drain().await;

    assert_eq!(session.power_state(), Some(true));
    assert!(session.get_state().await.unwrap());
    assert!(session.is_connected().await);
}

#[tokio::test]
async fn test_synchronous_refresh_returns_newer_commanded_value() {
    let device = FakeDevice::new();
    let session = manager(&device);
    assert!(session.connect().await);
    let before = FakeDevice::count(&device.info_calls);

    FakeDevice::set(&device.hold_info, true);
    let refresh = tokio::spawn({
        let session = session.clone();
        async move { session.refresh().await }
    });
    info_calls_reach(&device, before + 1).await;

    session.turn_on().await.unwrap();
    device.release.notify_one();

    assert!(refresh.await.unwrap().unwrap());
    assert_eq!(session.power_state(), Some(true));
}

#[tokio::test]
async fn test_energy_failure_never_surfaces() {
    let device = FakeDevice::new();
    FakeDevice::set(&device.fail_energy, true);
    FakeDevice::set(&device.on, true);
    let session = manager(&device);

    assert!(session.get_state().await.unwrap());
    assert_eq!(FakeDevice::count(&device.energy_calls), 1);
    assert!(session.is_connected().await);

    assert!(session.get_state().await.unwrap());
    session.refresher().drain().await;
    assert_eq!(FakeDevice::count(&device.energy_calls), 2);
    assert_eq!(session.power_state(), Some(true));
    assert!(session.is_connected().await);
}

#[tokio::test]
async fn test_energy_query_skipped_when_disabled() {
    let device = FakeDevice::new();
    let session = manager_with(
        &device,
        SessionConfig {
            enable_energy_monitoring: false,
            ..config("p")
        },
    );

    session.get_state().await.unwrap();
    assert_eq!(FakeDevice::count(&device.energy_calls), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_query_is_a_failure() {
    let device = FakeDevice::new();
    let session = manager(&device);
    assert!(session.connect().await);

    FakeDevice::set(&device.hang_info, true);
    match session.get_state().await {
        Err(CoreError::QueryFailed { reason }) => {
            assert!(reason.contains("timed out"), "reason: {reason}");
        }
        other => panic!("expected QueryFailed, got: {other:?}"),
    }
    assert!(!session.is_connected().await);
}

// ── Connection lifecycle ────────────────────────────────────────────

#[tokio::test]
async fn test_model_mismatch_is_not_fatal() {
    let device = FakeDevice::new();
    *device.model.lock().unwrap() = "P100".into();
    let session = manager(&device);

    assert!(session.connect().await);
    assert_eq!(session.device_info().await.unwrap().model, "P100");
    session.turn_on().await.unwrap();
}

#[tokio::test]
async fn test_incomplete_credentials_skip_connect() {
    let device = FakeDevice::new();
    let session = manager_with(
        &device,
        SessionConfig::new(Credentials::new("", "u", "p")),
    );

    assert!(!session.connect().await);
    assert_unreachable(session.get_state().await);
    assert_eq!(FakeDevice::count(&device.connects), 0);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_connect() {
    let device = FakeDevice::new();
    let session = manager(&device);

    let (a, b, c) = tokio::join!(session.get_state(), session.get_state(), session.turn_on());
    a.unwrap();
    b.unwrap();
    c.unwrap();

    assert_eq!(FakeDevice::count(&device.connects), 1);
}

#[tokio::test]
async fn test_reload_replaces_session_and_keeps_cache() {
    let device = FakeDevice::new();
    let session = manager(&device);
    session.turn_on().await.unwrap();

    assert!(session.reload(config("p")).await);
    assert_eq!(FakeDevice::count(&device.connects), 2);
    assert_eq!(session.power_state(), Some(true));
    assert_eq!(
        *session.connection_state().borrow(),
        ConnectionState::Connected
    );

    assert!(!session.reload(SessionConfig::default()).await);
    assert!(!session.is_connected().await);
    assert_eq!(session.power_state(), Some(true));
}

#[tokio::test]
async fn test_refresh_from_previous_settings_is_discarded() {
    let device = FakeDevice::new();
    let session = manager(&device);
    session.turn_on().await.unwrap();
    let before = FakeDevice::count(&device.info_calls);

    // The refresh reads the old plug as off, then stalls.
    FakeDevice::set(&device.on, false);
    FakeDevice::set(&device.hold_info, true);
    assert!(session.get_state().await.unwrap());
    info_calls_reach(&device, before + 1).await;

    assert!(session.reload(config("p")).await);
    device.release.notify_one();
    session.refresher().drain().await;

    assert_eq!(session.power_state(), Some(true));
    assert!(session.is_connected().await);
}

#[tokio::test]
async fn test_failed_validating_info_query_leaves_session_absent() {
    let device = FakeDevice::new();
    FakeDevice::set(&device.fail_info, true);
    let session = manager(&device);

    assert!(!session.connect().await);
    assert_eq!(FakeDevice::count(&device.connects), 1);
    assert_unreachable(session.get_state().await);

    assert!(!session.is_connected().await);
    assert!(session.device_info().await.is_none());
    assert_eq!(session.power_state(), None);
    assert_eq!(
        *session.connection_state().borrow(),
        ConnectionState::Failed
    );
}

// ── Host boundary ───────────────────────────────────────────────────

#[derive(Default)]
struct RecordingRegistry {
    plugins: Mutex<Vec<PsuPlugin<FakeConnector>>>,
}

impl PsuRegistry<FakeConnector> for RecordingRegistry {
    fn register_plugin(&self, plugin: PsuPlugin<FakeConnector>) {
        self.plugins.lock().unwrap().push(plugin);
    }
}

#[tokio::test]
async fn test_plugin_registers_once_and_shares_the_session() {
    let device = FakeDevice::new();
    let plugin = PsuPlugin::new(manager_with(&device, SessionConfig::default()));
    let registry = RecordingRegistry::default();

    assert!(!plugin.on_startup(None));
    assert!(plugin.on_startup(Some(&registry)));

    plugin.on_settings_initialized(config("p")).await;
    assert!(plugin.session().is_connected().await);

    let registered = registry.plugins.lock().unwrap().pop().unwrap();
    registered.turn_psu_on().await.unwrap();
    assert!(plugin.get_psu_state().await.unwrap());

    plugin.turn_psu_off().await.unwrap();
    assert!(!registered.get_psu_state().await.unwrap());
}
