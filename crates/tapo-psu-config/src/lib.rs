//! Settings for tapo-psu.
//!
//! One TOML file describing one plug, environment overrides, password
//! resolution (env + keyring + plaintext), settings versioning, and
//! translation to `tapo_psu_core::SessionConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use tapo_psu_core::{Credentials, DEFAULT_EXPECTED_MODEL, SessionConfig};

/// Current on-disk settings layout.
pub const SETTINGS_VERSION: u32 = 1;

/// Prefix for environment overrides (`TAPO_PSU_ADDRESS`, ...).
pub const ENV_PREFIX: &str = "TAPO_PSU_";

/// Environment variable consulted first for the password.
pub const PASSWORD_ENV: &str = "TAPO_PSU_PASSWORD";

const KEYRING_SERVICE: &str = "tapo-psu";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("missing {missing}")]
    NoCredentials { missing: String },

    #[error("failed to serialize settings: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("settings loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Settings ────────────────────────────────────────────────────────

/// Persisted settings for the plug.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    /// Layout version the file was written with. Files predating
    /// versioning read as 0.
    #[serde(default)]
    pub settings_version: u32,

    /// IP address or hostname of the plug.
    #[serde(default)]
    pub address: String,

    /// Tapo account e-mail.
    #[serde(default)]
    pub username: String,

    /// Plaintext password. Prefer the keyring or `TAPO_PSU_PASSWORD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default = "default_true")]
    pub enable_energy_monitoring: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_expected_model")]
    pub expected_model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            settings_version: SETTINGS_VERSION,
            address: String::new(),
            username: String::new(),
            password: None,
            enable_energy_monitoring: true,
            timeout_secs: default_timeout_secs(),
            expected_model: default_expected_model(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_expected_model() -> String {
    DEFAULT_EXPECTED_MODEL.into()
}

impl Settings {
    /// Bring settings written by an older release up to
    /// [`SETTINGS_VERSION`]. Returns whether anything changed.
    pub fn migrate(&mut self) -> bool {
        match self.settings_version {
            v if v == SETTINGS_VERSION => false,
            v if v > SETTINGS_VERSION => {
                warn!(
                    found = v,
                    supported = SETTINGS_VERSION,
                    "settings written by a newer release, reading them as-is"
                );
                false
            }
            v => {
                debug!(from = v, to = SETTINGS_VERSION, "migrating settings");
                // Version 0 files have the same fields; only the stamp is new.
                self.settings_version = SETTINGS_VERSION;
                true
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "timeout_secs".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        if self.expected_model.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "expected_model".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Copy safe to print: a stored plaintext password is masked.
    pub fn redacted(&self) -> Self {
        Self {
            password: self.password.as_ref().map(|_| "********".into()),
            ..self.clone()
        }
    }

    /// Like [`session_config_with`](Self::session_config_with), but fails
    /// unless address, username and password are all present.
    pub fn complete_session_config(
        &self,
        password: Option<SecretString>,
    ) -> Result<SessionConfig, ConfigError> {
        let mut missing = Vec::new();
        if self.address.trim().is_empty() {
            missing.push("address");
        }
        if self.username.is_empty() {
            missing.push("username");
        }
        if password.is_none() {
            missing.push("password");
        }
        match password {
            Some(password) if missing.is_empty() => Ok(self.session_config_with(password)),
            _ => Err(ConfigError::NoCredentials {
                missing: missing.join(", "),
            }),
        }
    }

    /// Build the session configuration with an already-resolved password.
    pub fn session_config_with(&self, password: SecretString) -> SessionConfig {
        SessionConfig {
            credentials: Credentials {
                address: self.address.trim().to_owned(),
                username: self.username.clone(),
                password,
            },
            enable_energy_monitoring: self.enable_energy_monitoring,
            timeout: self.timeout(),
            expected_model: self.expected_model.clone(),
        }
    }
}

// ── Settings file path ──────────────────────────────────────────────

/// Resolve the settings file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "tapo-psu", "tapo-psu").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("tapo-psu");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Loading & saving ────────────────────────────────────────────────

/// Load settings: defaults, then the TOML file at `path` (if present),
/// then `TAPO_PSU_*` environment variables. Older layouts are migrated
/// in memory.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Settings::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["password"]));

    let mut settings: Settings = figment.extract()?;
    // A file without a version stamp predates versioning.
    if path.exists() && !file_has_version(path)? {
        settings.settings_version = 0;
    }
    settings.migrate();
    settings.validate()?;
    Ok(settings)
}

fn file_has_version(path: &Path) -> Result<bool, ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(raw
        .parse::<toml::Table>()
        .is_ok_and(|table| table.contains_key("settings_version")))
}

/// Serialize settings to TOML and write them to `path`.
pub fn save_settings(settings: &Settings, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(settings)?;
    std::fs::write(path, toml_str)?;
    debug!(path = %path.display(), "settings saved");
    Ok(())
}

// ── Password resolution ─────────────────────────────────────────────

/// Resolve the password: `TAPO_PSU_PASSWORD`, then the system keyring,
/// then the plaintext value in the settings file.
pub fn resolve_password(settings: &Settings) -> Option<SecretString> {
    resolve_password_from(
        settings,
        std::env::var(PASSWORD_ENV).ok(),
        || keyring_password(&settings.username),
    )
}

fn resolve_password_from(
    settings: &Settings,
    env: Option<String>,
    keyring: impl FnOnce() -> Option<String>,
) -> Option<SecretString> {
    // 1. Env var
    if let Some(pw) = env.filter(|pw| !pw.is_empty()) {
        return Some(SecretString::from(pw));
    }

    // 2. Keyring
    if !settings.username.is_empty() {
        if let Some(pw) = keyring() {
            return Some(SecretString::from(pw));
        }
    }

    // 3. Plaintext in settings
    settings
        .password
        .as_ref()
        .filter(|pw| !pw.is_empty())
        .map(|pw| SecretString::from(pw.clone()))
}

fn keyring_password(username: &str) -> Option<String> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, username).ok()?;
    match entry.get_password() {
        Ok(pw) => Some(pw),
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            debug!(error = %e, "keyring lookup failed");
            None
        }
    }
}

/// Store the password for `username` in the system keyring.
pub fn store_password(username: &str, password: &SecretString) -> Result<(), ConfigError> {
    if username.is_empty() {
        return Err(ConfigError::Validation {
            field: "username".into(),
            reason: "required to store a password in the keyring".into(),
        });
    }
    let entry = keyring::Entry::new(KEYRING_SERVICE, username)?;
    entry.set_password(password.expose_secret())?;
    Ok(())
}
