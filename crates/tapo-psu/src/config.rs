//! Settings resolution with CLI flag overrides on top of `tapo-psu-config`.

use std::path::PathBuf;

use secrecy::SecretString;

use tapo_psu_config::{ConfigError, Settings, config_path, load_settings, resolve_password};
use tapo_psu_core::SessionConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Settings file selected by `--config`, or the platform default.
pub fn settings_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load settings and apply `--address`, `--username` and `--timeout`.
pub fn load(global: &GlobalOpts) -> Result<Settings, CliError> {
    let mut settings = load_settings(&settings_path(global))?;
    apply_overrides(&mut settings, global)?;
    Ok(settings)
}

fn apply_overrides(settings: &mut Settings, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(ref address) = global.address {
        settings.address.clone_from(address);
    }
    if let Some(ref username) = global.username {
        settings.username.clone_from(username);
    }
    if let Some(timeout) = global.timeout {
        if timeout == 0 {
            return Err(CliError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        settings.timeout_secs = timeout;
    }
    Ok(())
}

/// Build a complete `SessionConfig`, or explain what is missing.
///
/// `--password` (or `TAPO_PSU_PASSWORD`) wins over the keyring and the
/// settings file.
pub fn session_config(global: &GlobalOpts) -> Result<SessionConfig, CliError> {
    let settings = load(global)?;
    let password = global
        .password
        .clone()
        .filter(|pw| !pw.is_empty())
        .map(SecretString::from)
        .or_else(|| resolve_password(&settings));

    settings
        .complete_session_config(password)
        .map_err(|err| match err {
            ConfigError::NoCredentials { missing } => CliError::NoCredentials {
                missing,
                path: settings_path(global).display().to_string(),
            },
            other => other.into(),
        })
}
