//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use tapo_psu_config::ConfigError;
use tapo_psu_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Device ───────────────────────────────────────────────────────
    #[error("Could not reach the plug at {address}")]
    #[diagnostic(
        code(tapo_psu::unreachable),
        help(
            "Check that the plug is powered and on the same network,\n\
             and that the username and password match your Tapo account.\n\
             Reason: {reason}"
        )
    )]
    DeviceUnreachable { address: String, reason: String },

    #[error("Failed to switch the PSU {action}")]
    #[diagnostic(
        code(tapo_psu::command_failed),
        help("The relay may or may not have switched. Reason: {reason}")
    )]
    CommandFailed { action: String, reason: String },

    #[error("Failed to read the PSU state")]
    #[diagnostic(code(tapo_psu::query_failed), help("Reason: {reason}"))]
    QueryFailed { reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Plug is not configured: missing {missing}")]
    #[diagnostic(
        code(tapo_psu::no_credentials),
        help(
            "Create a settings file with: tapo-psu config init -a <ADDRESS> -u <EMAIL>\n\
             then store the password with: tapo-psu config set-password\n\
             Settings file: {path}"
        )
    )]
    NoCredentials { missing: String, path: String },

    #[error("Settings file already exists at {path}")]
    #[diagnostic(
        code(tapo_psu::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(tapo_psu::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(tapo_psu::config))]
    Config(#[from] ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(tapo_psu::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DeviceUnreachable { .. } => exit_code::CONNECTION,
            Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Validation { .. } | Self::ConfigExists { .. } | Self::Config(_) => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DeviceUnreachable { address, reason } => {
                CliError::DeviceUnreachable { address, reason }
            }
            CoreError::CommandFailed { action, reason } => CliError::CommandFailed { action, reason },
            CoreError::QueryFailed { reason } => CliError::QueryFailed { reason },
        }
    }
}
