// ── Core error types ──
//
// Operation-level errors surfaced by `SessionManager`. Consumers never see
// transport details directly; the underlying device error is flattened
// into `reason`. Every variant is recoverable: the session has already
// been discarded, so the next call starts with a fresh connect.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Connect, login or the validating info query failed.
    #[error("Device at {address} is unreachable: {reason}")]
    DeviceUnreachable { address: String, reason: String },

    /// An on/off command was sent on a live session and did not complete.
    /// The relay may or may not have switched.
    #[error("Failed to switch device {action}: {reason}")]
    CommandFailed { action: String, reason: String },

    /// The state query failed after a session had been established.
    #[error("Failed to query device state: {reason}")]
    QueryFailed { reason: String },
}

/// Data-free discriminant of [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    DeviceUnreachable,
    CommandFailed,
    QueryFailed,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeviceUnreachable { .. } => ErrorKind::DeviceUnreachable,
            Self::CommandFailed { .. } => ErrorKind::CommandFailed,
            Self::QueryFailed { .. } => ErrorKind::QueryFailed,
        }
    }
}
