use thiserror::Error;

/// Device error code for rejected credentials.
pub const ERROR_CODE_INVALID_CREDENTIALS: i32 = -1501;
/// Device error code for an expired or unknown session token.
pub const ERROR_CODE_SESSION_EXPIRED: i32 = 9999;

/// Top-level error type for the `tapo-psu-api` crate.
///
/// Covers every failure mode of a device round-trip: authentication,
/// transport, the `{error_code, result}` envelope, and decoding.
/// `tapo-psu-core` folds these into its own operation-level taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected (wrong username or password).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Token expired or was never issued -- log in again.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Device answered with a non-2xx HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Address could not be turned into a URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Device ──────────────────────────────────────────────────────
    /// Non-zero `error_code` in the response envelope.
    #[error("Device rejected '{method}' (error code {code})")]
    Device { method: String, code: i32 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Map a non-zero envelope `error_code` to the matching variant.
    pub(crate) fn from_code(method: &str, code: i32) -> Self {
        match code {
            ERROR_CODE_INVALID_CREDENTIALS => Self::Authentication {
                message: "invalid username or password".into(),
            },
            ERROR_CODE_SESSION_EXPIRED => Self::SessionExpired,
            _ => Self::Device {
                method: method.to_owned(),
                code,
            },
        }
    }
}
