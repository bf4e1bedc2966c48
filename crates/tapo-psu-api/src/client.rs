// Device HTTP client
//
// Wraps `reqwest::Client` with the device's `POST /app` method envelope,
// token handling, and `error_code` unwrapping. Endpoint methods live in
// `auth.rs` and `device.rs` as inherent impls so this module stays
// focused on transport mechanics.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::{Envelope, Request};
use crate::transport::TransportConfig;

/// Maximum number of body characters echoed into error messages.
const BODY_PREVIEW_CHARS: usize = 200;

/// Raw HTTP client for a single plug.
///
/// Construct with [`new`](Self::new), then call [`login`](Self::login)
/// before any device method. The token returned by login is appended to
/// every subsequent request.
pub struct TapoClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    token: Option<SecretString>,
}

impl TapoClient {
    /// Create a client for the plug at `address`.
    ///
    /// `address` may be a bare host or IP (`10.0.0.5`, `plug.lan:8080`),
    /// in which case `http://` is assumed, or a full URL.
    pub fn new(address: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = parse_address(address)?;
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout: transport.timeout,
            token: None,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout: TransportConfig::default().timeout,
            token: None,
        }
    }

    /// The device base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether a session token is held.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub(crate) fn set_token(&mut self, token: SecretString) {
        debug!("storing session token");
        self.token = Some(token);
    }

    /// `{base}/app`, with `?token=` once logged in.
    fn app_url(&self) -> Result<Url, Error> {
        let mut url = self.base_url.join("app")?;
        if let Some(ref token) = self.token {
            url.query_pairs_mut()
                .append_pair("token", token.expose_secret());
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Call `method` and return the unwrapped `result`.
    pub(crate) async fn call<P, T>(&self, method: &str, params: Option<P>) -> Result<T, Error>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let envelope: Envelope<T> = self.send(method, params).await?;
        envelope.result.ok_or_else(|| Error::Deserialization {
            message: format!("'{method}' response has no result"),
            body: String::new(),
        })
    }

    /// Call `method`, checking only the envelope's `error_code`.
    pub(crate) async fn call_unit<P: Serialize>(
        &self,
        method: &str,
        params: Option<P>,
    ) -> Result<(), Error> {
        let _envelope: Envelope<serde_json::Value> = self.send(method, params).await?;
        Ok(())
    }

    async fn send<P, T>(&self, method: &str, params: Option<P>) -> Result<Envelope<T>, Error>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let url = self.app_url()?;
        debug!(method, "POST {}", self.base_url);

        let body = Request {
            method,
            params,
            request_time_mils: chrono::Utc::now().timestamp_millis(),
        };

        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        self.parse_envelope(method, resp).await
    }

    /// Parse the `{error_code, result}` envelope.
    async fn parse_envelope<T: DeserializeOwned>(
        &self,
        method: &str,
        resp: reqwest::Response,
    ) -> Result<Envelope<T>, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::Authentication {
                message: format!("device refused '{method}' (HTTP {status})"),
            });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        let body = resp.text().await.map_err(|e| self.map_transport(e))?;
        trace!(method, body = %preview(&body), "device response");

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: format!("{e} (body preview: {:?})", preview(&body)),
                body: body.clone(),
            })?;

        match envelope.error_code {
            0 => Ok(envelope),
            code => Err(Error::from_code(method, code)),
        }
    }

    fn map_transport(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }
}

/// Turn a user-supplied address into the device base URL.
pub fn parse_address(address: &str) -> Result<Url, Error> {
    let address = address.trim().trim_end_matches('/');
    if address.contains("://") {
        Ok(Url::parse(&format!("{address}/"))?)
    } else {
        Ok(Url::parse(&format!("http://{address}/"))?)
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn bare_host_gets_http_scheme() {
        let url = parse_address("10.0.0.5").unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.5/");
        assert_eq!(url.join("app").unwrap().as_str(), "http://10.0.0.5/app");
    }

    #[test]
    fn full_url_keeps_scheme_port_and_path() {
        let url = parse_address("https://bridge.lan:8443/plug/").unwrap();
        assert_eq!(
            url.join("app").unwrap().as_str(),
            "https://bridge.lan:8443/plug/app"
        );
    }

    #[test]
    fn empty_address_is_rejected() {
        assert!(parse_address("").is_err());
    }
}
