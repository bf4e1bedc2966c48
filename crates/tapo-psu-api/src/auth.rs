// Device authentication
//
// `login_device` exchanges username/password for a session token. The
// token is stored on the client and appended to every later request.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::client::TapoClient;
use crate::error::Error;
use crate::models::{LoginParams, LoginResult};

impl TapoClient {
    /// Authenticate with the plug using the cloud account credentials.
    ///
    /// On success the session token is stored and used for all subsequent
    /// requests. Rejected credentials surface as [`Error::Authentication`].
    pub async fn login(&mut self, username: &str, password: &SecretString) -> Result<(), Error> {
        debug!("logging in at {}", self.base_url());

        let params = LoginParams {
            username,
            password: password.expose_secret(),
        };
        let result: LoginResult = self.call("login_device", Some(params)).await?;

        if result.token.is_empty() {
            return Err(Error::Authentication {
                message: "device returned an empty session token".into(),
            });
        }

        self.set_token(SecretString::from(result.token));
        debug!("login successful");
        Ok(())
    }
}
