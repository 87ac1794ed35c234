//! Auth endpoints.

use crate::client::{Client, Ignored};
use crate::config::RequestConfig;
use crate::error::RequestError;
use crate::http::HttpMethod;
use crate::session::AuthSession;
use crate::types::{LoginRequest, LoginResponse, User};

const LOGIN: &str = "/v1/auth/login";
const LOGOUT: &str = "/v1/auth/logout";
const CURRENT_USER: &str = "/v1/users/me";

#[derive(Debug, Clone, Copy)]
pub struct AuthApi<'a> {
    client: &'a Client,
}

impl<'a> AuthApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Exchange credentials for a token. Sent without any stale bearer.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, RequestError> {
        self.client
            .post(LOGIN, credentials, RequestConfig::new().skip_auth(true))
            .await
    }

    pub async fn logout(&self) -> Result<(), RequestError> {
        let _: Ignored = self
            .client
            .request(LOGOUT, RequestConfig::new().method(HttpMethod::Post))
            .await?;
        Ok(())
    }

    pub async fn current_user(&self) -> Result<User, RequestError> {
        self.client.get(CURRENT_USER, RequestConfig::new()).await
    }

    /// Log in, store the token in `session`, then load the profile.
    ///
    /// The session must be the one the client reads its token from.
    pub async fn sign_in(&self, session: &AuthSession, credentials: &LoginRequest) -> Result<User, RequestError> {
        let LoginResponse { token, .. } = self.login(credentials).await?;
        session.login(None, token.clone());
        let user = self.current_user().await?;
        session.login(Some(user.clone()), token);
        tracing::info!(username = %user.username, "signed in");
        Ok(user)
    }

    /// Best-effort server logout followed by a local session clear.
    pub async fn sign_out(&self, session: &AuthSession) {
        if let Err(e) = self.logout().await {
            tracing::warn!(error = %e, "server logout failed");
        }
        session.logout();
    }
}
