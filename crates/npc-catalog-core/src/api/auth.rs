//! Session endpoints: login, logout, refresh and startup initialization.

use std::sync::Arc;

use futures::FutureExt;
use reqwest::{header, Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{AuthState, CurrentSession, SessionStore};
use crate::models::{TokenPair, User};

use super::refresh::{RefreshFuture, Refreshed, Renewal};
use super::{ApiClient, ApiError, Result};

const LOGIN_PATH: &str = "/auth/login";
const LOGOUT_PATH: &str = "/auth/logout";
const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(flatten)]
    tokens: TokenPair,
    data: User,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(rename = "access_token", alias = "accessToken")]
    access_token: String,
    data: User,
}

impl ApiClient {
    /// Exchange email and password for a token pair and profile.
    ///
    /// A 403 from the backend is reported as `ApiError::InvalidCredentials`
    /// and never retried. A pair that cannot be persisted is reported as
    /// `ApiError::Storage`.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let url = self.url(LOGIN_PATH);
        debug!(url = %url, "Sending login request");

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        if response.status() == StatusCode::FORBIDDEN {
            warn!("Login rejected");
            return Err(ApiError::InvalidCredentials);
        }
        let response = Self::check_response(response).await?;
        let login: LoginResponse = Self::parse_json(response).await?;

        // The pair stays usable in memory, but a login that will not survive
        // a restart is reported
        if let Err(e) = self.session.replace(login.tokens, login.data.clone()) {
            warn!(error = %e, "Failed to persist session tokens");
            return Err(ApiError::Storage(e));
        }
        info!(user_id = login.data.id, "Login successful");
        Ok(login.data)
    }

    /// End the session on the server, then forget it locally.
    ///
    /// Local tokens are cleared whatever the server answers. The server's
    /// outcome is still returned so callers can decide whether to show it.
    pub async fn logout(&self) -> Result<()> {
        // An expired access token is renewed before the server is asked to
        // revoke the session
        let outcome = if self.session.has_tokens() {
            debug!("Sending logout request");
            self.send_authorized(Method::POST, LOGOUT_PATH, |req| req)
                .await
                .map(|_| ())
        } else {
            Ok(())
        };

        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to clear persisted session");
        }
        match outcome {
            Ok(()) => info!("Logged out"),
            Err(ref e) => warn!(error = %e, "Server-side logout failed, session cleared locally"),
        }
        outcome
    }

    /// Renew the access token with the refresh token.
    ///
    /// Joins a refresh already in flight. On failure the stored tokens are
    /// cleared and `ApiError::RefreshFailed` is returned.
    pub async fn refresh(&self) -> Result<User> {
        if self.session.refresh_token().is_none() {
            return Err(ApiError::NotAuthenticated);
        }
        match self.refresher.renew(&self.session, None, || self.start_refresh()).await {
            Renewal::Refreshed(Ok(refreshed)) => Ok(refreshed.user),
            Renewal::Refreshed(Err(reason)) => Err(ApiError::RefreshFailed(reason)),
            Renewal::Current(_) => self.session.user().ok_or(ApiError::NotAuthenticated),
        }
    }

    /// Resolve the persisted session at startup.
    ///
    /// With stored tokens a refresh re-derives the profile; without them, or
    /// when the refresh fails, the result is `Unauthenticated` and nothing is
    /// left in storage.
    pub async fn initialize(&self) -> AuthState {
        if !self.session.has_tokens() {
            debug!("No persisted session");
            if let Err(e) = self.session.clear() {
                warn!(error = %e, "Failed to clear partial session");
            }
            return AuthState::Unauthenticated;
        }

        match self.refresh().await {
            Ok(user) => match self.session.access_token() {
                Some(access_token) => AuthState::Authenticated(CurrentSession { user, access_token }),
                None => AuthState::Unauthenticated,
            },
            Err(e) => {
                info!(error = %e, "Persisted session could not be restored");
                if let Err(e) = self.session.clear() {
                    warn!(error = %e, "Failed to clear stale session");
                }
                AuthState::Unauthenticated
            }
        }
    }

    /// Access token to retry with after `rejected` got a 401.
    pub(super) async fn renewed_access_token(&self, rejected: &str) -> Result<String> {
        match self.refresher.renew(&self.session, Some(rejected), || self.start_refresh()).await {
            Renewal::Current(token) => Ok(token),
            Renewal::Refreshed(Ok(refreshed)) => Ok(refreshed.access_token),
            Renewal::Refreshed(Err(_)) => Err(ApiError::Unauthorized),
        }
    }

    /// Build the shared refresh future. It owns everything it touches so it
    /// keeps running for the remaining waiters if the starter is dropped.
    fn start_refresh(&self) -> RefreshFuture {
        let client = self.client.clone();
        let url = self.url(REFRESH_PATH);
        let session = Arc::clone(&self.session);
        async move { Self::run_refresh(client, url, session).await }.boxed()
    }

    async fn run_refresh(client: Client, url: String, session: Arc<SessionStore>) -> std::result::Result<Refreshed, String> {
        let refresh_token = session
            .refresh_token()
            .ok_or_else(|| "no refresh token held".to_string())?;

        match Self::request_refresh(&client, &url, &refresh_token).await {
            Ok(response) => {
                let refreshed = Refreshed {
                    access_token: response.access_token,
                    user: response.data,
                };
                match session.rotate_access(&refresh_token, refreshed.access_token.clone(), refreshed.user.clone()) {
                    Ok(true) => {}
                    Ok(false) => return Err("session changed while refreshing".to_string()),
                    Err(e) => warn!(error = %e, "Failed to persist refreshed token"),
                }
                info!(user_id = refreshed.user.id, "Session refreshed");
                Ok(refreshed)
            }
            Err(e) => {
                warn!(error = %e, "Session refresh failed, signing out");
                if let Err(e) = session.clear_if_refresh(&refresh_token) {
                    warn!(error = %e, "Failed to clear persisted session");
                }
                Err(e.to_string())
            }
        }
    }

    async fn request_refresh(client: &Client, url: &str, refresh_token: &str) -> Result<RefreshResponse> {
        debug!(url = url, "Sending refresh request");
        let response = client
            .get(url)
            .header(header::AUTHORIZATION, format!("Refresh {}", refresh_token))
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        Self::parse_json(response).await
    }
}
