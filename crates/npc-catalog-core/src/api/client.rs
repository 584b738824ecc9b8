//! API client for communicating with the NPC catalogue REST API.
//!
//! `ApiClient` owns the HTTP connection pool and a handle on the shared
//! `SessionStore`. Resource methods live next to their endpoints in the
//! sibling modules; this file holds the request plumbing.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::auth::{CurrentSession, SessionStore};
use crate::config::Config;

use super::refresh::RefreshCoordinator;
use super::{ApiError, Result};

/// Throwaway origin for building encoded paths
const SEGMENT_ROOT: &str = "http://localhost/";

/// API client for the catalogue backend.
/// Clone is cheap - the connection pool, session and refresh state are shared.
#[derive(Clone)]
pub struct ApiClient {
    pub(super) client: Client,
    base_url: Arc<str>,
    pub(super) session: Arc<SessionStore>,
    pub(super) refresher: Arc<RefreshCoordinator>,
    pub(super) public_preview: bool,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// Fails with `ApiError::InvalidUrl` when `config.api_url` is not an
    /// absolute http(s)-style URL.
    pub fn new(config: &Config, session: Arc<SessionStore>) -> Result<Self> {
        let base = Url::parse(&config.api_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{} ({})", config.api_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.api_url.clone()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: Arc::from(config.api_url.trim_end_matches('/')),
            session,
            refresher: Arc::new(RefreshCoordinator::new()),
            public_preview: config.public_preview,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Signed-in user and access token, if any
    pub fn current(&self) -> Option<CurrentSession> {
        self.session.current()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(super) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `prefix` plus `segment` percent-encoded as a single path segment, so
    /// an opaque value containing `/`, `?` or `#` stays inside its route.
    pub(super) fn segment_path(prefix: &str, segment: &str) -> Result<String> {
        let mut url = Url::parse(SEGMENT_ROOT)
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        url.set_path(prefix);
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(SEGMENT_ROOT.to_string()))?
            .pop_if_empty()
            .push(segment);
        Ok(url.path().to_string())
    }

    /// Check if response is successful, returning an error with body if not.
    pub(super) async fn check_response(response: Response) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    pub(super) async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let url = response.url().to_string();
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("{} (from {})", e, url)))
    }

    async fn attempt<F>(&self, method: &Method, url: &str, token: &str, attempt: u32, decorate: &F) -> Result<Response>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        debug!(method = %method, url = url, attempt, "Sending request");
        let request = self.client.request(method.clone(), url).bearer_auth(token);
        Ok(decorate(request).send().await?)
    }

    /// Send a request with the current access token.
    ///
    /// The token is read from the session at send time. A 401 triggers one
    /// session renewal and one retry with the renewed token; a second 401 is
    /// returned as `ApiError::Unauthorized`. `decorate` runs once per attempt
    /// so bodies that cannot be replayed (multipart) are rebuilt.
    pub(super) async fn send_authorized<F>(&self, method: Method, path: &str, decorate: F) -> Result<Response>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let url = self.url(path);
        let token = self.session.access_token().ok_or(ApiError::NotAuthenticated)?;

        let response = self.attempt(&method, &url, &token, 1, &decorate).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::check_response(response).await;
        }

        debug!(url = %url, "Access token rejected, renewing session");
        let renewed = self.renewed_access_token(&token).await?;

        let response = self.attempt(&method, &url, &renewed, 2, &decorate).await?;
        Self::check_response(response).await
    }

    /// Send a request without credentials.
    pub(super) async fn send_public(&self, method: Method, path: &str) -> Result<Response> {
        let url = self.url(path);
        debug!(method = %method, url = %url, "Sending public request");
        let response = self.client.request(method, &url).send().await?;
        Self::check_response(response).await
    }

    pub(super) async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(String, String)]) -> Result<T> {
        let response = self
            .send_authorized(Method::GET, path, |req| req.query(query))
            .await?;
        Self::parse_json(response).await
    }

    pub(super) async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .send_authorized(Method::POST, path, |req| req.json(body))
            .await?;
        Self::parse_json(response).await
    }

    pub(super) async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .send_authorized(Method::PUT, path, |req| req.json(body))
            .await?;
        Self::parse_json(response).await
    }

    pub(super) async fn delete(&self, path: &str) -> Result<()> {
        self.send_authorized(Method::DELETE, path, |req| req).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = Config::default().with_api_url("https://npc.example/api/");
        let session = Arc::new(SessionStore::new(MemoryTokenStore::new()));
        let client = ApiClient::new(&config, session).unwrap();

        assert_eq!(client.base_url(), "https://npc.example/api");
        assert_eq!(client.url("/npcs/3"), "https://npc.example/api/npcs/3");
    }

    #[test]
    fn test_invalid_api_url_is_rejected() {
        let session = Arc::new(SessionStore::new(MemoryTokenStore::new()));
        let config = Config::default().with_api_url("not a url");

        let result = ApiClient::new(&config, session);
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn test_segment_path_encodes_reserved_characters() {
        assert_eq!(ApiClient::segment_path("/preview", "f3a9c0").unwrap(), "/preview/f3a9c0");
        assert_eq!(
            ApiClient::segment_path("/preview", "a/b?c#d").unwrap(),
            "/preview/a%2Fb%3Fc%23d"
        );
    }

    #[tokio::test]
    async fn test_requests_need_a_session() {
        let config = Config::default().with_api_url("http://127.0.0.1:9");
        let session = Arc::new(SessionStore::new(MemoryTokenStore::new()));
        let client = ApiClient::new(&config, session).unwrap();

        let result = client.delete("/npcs/1").await;
        assert!(matches!(result, Err(ApiError::NotAuthenticated)));
    }
}
