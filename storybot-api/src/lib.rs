//! Client for the Storybot storytelling and tutoring API.
//!
//! This crate provides:
//! - Typed request/response contracts for every backend endpoint
//! - A thin async HTTP client with an optional API key header
//! - One error type for transport and application failures

pub mod error;
pub mod types;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub use error::{Error, INVALID_RESPONSE_CODE, TRANSPORT_STATUS};
pub use types::*;

/// Backend address used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:9999";
/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "X-API-Key";
/// Requests are abandoned after this long.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const BASE_URL_ENV: &str = "STORYBOT_API_URL";
const API_KEY_ENV: &str = "STORYBOT_API_KEY";

/// Where and how to reach the backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: REQUEST_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Read `STORYBOT_API_URL` and `STORYBOT_API_KEY`, falling back to defaults.
    pub fn from_env() -> Self {
        let base_url = std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty());

        Self {
            base_url,
            api_key,
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Storybot API client.
#[derive(Clone)]
pub struct StorybotClient {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
}

impl StorybotClient {
    /// Create a client for the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            headers.insert(
                API_KEY_HEADER,
                HeaderValue::from_str(key)
                    .map_err(|e| Error::config(format!("Invalid API key: {e}")))?,
            );
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    /// Create a client from the environment (see [`ClientConfig::from_env`]).
    pub fn from_env() -> Result<Self, Error> {
        Self::new(ClientConfig::from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ------------------------------------------------------------------------
    // Service
    // ------------------------------------------------------------------------

    /// `GET /` - service name, version and endpoint map.
    pub async fn service_info(&self) -> Result<ServiceInfo, Error> {
        self.get("/").await
    }

    /// `GET /health` - liveness and version probe.
    pub async fn health(&self) -> Result<HealthResponse, Error> {
        self.get("/health").await
    }

    // ------------------------------------------------------------------------
    // Story
    // ------------------------------------------------------------------------

    pub async fn story_filters(&self) -> Result<FiltersInfo, Error> {
        self.get("/story/filters").await
    }

    pub async fn start_story(&self, request: &StoryStartRequest) -> Result<StoryResponse, Error> {
        self.send(Method::POST, "/story/start", request).await
    }

    pub async fn continue_story(
        &self,
        request: &StoryContinueRequest,
    ) -> Result<StoryResponse, Error> {
        self.send(Method::POST, "/story/continue", request).await
    }

    pub async fn update_story_config(
        &self,
        request: &StoryConfigRequest,
    ) -> Result<StoryConfigResponse, Error> {
        self.send(Method::PUT, "/story/config", request).await
    }

    pub async fn story_session(&self, session_id: &str) -> Result<SessionInfo, Error> {
        self.get(&format!("/story/session/{session_id}")).await
    }

    // ------------------------------------------------------------------------
    // Tutor
    // ------------------------------------------------------------------------

    pub async fn start_tutor(&self, request: &TutorStartRequest) -> Result<TutorResponse, Error> {
        self.send(Method::POST, "/tutor/start", request).await
    }

    pub async fn ask_question(&self, request: &TutorAskRequest) -> Result<TutorResponse, Error> {
        self.send(Method::POST, "/tutor/ask", request).await
    }

    pub async fn update_tutor_config(
        &self,
        request: &ConfigRequest,
    ) -> Result<ConfigResponse, Error> {
        self.send(Method::PUT, "/tutor/config", request).await
    }

    pub async fn tutor_session(&self, session_id: &str) -> Result<SessionInfo, Error> {
        self.get(&format!("/tutor/session/{session_id}")).await
    }

    pub async fn tutor_subjects(&self) -> Result<SubjectsInfo, Error> {
        self.get("/tutor/subjects").await
    }

    // ------------------------------------------------------------------------
    // Shared configuration
    // ------------------------------------------------------------------------

    /// `PUT /config/session` - works for sessions of either mode.
    pub async fn update_session_config(
        &self,
        request: &ConfigRequest,
    ) -> Result<ConfigResponse, Error> {
        self.send(Method::PUT, "/config/session", request).await
    }

    /// `GET /config/filters` - filter catalogue with per-mode effects.
    pub async fn config_filters(&self) -> Result<FiltersInfo, Error> {
        self.get("/config/filters").await
    }

    /// `GET /config/system` - free-form server configuration document.
    pub async fn system_config(&self) -> Result<serde_json::Value, Error> {
        self.get("/config/system").await
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.execute(self.client.get(self.url(path)), "GET", path)
            .await
    }

    async fn send<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let label = method.to_string();
        let builder = self.client.request(method, self.url(path)).json(body);
        self.execute(builder, &label, path).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        method: &str,
        path: &str,
    ) -> Result<T, Error> {
        tracing::debug!(method, path, "sending request");

        let response = builder
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|e| {
                let err = Error::from(e);
                tracing::warn!(method, path, error = %err, "request failed before a response");
                err
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = Error::from_response(status.as_u16(), &body);
            tracing::warn!(method, path, status = status.as_u16(), error = %err, "request rejected");
            return Err(err);
        }

        let body = response.text().await?;
        serde_json::from_str::<T>(&body).map_err(|e| {
            let err = Error::invalid_response(status.as_u16(), e.to_string());
            tracing::warn!(method, path, status = status.as_u16(), error = %e, "response body did not decode");
            err
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}
