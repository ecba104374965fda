//! reqwest-backed ConsoleApi

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::service::ConsoleApi;
use super::types::{ApiError, MeResponse, ServerConfig, User};
use crate::session::SessionTracker;

pub const CONFIG_PATH: &str = "/api/v2/config/";
pub const ME_PATH: &str = "/api/v2/me/";
pub const LOGOUT_PATH: &str = "/api/logout/";

/// HTTP client for the controller API.
///
/// Every response passes through the session tracker before its status is
/// examined, so error responses can still resynchronize the expiry clock.
pub struct HttpConsoleApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    tracker: Arc<SessionTracker>,
}

impl HttpConsoleApi {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        request_timeout: Duration,
        tracker: Arc<SessionTracker>,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(ApiError::Transport)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            tracker,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            counter!("console_api_errors_total").increment(1);
            warn!("GET {} failed: {}", url, e);
            ApiError::Transport(e)
        })?;

        if self.tracker.observe_headers(response.headers()) {
            debug!("Session timeout hint received from {}", path);
        }

        let status = response.status();
        if !status.is_success() {
            counter!("console_api_errors_total").increment(1);
            let message = response.text().await.unwrap_or_default();
            debug!("GET {} returned {}", url, status);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.get(path).await?;
        response.json::<T>().await.map_err(ApiError::Decode)
    }
}

#[async_trait]
impl ConsoleApi for HttpConsoleApi {
    async fn read_config(&self) -> Result<ServerConfig, ApiError> {
        self.get_json(CONFIG_PATH).await
    }

    async fn read_me(&self) -> Result<User, ApiError> {
        let me: MeResponse = self.get_json(ME_PATH).await?;
        me.results.into_iter().next().ok_or(ApiError::EmptyIdentity)
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.get(LOGOUT_PATH).await?;
        Ok(())
    }
}
