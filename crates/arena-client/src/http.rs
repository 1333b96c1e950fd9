//! HTTP implementation of the account directory
//!
//! Talks JSON to the backend's `/auth` endpoints:
//!
//! | Operation              | Request                          | Success body |
//! |------------------------|----------------------------------|--------------|
//! | `validate_credentials` | `POST /auth/login`               | `AuthGrant`  |
//! | `register`             | `POST /auth/register`            | `AuthGrant`  |
//! | `resume_session`       | `GET /auth/session` + bearer     | `UserProfile`|
//! | `end_session`          | `DELETE /auth/session` + bearer  | empty        |
//!
//! Error bodies use `{ "error": "...", "message": "..." }`. Network-class
//! failures of login, resume and end are retried with exponential backoff.
//! Registration is sent once: a lost response may still have created the
//! account, and repeating it would report a conflict for that account.

use crate::directory::{DirectoryError, Result, UserDirectory};
use crate::profile::{AuthGrant, NewAccount, SessionToken, UserProfile};
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Configuration for [`HttpUserDirectory`]
#[derive(Debug, Clone)]
pub struct HttpDirectoryConfig {
    /// Base service URL, without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Retries after the first attempt for retryable failures
    pub max_retries: usize,
    /// Delay before the first retry; doubles on each further retry
    pub initial_retry_delay: Duration,
    /// Upper bound for a single retry delay
    pub max_retry_delay: Duration,
}

impl Default for HttpDirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.arenaplay.in".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("Arena-Play/{}", env!("CARGO_PKG_VERSION")),
            max_retries: 2,
            initial_retry_delay: Duration::from_millis(250),
            max_retry_delay: Duration::from_secs(5),
        }
    }
}

impl HttpDirectoryConfig {
    /// Create a config for a base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the retry policy
    pub fn with_retries(mut self, max_retries: usize, initial_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.initial_retry_delay = initial_delay;
        self
    }

    fn retry_delay(&self, attempt: usize) -> Duration {
        let factor = 2u32.saturating_pow(attempt as u32);
        self.initial_retry_delay
            .saturating_mul(factor)
            .min(self.max_retry_delay)
    }
}

#[derive(Serialize)]
struct LoginInput<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

/// Account directory backed by the Arena Play backend
#[derive(Debug, Clone)]
pub struct HttpUserDirectory {
    client: ReqwestClient,
    config: HttpDirectoryConfig,
}

fn network_error(err: reqwest::Error) -> DirectoryError {
    DirectoryError::Network(err.to_string())
}

impl HttpUserDirectory {
    /// Create a directory client
    pub fn new(config: HttpDirectoryConfig) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(network_error)?;

        Ok(Self { client, config })
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpDirectoryConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut attempt_fn: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_delay(attempt);
                    tracing::debug!(operation, attempt, ?delay, error = %err, "retrying directory request");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Send a request and decode the success body, mapping error statuses
    /// through `classify`.
    async fn send<T>(
        &self,
        request: RequestBuilder,
        classify: impl Fn(StatusCode, ErrorBody) -> DirectoryError,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let body = self.send_raw(request, classify).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Send a request and return the raw success body
    async fn send_raw(
        &self,
        request: RequestBuilder,
        classify: impl Fn(StatusCode, ErrorBody) -> DirectoryError,
    ) -> Result<String> {
        let response = request.send().await.map_err(network_error)?;
        let status = response.status();
        let body = response.text().await.map_err(network_error)?;

        if !status.is_success() {
            let error = serde_json::from_str::<ErrorBody>(&body).unwrap_or(ErrorBody {
                error: "Unknown".to_string(),
                message: format!("HTTP {}: {}", status.as_u16(), body),
            });
            return Err(classify(status, error));
        }

        Ok(body)
    }
}

fn api_error(status: StatusCode, body: ErrorBody) -> DirectoryError {
    let message = if body.message.is_empty() { body.error } else { body.message };
    DirectoryError::Api { status: status.as_u16(), message }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn validate_credentials(&self, email: &str, password: &str) -> Result<AuthGrant> {
        self.with_retry("validate_credentials", move || {
            let request = self
                .client
                .post(self.url("/auth/login"))
                .json(&LoginInput { email, password });
            self.send(request, |status, body| match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    DirectoryError::InvalidCredentials
                }
                _ => api_error(status, body),
            })
        })
        .await
    }

    async fn register(&self, account: &NewAccount) -> Result<AuthGrant> {
        let request = self.client.post(self.url("/auth/register")).json(account);
        self.send(request, |status, body| match status {
            StatusCode::CONFLICT => DirectoryError::AccountExists(account.email.clone()),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                DirectoryError::Rejected(if body.message.is_empty() {
                    body.error
                } else {
                    body.message
                })
            }
            _ => api_error(status, body),
        })
        .await
    }

    async fn resume_session(&self, token: &SessionToken) -> Result<UserProfile> {
        if token.is_expired() {
            return Err(DirectoryError::SessionExpired);
        }

        let bearer = token.as_str();
        self.with_retry("resume_session", move || {
            let request = self.client.get(self.url("/auth/session")).bearer_auth(bearer);
            self.send(request, |status, body| match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DirectoryError::SessionExpired,
                _ => api_error(status, body),
            })
        })
        .await
    }

    async fn end_session(&self, token: &SessionToken) -> Result<()> {
        if token.is_expired() {
            return Ok(());
        }

        let bearer = token.as_str();
        let ended = self
            .with_retry("end_session", move || {
                let request = self.client.delete(self.url("/auth/session")).bearer_auth(bearer);
                self.send_raw(request, |status, body| match status {
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                        DirectoryError::SessionExpired
                    }
                    _ => api_error(status, body),
                })
            })
            .await;

        match ended {
            Ok(_) | Err(DirectoryError::SessionExpired) => Ok(()),
            Err(err) => Err(err),
        }
    }
}
