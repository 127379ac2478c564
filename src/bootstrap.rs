//! Endpoint resolution performed before every connection attempt.
//!
//! The client never dials a fixed address: each attempt first asks a
//! [`Bootstrap`] for a fresh endpoint. [`HttpBootstrap`] performs the usual
//! `start` request against the service's HTTP API; [`bootstrap_fn`] adapts
//! any async closure.

use std::{fmt, future::Future};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

/// Errors raised while resolving an endpoint.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The HTTP request failed or its body could not be decoded.
    #[error("bootstrap request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("bootstrap rejected with status {0}")]
    Status(u16),
    /// The response did not name an endpoint.
    #[error("bootstrap response has no ws_host")]
    MissingEndpoint,
    /// Failure reported by a caller-supplied resolver.
    #[error("{0}")]
    Message(String),
}

impl BootstrapError {
    /// Build a [`BootstrapError::Message`].
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self { Self::Message(message.into()) }
}

/// Resolves the endpoint for the next connection attempt.
#[async_trait]
pub trait Bootstrap: Send + Sync + 'static {
    /// Return the endpoint to connect to.
    ///
    /// # Errors
    ///
    /// Returns a [`BootstrapError`] when no endpoint can be obtained. The
    /// client treats every failure as recoverable.
    async fn resolve(&self) -> Result<String, BootstrapError>;
}

/// [`Bootstrap`] wrapping an async closure. Built by [`bootstrap_fn`].
pub struct BootstrapFn<F>(F);

impl<F> fmt::Debug for BootstrapFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapFn").finish_non_exhaustive()
    }
}

/// Adapt an async closure into a [`Bootstrap`].
///
/// # Examples
///
/// ```
/// use tether::bootstrap::{Bootstrap, BootstrapError, bootstrap_fn};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), BootstrapError> {
/// let bootstrap = bootstrap_fn(|| async { Ok("ws://127.0.0.1:9000".to_owned()) });
/// assert_eq!(bootstrap.resolve().await?, "ws://127.0.0.1:9000");
/// # Ok(())
/// # }
/// ```
pub fn bootstrap_fn<F, Fut>(f: F) -> BootstrapFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, BootstrapError>> + Send + 'static,
{
    BootstrapFn(f)
}

#[async_trait]
impl<F, Fut> Bootstrap for BootstrapFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, BootstrapError>> + Send + 'static,
{
    async fn resolve(&self) -> Result<String, BootstrapError> { (self.0)().await }
}

/// Default base URL of the real-time API.
pub const DEFAULT_API_BASE: &str = "https://rtm.bearychat.com";

/// [`Bootstrap`] that posts the access token to `{api_base}/start` and reads
/// the socket host from the response.
///
/// Both `{"ws_host": ...}` and `{"result": {"ws_host": ...}}` bodies are
/// accepted.
#[derive(Clone)]
pub struct HttpBootstrap {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl fmt::Debug for HttpBootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBootstrap")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct StartResponse {
    ws_host: Option<String>,
    result: Option<StartResult>,
}

#[derive(Deserialize)]
struct StartResult {
    ws_host: Option<String>,
}

impl StartResponse {
    fn into_endpoint(self) -> Option<String> {
        self.ws_host.or_else(|| self.result.and_then(|r| r.ws_host))
    }
}

impl HttpBootstrap {
    /// Create a resolver for `token` against [`DEFAULT_API_BASE`].
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self { Self::with_api_base(DEFAULT_API_BASE, token) }

    /// Create a resolver for `token` against a custom API base URL.
    #[must_use]
    pub fn with_api_base(api_base: &str, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("{}/start", api_base.trim_end_matches('/')),
            token: token.into(),
        }
    }

    /// Endpoint the `start` request is posted to.
    #[must_use]
    pub fn url(&self) -> &str { &self.url }
}

#[async_trait]
impl Bootstrap for HttpBootstrap {
    async fn resolve(&self) -> Result<String, BootstrapError> {
        let response = self
            .http
            .post(&self.url)
            .json(&json!({ "token": self.token }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BootstrapError::Status(status.as_u16()));
        }
        let body: StartResponse = response.json().await?;
        let endpoint = body.into_endpoint().ok_or(BootstrapError::MissingEndpoint)?;
        debug!(%endpoint, "bootstrap resolved endpoint");
        Ok(endpoint)
    }
}
