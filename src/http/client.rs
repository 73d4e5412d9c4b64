//! Resilient HTTP client for the Pollinations.AI API.
//!
//! Every feature module issues its requests through [`PollinationsClient`],
//! which injects authentication, enforces a per-attempt timeout, and retries
//! failed attempts with exponential backoff, honoring `Retry-After` on 429.

use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, REFERER, RETRY_AFTER, USER_AGENT};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;

/// Image generation endpoint.
pub const IMAGE_API: &str = "https://image.pollinations.ai";

/// Text, chat, vision and audio endpoint.
pub const TEXT_API: &str = "https://text.pollinations.ai";

/// Default referrer identity (seed tier).
pub const DEFAULT_REFERRER: &str = "s-test-sk37AGI";

/// Default number of retry attempts after the initial request.
pub const DEFAULT_MAX_RETRIES: u32 = 4;

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Backoff delays are capped at this many seconds (before jitter).
const MAX_BACKOFF_SECS: f64 = 32.0;

const USER_AGENT_STRING: &str = "PolliLib/0.1 Rust Client";

/// How much of an error body to keep for diagnostics.
const ERROR_BODY_LIMIT: usize = 512;

/// API client errors.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP error {status}: {body}")]
    Http { status: StatusCode, body: String },
    #[error("rate limited (HTTP 429)")]
    RateLimited { retry_after: Option<u64> },
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client configuration. Immutable once the client is constructed.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Referrer string identifying the caller (web-tier auth).
    pub referrer: String,
    /// Bearer token for backend auth. Takes precedence over the referrer.
    pub bearer_token: Option<String>,
    /// Retry attempts after the initial request.
    pub max_retries: u32,
    /// Per-attempt timeout. `None` disables it (streaming responses).
    pub timeout: Option<Duration>,
    /// Text/chat endpoint base URL.
    pub text_api: String,
    /// Image endpoint base URL.
    pub image_api: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            referrer: DEFAULT_REFERRER.to_string(),
            bearer_token: None,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: Some(DEFAULT_TIMEOUT),
            text_api: TEXT_API.to_string(),
            image_api: IMAGE_API.to_string(),
        }
    }
}

impl ClientConfig {
    /// Set a custom referrer identity.
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = referrer.into();
        self
    }

    /// Set a bearer token for backend authentication.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Set the maximum number of retry attempts for failed requests.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Point the client at a different text endpoint (tests, proxies).
    pub fn with_text_api(mut self, base: impl Into<String>) -> Self {
        self.text_api = base.into();
        self
    }

    /// Point the client at a different image endpoint (tests, proxies).
    pub fn with_image_api(mut self, base: impl Into<String>) -> Self {
        self.image_api = base.into();
        self
    }

    /// Read configuration from `POLLINATIONS_REFERRER` and
    /// `POLLINATIONS_TOKEN`, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(referrer) = std::env::var("POLLINATIONS_REFERRER") {
            config.referrer = referrer;
        }
        if let Ok(token) = std::env::var("POLLINATIONS_TOKEN") {
            if !token.is_empty() {
                config.bearer_token = Some(token);
            }
        }
        config
    }
}

/// Timeout policy for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeout {
    /// Use the client's configured timeout.
    #[default]
    Default,
    /// No timeout. Required for SSE streaming responses.
    Disabled,
    /// Override the configured timeout for this request only.
    After(Duration),
}

/// Request body payload.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(Value),
    Bytes(Vec<u8>),
}

/// Typed request options merged over the client's identity headers.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
    pub timeout: Timeout,
}

impl RequestOptions {
    /// A plain GET request.
    pub fn get() -> Self {
        Self::default()
    }

    /// A POST request with a JSON body.
    pub fn post_json(payload: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(RequestBody::Json(payload)),
            ..Self::default()
        }
    }

    /// Add a header to this request.
    pub fn header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Override the timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Timeout::After(timeout);
        self
    }

    /// Disable the timeout for this request (streaming).
    pub fn no_timeout(mut self) -> Self {
        self.timeout = Timeout::Disabled;
        self
    }
}

/// Calculate an exponential backoff delay with jitter.
///
/// The base delay is `min(2^attempt, max_delay_secs)` seconds; up to 10%
/// of the base delay is added as jitter to desynchronize concurrent
/// retriers.
pub fn exponential_backoff(attempt: u32, max_delay_secs: f64) -> Duration {
    let delay = 2f64.powi(attempt as i32).min(max_delay_secs);
    let jitter = rand::thread_rng().gen::<f64>() * delay * 0.1;
    Duration::from_secs_f64(delay + jitter)
}

/// Client for the Pollinations.AI API with retry and backoff.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct PollinationsClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl PollinationsClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Create a new client with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ClientConfig::default())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start building a URL on the configured text endpoint.
    pub fn text_endpoint(&self) -> Result<super::url::UrlBuilder, ApiError> {
        super::url::UrlBuilder::new(&self.config.text_api)
    }

    /// Start building a URL on the configured image endpoint.
    pub fn image_endpoint(&self) -> Result<super::url::UrlBuilder, ApiError> {
        super::url::UrlBuilder::new(&self.config.image_api)
    }

    /// Issue one logical request, retrying failed attempts.
    ///
    /// The first 2xx response is returned immediately. Network errors,
    /// timeouts, non-2xx statuses and 429 rate limits are all retried with
    /// exponential backoff (429 sleeps for the server's `Retry-After` when
    /// sent) until `max_retries + 1` total attempts are exhausted, at which
    /// point the last error is returned.
    pub async fn execute(&self, url: Url, options: RequestOptions) -> Result<reqwest::Response, ApiError> {
        let url = self.apply_referrer_param(url);
        let headers = self.build_headers(&options.headers)?;
        let timeout = match options.timeout {
            Timeout::Default => self.config.timeout,
            Timeout::Disabled => None,
            Timeout::After(budget) => Some(budget),
        };

        let max_attempts = self.config.max_retries + 1;
        let mut last_error: Option<ApiError> = None;

        for attempt in 0..max_attempts {
            match self.send_once(&url, &options, &headers, timeout).await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = response
                            .headers()
                            .get(RETRY_AFTER)
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.trim().parse::<u64>().ok());
                        last_error = Some(ApiError::RateLimited { retry_after });

                        if attempt + 1 < max_attempts {
                            // Honor the server's delay when it sends one.
                            let wait = retry_after
                                .map(Duration::from_secs)
                                .unwrap_or_else(|| exponential_backoff(attempt, MAX_BACKOFF_SECS));
                            tracing::warn!(
                                attempt = attempt + 1,
                                max_attempts,
                                wait_secs = wait.as_secs_f64(),
                                "rate limited, waiting before retry"
                            );
                            sleep(wait).await;
                        }
                    } else if !status.is_success() {
                        let mut body = response.text().await.unwrap_or_default();
                        if body.len() > ERROR_BODY_LIMIT {
                            // Truncate on a char boundary.
                            let mut end = ERROR_BODY_LIMIT;
                            while !body.is_char_boundary(end) {
                                end -= 1;
                            }
                            body.truncate(end);
                        }
                        last_error = Some(ApiError::Http { status, body });

                        if attempt + 1 < max_attempts {
                            let wait = exponential_backoff(attempt, MAX_BACKOFF_SECS);
                            tracing::warn!(
                                attempt = attempt + 1,
                                max_attempts,
                                status = status.as_u16(),
                                wait_secs = wait.as_secs_f64(),
                                "HTTP error, retrying"
                            );
                            sleep(wait).await;
                        }
                    } else {
                        tracing::debug!(attempt = attempt + 1, status = status.as_u16(), "request succeeded");
                        return Ok(response);
                    }
                }
                Err(e) => {
                    if attempt + 1 < max_attempts {
                        let wait = exponential_backoff(attempt, MAX_BACKOFF_SECS);
                        tracing::warn!(
                            attempt = attempt + 1,
                            max_attempts,
                            error = %e,
                            wait_secs = wait.as_secs_f64(),
                            "request failed, retrying"
                        );
                        last_error = Some(e);
                        sleep(wait).await;
                    } else {
                        last_error = Some(e);
                    }
                }
            }
        }

        // All attempts exhausted; surface the last error unmodified.
        Err(last_error.unwrap_or_else(|| ApiError::InvalidRequest("no attempts were made".to_string())))
    }

    /// Convenience: GET a URL and return the raw response.
    pub async fn get(&self, url: Url) -> Result<reqwest::Response, ApiError> {
        self.execute(url, RequestOptions::get()).await
    }

    /// Convenience: GET a URL and decode the body as JSON.
    pub async fn get_json(&self, url: Url) -> Result<Value, ApiError> {
        let response = self.get(url).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Convenience: GET a URL and return the body bytes with content type.
    pub async fn get_bytes(&self, url: Url, options: RequestOptions) -> Result<(bytes::Bytes, Option<String>), ApiError> {
        let response = self.execute(url, options).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let data = response.bytes().await.map_err(ApiError::Network)?;
        Ok((data, content_type))
    }

    /// Convenience: POST a JSON payload and decode the body as JSON.
    pub async fn post_json(&self, url: Url, payload: Value) -> Result<Value, ApiError> {
        let response = self.execute(url, RequestOptions::post_json(payload)).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Send a single attempt, bounded by `timeout` if one is set.
    async fn send_once(
        &self,
        url: &Url,
        options: &RequestOptions,
        headers: &HeaderMap,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut request = self
            .http
            .request(options.method.clone(), url.clone())
            .headers(headers.clone());

        request = match &options.body {
            Some(RequestBody::Json(value)) => request.json(value),
            Some(RequestBody::Bytes(data)) => request.body(data.clone()),
            None => request,
        };

        let response = match timeout {
            Some(budget) => tokio::time::timeout(budget, request.send())
                .await
                .map_err(|_| ApiError::Timeout(budget))??,
            None => request.send().await?,
        };

        Ok(response)
    }

    /// Merge caller headers over the identity header set.
    fn build_headers(&self, extra: &HeaderMap) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));

        let referer = HeaderValue::from_str(&self.config.referrer)
            .map_err(|_| ApiError::InvalidRequest("referrer is not a valid header value".to_string()))?;
        headers.insert(REFERER, referer);

        if let Some(token) = &self.config.bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ApiError::InvalidRequest("bearer token is not a valid header value".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        for (name, value) in extra {
            headers.insert(name.clone(), value.clone());
        }

        Ok(headers)
    }

    /// Append the referrer as a query parameter when no bearer token is
    /// configured. Some runtimes strip custom headers, so the referrer
    /// travels on both channels.
    fn apply_referrer_param(&self, mut url: Url) -> Url {
        if self.config.bearer_token.is_none() && !self.config.referrer.is_empty() {
            url.query_pairs_mut()
                .append_pair("referrer", &self.config.referrer);
        }
        url
    }
}
