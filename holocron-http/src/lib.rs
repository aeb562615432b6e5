//! Minimal HTTP client with safe logging, optional retries, and query-param auth.
//!
//! - Request options: query params and an optional secret query param (`QueryAuth`)
//! - Redacts sensitive query params and never logs secret values, including the
//!   request URL that reqwest embeds in transport errors
//! - Retries 429/5xx with exponential backoff and `Retry-After` support, but only
//!   when a retry budget is configured (the default budget is zero)
//! - Optional *raw* request/response logging via `HOLOCRON_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), holocron_http::HttpError> {
//! let client = holocron_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .get_json("v1/items", holocron_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), retries and final errors, plus
//! raw request/response lines (target `http.raw`) when `HOLOCRON_HTTP_RAW=1`.

use holocron_common::HolocronError;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::env;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "HOLOCRON_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)
const REDACTED: &str = "<redacted>";

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Render a best-effort curl command for repro/debug from an already redacted query.
fn make_curl(method: &Method, url: &Url, query: &[(String, String)]) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    if !query.is_empty() {
        let mut pairs = shown.query_pairs_mut();
        for (k, v) in query {
            pairs.append_pair(k, v);
        }
    }
    format!("curl -X{} '{}'", method, shown.as_str())
}

/// Redact sensitive response headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let val = if is_secret_name(&key) {
                REDACTED.into()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
            (key, val)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl From<HttpError> for HolocronError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Api {
                status, message, ..
            } => HolocronError::HttpStatus {
                status: status.as_u16(),
                message,
            },
            HttpError::Network(msg) => HolocronError::Network(msg),
            HttpError::Decode(msg, snippet) => {
                HolocronError::Decode(format!("{msg}, body_snippet: {snippet}"))
            }
            HttpError::Url(msg) | HttpError::Build(msg) => HolocronError::Configuration(msg),
        }
    }
}

// ==============================
// Auth & Request Options
// ==============================

/// Secret sent as a query parameter (Tumblr: `api_key`).
///
/// ```
/// use holocron_http::QueryAuth;
///
/// let auth = QueryAuth::new("api_key", "secret");
/// assert_eq!(auth.name, "api_key");
/// ```
#[derive(Clone, Debug)]
pub struct QueryAuth<'a> {
    pub name: &'a str,
    pub value: Cow<'a, str>,
}

impl<'a> QueryAuth<'a> {
    pub fn new(name: &'a str, value: impl Into<Cow<'a, str>>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// Per-request parameters for the HTTP client.
///
/// ```
/// use holocron_http::{QueryAuth, RequestOpts};
///
/// let opts = RequestOpts {
///     auth: Some(QueryAuth::new("api_key", "demo")),
///     query: Some(vec![("tag", "Andor".into())]),
/// };
///
/// assert_eq!(opts.query.as_ref().map(Vec::len), Some(1));
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub auth: Option<QueryAuth<'a>>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>, // e.g. [("tag", "Andor".into())]
}

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    /// `None` leaves requests unbounded.
    pub default_timeout: Option<Duration>,
    pub max_retries: usize,
}

impl HttpClient {
    /// Construct a client anchored to a base URL, with no timeout and no retries.
    ///
    /// ```no_run
    /// use holocron_http::{HttpClient, HttpError};
    ///
    /// let client = HttpClient::new("https://api.example.com")?;
    /// assert_eq!(client.default_timeout, None);
    /// assert_eq!(client.max_retries, 0);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: None,
            max_retries: 0,
        })
    }

    /// Bound every request by `dur`.
    ///
    /// ```no_run
    /// use holocron_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com")?
    ///     .with_timeout(Duration::from_secs(2));
    /// assert_eq!(client.default_timeout, Some(Duration::from_secs(2)));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = Some(dur);
        self
    }

    /// Override the default retry budget returned by [`HttpClient::new`].
    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    /// GET JSON from `path` (relative to the base URL).
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.request_json_internal(Method::GET, path, opts).await
    }

    // ==============================
    // Core request implementation
    // ==============================

    async fn request_json_internal<T>(
        &self,
        method: Method,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let url = self
            .base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))?;

        // Query auth is folded into the query once so retries resend it.
        let mut query: Vec<(&str, Cow<'_, str>)> = opts.query.unwrap_or_default();
        if let Some(QueryAuth { name, value }) = opts.auth {
            query.push((name, value));
        }

        let secrets: Vec<&str> = query
            .iter()
            .filter(|(k, v)| is_secret_name(k) && !v.is_empty())
            .map(|(_, v)| v.as_ref())
            .collect();

        let redacted_q: Vec<(String, String)> = query
            .iter()
            .map(|(k, v)| {
                let shown = if is_secret_name(k) {
                    REDACTED.to_string()
                } else {
                    v.as_ref().to_string()
                };
                ((*k).to_string(), shown)
            })
            .collect();

        let mut attempt = 0usize;
        let max_retries = self.max_retries;
        let timeout = self.default_timeout;

        loop {
            // ----- Build request -----
            let mut rb = self.inner.request(method.clone(), url.clone());
            if let Some(timeout) = timeout {
                rb = rb.timeout(timeout);
            }
            if !query.is_empty() {
                let pairs: Vec<(&str, &str)> =
                    query.iter().map(|(k, v)| (*k, v.as_ref())).collect();
                rb = rb.query(&pairs);
            }

            // Lightweight request id without extra deps
            let req_id = format!(
                "r{:x}",
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_nanos()
            );

            tracing::debug!(
                req_id=%req_id,
                attempt=attempt + 1,
                max_retries,
                method=%method,
                host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
                query=?redacted_q,
                timeout_ms=timeout.map(|t| t.as_millis() as u64),
                "http.request.start"
            );

            if raw_enabled() {
                let curl = make_curl(&method, &url, &redacted_q);
                tracing::debug!(target: "http.raw", %req_id, %curl, "request");
            }

            // ----- Send -----
            let t0 = std::time::Instant::now();
            let resp = match rb.send().await {
                Ok(resp) => resp,
                Err(err) => {
                    let message = network_message(err, &secrets);
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_retries,
                            backoff_ms=delay.as_millis() as u64,
                            message=%message,
                            "http.retrying.network_send"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(
                        req_id=%req_id,
                        attempt,
                        max_retries,
                        message=%message,
                        "http.network_error.send"
                    );
                    return Err(HttpError::Network(message));
                }
            };
            let status = resp.status();
            let headers = resp.headers().clone();
            let bytes = match resp.bytes().await {
                Ok(bytes) => bytes,
                Err(err) => {
                    let message = network_message(err, &secrets);
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_retries,
                            backoff_ms=delay.as_millis() as u64,
                            message=%message,
                            "http.retrying.network_body"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(
                        req_id=%req_id,
                        attempt,
                        max_retries,
                        message=%message,
                        "http.network_error.body"
                    );
                    return Err(HttpError::Network(message));
                }
            };
            let dur_ms = t0.elapsed().as_millis() as u64;

            let req_hdr_id = headers
                .get("x-request-id")
                .or_else(|| headers.get("x-correlation-id"))
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");

            // Tumblr reports its per-key quota in these headers.
            let limit = headers
                .get("x-ratelimit-perday-limit")
                .and_then(|v| v.to_str().ok());
            let remain = headers
                .get("x-ratelimit-perday-remaining")
                .and_then(|v| v.to_str().ok());

            tracing::debug!(
                req_id=%req_id,
                %status,
                duration_ms=dur_ms,
                body_len=bytes.len(),
                x_request_id=%req_hdr_id,
                rate_limit.limit=?limit,
                rate_limit.remaining=?remain,
                "http.response.headers"
            );

            if raw_enabled() {
                let hdrs = redact_headers(&headers);
                let mut body_snip = bytes.to_vec();
                let truncated = body_snip.len() > RAW_MAX_BODY;
                if truncated {
                    body_snip.truncate(RAW_MAX_BODY);
                }
                let text = String::from_utf8_lossy(&body_snip);
                tracing::info!(
                    target:"http.raw",
                    %req_id,
                    status=%status,
                    duration_ms=dur_ms,
                    headers=?hdrs,
                    body=%text,
                    truncated
                );
            }

            let snippet = snip_body(&bytes);
            tracing::trace!(
                req_id=%req_id,
                body_snippet=%snippet,
                "http.response.body_snippet"
            );

            // ----- Success path -----
            if status.is_success() {
                return serde_json::from_slice::<T>(&bytes).map_err(|e| {
                    tracing::warn!(
                        req_id=%req_id,
                        serde_line=%e.line(),
                        serde_col=%e.column(),
                        serde_err=%e.to_string(),
                        body_snippet=%snippet,
                        "http.response.decode_error"
                    );
                    HttpError::Decode(e.to_string(), snippet)
                });
            }

            // ----- Non-success: maybe retry -----
            let message = extract_error_message_multi(&bytes);
            let request_id = req_hdr_id.to_string();

            let is_429 = status == StatusCode::TOO_MANY_REQUESTS;
            let is_5xx = status.is_server_error();

            if (is_429 || is_5xx) && attempt < max_retries {
                attempt += 1;
                let delay = retry_delay(status, attempt, &headers);
                tracing::warn!(
                    req_id=%req_id,
                    %status,
                    attempt,
                    max_retries,
                    backoff_ms=delay.as_millis() as u64,
                    message=%message,
                    body_snippet=%snippet,
                    "http.retrying"
                );
                sleep(delay).await;
                continue;
            }

            tracing::warn!(
                req_id=%req_id,
                %status,
                message=%message,
                x_request_id=%request_id,
                body_snippet=%snippet,
                "http.error"
            );
            return Err(HttpError::Api {
                status,
                message,
                request_id,
            });
        }
    }
}

// ==============================
// Helpers
// ==============================

const RATE_LIMIT_FLOOR: Duration = Duration::from_millis(1100);

fn backoff(attempt: usize) -> Duration {
    let shift = attempt.saturating_sub(1).min(16) as u32;
    Duration::from_millis(200u64.saturating_mul(1 << shift))
}

/// Delay before the next attempt: `Retry-After` wins, 429 gets a floor.
fn retry_delay(status: StatusCode, attempt: usize, headers: &HeaderMap) -> Duration {
    if let Some(secs) = retry_after_delay_secs(headers) {
        Duration::from_secs(secs)
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        backoff(attempt).max(RATE_LIMIT_FLOOR)
    } else {
        backoff(attempt)
    }
}

/// Describe a transport failure without the request URL or any secret value.
fn network_message(err: reqwest::Error, secrets: &[&str]) -> String {
    let err = err.without_url();
    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    for secret in secrets {
        message = message.replace(*secret, REDACTED);
    }
    message
}

fn is_secret_name(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "access_token"
            | "authorization"
            | "auth"
            | "key"
            | "api_key"
            | "token"
            | "secret"
            | "client_secret"
            | "bearer"
            | "oauth_token"
    )
}

fn extract_error_message_multi(body: &[u8]) -> String {
    // Tumblr: {"meta":{"status":401,"msg":"Unauthorized"},"errors":[{"title":"...","detail":"..."}]}
    #[derive(Deserialize)]
    struct TumblrEnv {
        #[serde(default)]
        meta: Option<TumblrMeta>,
        #[serde(default)]
        errors: Vec<TumblrErr>,
    }
    #[derive(Deserialize)]
    struct TumblrMeta {
        #[serde(default)]
        msg: String,
    }
    #[derive(Deserialize)]
    struct TumblrErr {
        #[serde(default)]
        detail: String,
        #[serde(default)]
        title: String,
    }

    // Generic: {"message":"..."} or {"detail":"..."} or {"error":"..."}
    #[derive(Deserialize)]
    struct Msg {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(env) = serde_json::from_slice::<TumblrEnv>(body) {
        if let Some(first) = env.errors.into_iter().next() {
            if !first.detail.is_empty() {
                return first.detail;
            }
            if !first.title.is_empty() {
                return first.title;
            }
        }
        if let Some(meta) = env.meta {
            if !meta.msg.is_empty() {
                return meta.msg;
            }
        }
    }
    if let Ok(m) = serde_json::from_slice::<Msg>(body) {
        if !m.message.is_empty() {
            return m.message;
        }
        if !m.detail.is_empty() {
            return m.detail;
        }
        if !m.error.is_empty() {
            return m.error;
        }
    }
    snip_body(body)
}

fn retry_after_delay_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .parse()
        .ok()
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > 500 {
        let mut cut = 500;
        while !snip.is_char_boundary(cut) {
            cut -= 1;
        }
        snip.truncate(cut);
        snip.push_str("...");
    }
    snip
}
