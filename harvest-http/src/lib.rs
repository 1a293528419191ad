//! Small JSON-over-HTTP client shared by the platform collectors.
//!
//! - GET with query parameters, or POST a urlencoded form; decode JSON
//! - [`Auth`] covers what the collectors need: bearer, basic, query key
//! - Structured `tracing` events per request, with secrets redacted
//! - Retries 429/5xx with exponential backoff and `Retry-After`, but only
//!   when a retry budget is configured (the default budget is zero)
//! - Optional *raw* request/response logging via `HARVEST_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), harvest_http::HttpError> {
//! let client = harvest_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .get_json("v1/items", harvest_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::time::{Duration, Instant};
use tokio::time::sleep;

mod error;
mod redact;
mod retry;

pub use error::HttpError;

/// How a request proves who it is.
///
/// ```
/// use harvest_http::Auth;
///
/// let bearer = Auth::Bearer("token");
/// match bearer {
///     Auth::Bearer(value) => assert_eq!(value, "token"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Bearer <token>
    Bearer(&'a str),
    /// Authorization: Basic base64(<username>:<password>), e.g. OAuth client credentials
    Basic {
        username: &'a str,
        password: &'a str,
    },
    /// Key sent as a query parameter (e.g. Google APIs: `key`)
    Query {
        name: &'a str,
        value: Cow<'a, str>,
    },
}

impl Auth<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
            Auth::Basic { .. } => "basic",
            Auth::Query { .. } => "query",
        }
    }
}

/// Per-request auth and query parameters.
///
/// ```
/// use harvest_http::{Auth, RequestOpts};
/// use std::borrow::Cow;
///
/// let opts = RequestOpts {
///     auth: Some(Auth::Query {
///         name: "key",
///         value: Cow::Borrowed("demo"),
///     }),
///     query: Some(vec![("q", "fountain pens".into())]),
/// };
///
/// assert_eq!(opts.query.as_ref().map(Vec::len), Some(1));
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub auth: Option<Auth<'a>>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    default_headers: HeaderMap,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

/// What to do after one attempt.
enum Outcome<T> {
    Done(Result<T, HttpError>),
    Retry { delay: Duration, reason: String },
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// Paths handed to the request methods are joined onto the base, so keep
    /// a trailing slash on bases that have a path (`.../youtube/v3/`).
    ///
    /// ```no_run
    /// use harvest_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// assert_eq!(client.max_retries, 0);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_headers: HeaderMap::new(),
            default_timeout: Duration::from_secs(15),
            max_retries: 0,
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// Allow up to `n` extra attempts on 429/5xx and network failures.
    ///
    /// ```no_run
    /// use harvest_http::{HttpClient, HttpError};
    ///
    /// let client = HttpClient::new("https://api.example.com")?.with_retries(5);
    /// assert_eq!(client.max_retries, 5);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    /// Send this `User-Agent` on every request.
    pub fn with_user_agent(mut self, agent: &str) -> Result<Self, HttpError> {
        let value = HeaderValue::from_str(agent)
            .map_err(|e| HttpError::Build(format!("invalid user agent: {e}")))?;
        self.default_headers.insert(USER_AGENT, value);
        Ok(self)
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// GET `path` and decode the JSON reply.
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.execute(Method::GET, path, None, opts).await
    }

    /// POST an `application/x-www-form-urlencoded` body and decode a JSON reply.
    pub async fn post_form<T>(
        &self,
        path: &str,
        form: &[(&str, &str)],
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.execute(Method::POST, path, Some(form), opts).await
    }

    async fn execute<T>(
        &self,
        method: Method,
        path: &str,
        form: Option<&[(&str, &str)]>,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let url = self
            .base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))?;

        let mut query: Vec<(&str, &str)> = opts
            .query
            .iter()
            .flatten()
            .map(|(k, v)| (*k, v.as_ref()))
            .collect();
        if let Some(Auth::Query { name, value }) = &opts.auth {
            query.push((*name, value.as_ref()));
        }

        let auth_kind = opts.auth.as_ref().map_or("none", Auth::kind);
        let req_id = request_id();
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            tracing::debug!(
                req_id = %req_id,
                attempt,
                max_retries = self.max_retries,
                method = %method,
                host_path = %format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
                query = ?redact::query_for_log(query.iter().copied()),
                timeout_ms = self.default_timeout.as_millis() as u64,
                auth_kind,
                has_body = form.is_some(),
                "http.request.start"
            );

            let mut rb = self
                .inner
                .request(method.clone(), url.clone())
                .timeout(self.default_timeout)
                .headers(self.default_headers.clone());
            if !query.is_empty() {
                rb = rb.query(&query);
            }
            if let Some(pairs) = form {
                rb = rb.form(pairs);
            }
            rb = match &opts.auth {
                Some(Auth::Bearer(tok)) => rb.bearer_auth(bearer_token(tok)?),
                Some(Auth::Basic { username, password }) => rb.basic_auth(username, Some(password)),
                Some(Auth::Query { .. }) | None => rb,
            };

            if redact::raw_enabled() {
                self.log_raw_request(&req_id, &method, &url, &query, form);
            }

            let outcome = self.attempt(rb, &req_id, attempt).await;
            match outcome {
                Outcome::Done(result) => return result,
                Outcome::Retry { delay, reason } => {
                    tracing::warn!(
                        req_id = %req_id,
                        attempt,
                        max_retries = self.max_retries,
                        backoff_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "http.retrying"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    /// Send once and classify the result.
    async fn attempt<T>(&self, rb: reqwest::RequestBuilder, req_id: &str, attempt: usize) -> Outcome<T>
    where
        T: DeserializeOwned,
    {
        let can_retry = attempt <= self.max_retries;
        let started = Instant::now();

        let (status, headers, bytes) = match rb.send().await {
            Ok(resp) => {
                let status = resp.status();
                let headers = resp.headers().clone();
                match resp.bytes().await {
                    Ok(bytes) => (status, headers, bytes),
                    Err(err) => return self.network_failure(err, req_id, attempt, can_retry),
                }
            }
            Err(err) => return self.network_failure(err, req_id, attempt, can_retry),
        };

        let request_id = headers
            .get("x-request-id")
            .or_else(|| headers.get("x-correlation-id"))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();
        let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        tracing::debug!(
            req_id = %req_id,
            %status,
            duration_ms = started.elapsed().as_millis() as u64,
            body_len = bytes.len(),
            x_request_id = %request_id,
            rate_limit.used = ?header_str("x-ratelimit-used"),
            rate_limit.remaining = ?header_str("x-ratelimit-remaining"),
            rate_limit.reset = ?header_str("x-ratelimit-reset"),
            "http.response.headers"
        );
        if redact::raw_enabled() {
            log_raw_response(req_id, status, &headers, &bytes);
        }

        let snippet = error::snippet(&bytes);
        if status.is_success() {
            return Outcome::Done(serde_json::from_slice::<T>(&bytes).map_err(|e| {
                tracing::warn!(
                    req_id = %req_id,
                    serde_line = e.line(),
                    serde_col = e.column(),
                    serde_err = %e,
                    body_snippet = %snippet,
                    "http.response.decode_error"
                );
                HttpError::Decode(e.to_string(), snippet)
            }));
        }

        let message = error::api_message(&bytes);
        if can_retry && retry::is_retryable(status) {
            return Outcome::Retry {
                delay: retry::delay_for(status, &headers, attempt),
                reason: format!("{status}: {message}"),
            };
        }

        tracing::warn!(
            req_id = %req_id,
            %status,
            message = %message,
            x_request_id = %request_id,
            body_snippet = %snippet,
            "http.error"
        );
        Outcome::Done(Err(HttpError::Api {
            status,
            message,
            request_id,
        }))
    }

    fn network_failure<T>(
        &self,
        err: reqwest::Error,
        req_id: &str,
        attempt: usize,
        can_retry: bool,
    ) -> Outcome<T> {
        let message = err.to_string();
        if can_retry {
            return Outcome::Retry {
                delay: retry::backoff(attempt),
                reason: message,
            };
        }
        tracing::warn!(
            req_id = %req_id,
            attempt,
            max_retries = self.max_retries,
            message = %message,
            "http.network_error"
        );
        Outcome::Done(Err(HttpError::Network(message)))
    }

    fn log_raw_request(
        &self,
        req_id: &str,
        method: &Method,
        url: &Url,
        query: &[(&str, &str)],
        form: Option<&[(&str, &str)]>,
    ) {
        let mut full = url.clone();
        if !query.is_empty() {
            full.query_pairs_mut().extend_pairs(query.iter().copied());
        }
        let body = form.map(|pairs| {
            pairs
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&")
        });
        let curl = redact::curl_line(method, &full, &self.default_headers, body.as_deref());
        tracing::debug!(target: "http.raw", %req_id, %curl, "request");
    }
}

fn log_raw_response(req_id: &str, status: StatusCode, headers: &HeaderMap, bytes: &[u8]) {
    let truncated = bytes.len() > redact::RAW_MAX_BODY;
    let shown = &bytes[..bytes.len().min(redact::RAW_MAX_BODY)];
    tracing::info!(
        target: "http.raw",
        %req_id,
        status = %status,
        headers = ?redact::headers_for_log(headers),
        body = %String::from_utf8_lossy(shown),
        truncated
    );
}

/// Lightweight request id for correlating log lines.
fn request_id() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("r{nanos:x}")
}

/// Trim quotes and stray whitespace from a token and make sure it is a
/// valid header value.
fn bearer_token(raw: &str) -> Result<String, HttpError> {
    let token: String = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if !token.is_ascii() || token.bytes().any(|b| b.is_ascii_control()) {
        return Err(HttpError::Build(
            "bearer token contains non-ASCII or control characters".into(),
        ));
    }
    HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_strips_quotes_and_whitespace() {
        assert_eq!(bearer_token(" \"ab c\n\" ").unwrap(), "abc");
        assert!(bearer_token("tökén").is_err());
    }

    #[test]
    fn request_ids_are_prefixed() {
        assert!(request_id().starts_with('r'));
    }
}
