//! HTTP transfer primitive shared by every fetcher
//!
//! One `GET` with a bounded timeout and a fixed user agent. Non-2xx answers
//! are returned as data (status, lower-cased headers, body) rather than as
//! errors, so callers can act on a 404 directly; only network-level failures
//! become [`FetchError::Download`].
//!
//! Cancellation is polled before each request. A request already in flight
//! runs to completion or to its timeout.

use std::collections::HashMap;
use std::time::Duration;

use notesync_core::config::NetworkConfig;
use notesync_core::domain::FetchError;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default `User-Agent` header
pub const DEFAULT_USER_AGENT: &str = "NotesSyncLinux/1.0";

/// A fully buffered HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names lower-cased; repeated headers joined with `"; "`
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header value by lower-case name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Converts a non-2xx response into [`FetchError::HttpStatus`]
    pub fn error_for_status(self) -> Result<Self, FetchError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(FetchError::HttpStatus(self.status))
        }
    }
}

/// Returns [`FetchError::Cancelled`] once the token has fired
pub fn check_cancel(cancel: &CancellationToken) -> Result<(), FetchError> {
    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }
    Ok(())
}

/// Thin wrapper around a configured `reqwest::Client`
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with the given timeout and user agent
    ///
    /// # Arguments
    /// * `timeout` - Whole-request timeout
    /// * `user_agent` - Value of the `User-Agent` header
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::download(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Creates a transport from the `network` config section
    pub fn from_config(config: &NetworkConfig) -> Result<Self, FetchError> {
        Self::new(Duration::from_secs(config.timeout_secs), &config.user_agent)
    }

    /// Transport with the default timeout and user agent
    pub fn with_defaults() -> Result<Self, FetchError> {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Issues a GET and buffers the whole response, whatever its status
    pub async fn get(&self, url: &Url, cancel: &CancellationToken) -> Result<HttpResponse, FetchError> {
        check_cancel(cancel)?;
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();
        let mut headers: HashMap<String, String> = HashMap::new();
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            headers
                .entry(name.as_str().to_ascii_lowercase())
                .and_modify(|existing| {
                    existing.push_str("; ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }

        let body = response.bytes().await.map_err(network_error)?.to_vec();
        debug!(url = %url, status, bytes = body.len(), "Response received");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    /// Issues a GET and requires a 2xx status
    pub async fn fetch_ok(&self, url: &Url, cancel: &CancellationToken) -> Result<Vec<u8>, FetchError> {
        Ok(self.get(url, cancel).await?.error_for_status()?.body)
    }
}

fn network_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::download("Request timed out");
    }
    FetchError::download(err.to_string())
}
