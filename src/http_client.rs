//! Blocking HTTP client for dereferencing remote resources.
//!
//! The validation pipeline is sequential and synchronous, so remote fetches
//! (instance documents, Schematron schemas) block the calling thread; callers
//! running many documents concurrently should put each pipeline on its own
//! worker and apply their own timeout policy around the dereference step.

use std::io::Write;
use std::thread::sleep;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Result, ValidationError};

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Number of retry attempts
    pub retry_attempts: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds (for exponential backoff cap)
    pub max_retry_delay_ms: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            max_retry_delay_ms: 30000,
            user_agent: format!("validate-gml/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Blocking HTTP client with retry and exponential backoff.
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .build()
            .map_err(ValidationError::from)?;

        Ok(Self { client, config })
    }

    /// Fetch a resource into memory, retrying transient failures.
    pub fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get_with_retry(url)?;
        let bytes = response.bytes().map_err(ValidationError::from)?;
        debug!(url, bytes = bytes.len(), "fetched remote resource");
        Ok(bytes.to_vec())
    }

    /// Dereference a resource to a temporary file and return its handle.
    ///
    /// The file is deleted when the handle is dropped, so the caller must
    /// keep it alive for as long as the content is needed.
    pub fn dereference_to_file(&self, url: &str) -> Result<NamedTempFile> {
        let body = self.fetch(url)?;
        let mut file = NamedTempFile::with_suffix(".xml")?;
        file.write_all(&body)?;
        file.flush()?;
        debug!(url, file = %file.path().display(), "wrote remote resource to temp file");
        Ok(file)
    }

    fn get_with_retry(&self, url: &str) -> Result<Response> {
        let mut attempt = 0;
        loop {
            match self.try_get(url) {
                Ok(response) => return Ok(response),
                Err(error) => {
                    if attempt >= self.config.retry_attempts || !is_retryable(&error) {
                        return Err(error);
                    }
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying fetch"
                    );
                    sleep(delay);
                    attempt += 1;
                }
            }
        }
    }

    fn try_get(&self, url: &str) -> Result<Response> {
        let response = self.client.get(url).send().map_err(ValidationError::from)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ValidationError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// Exponential backoff, capped at the configured maximum.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let delay = self
            .config
            .retry_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt))
            .min(self.config.max_retry_delay_ms);
        Duration::from_millis(delay)
    }
}

/// Server errors and transport failures are worth retrying; client errors
/// (4xx) are not.
fn is_retryable(error: &ValidationError) -> bool {
    match error {
        ValidationError::HttpStatus { status, .. } => *status >= 500,
        ValidationError::Http(e) => e.is_timeout() || e.is_connect(),
        _ => false,
    }
}
