//! Upstream manifest retrieval.
//!
//! Provides a trait-based abstraction over the HTTP fetch of a release's
//! `go.mod`, so tests can mock network behaviour, and a retry loop that
//! applies the configured [`FetchPolicy`].

use docs_release::FetchPolicy;
use log::{debug, warn};
use std::time::Duration;

/// Trait for retrieving a manifest document by URL.
///
/// Implementations perform a single attempt; retries are layered on top by
/// [`fetch_with_retry`].
#[cfg_attr(test, mockall::automock)]
pub trait ManifestFetcher {
    /// Fetch the body at `url` as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or answers with a non-2xx
    /// status.
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Errors arising from manifest retrieval.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// The server answered 404; the tag most likely does not exist upstream.
    #[error("manifest not found (HTTP 404): {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The server answered with another non-2xx status.
    #[error("failed to fetch {url}: HTTP {status}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code received.
        status: u16,
    },

    /// The request never produced a usable response.
    #[error("failed to fetch {url}: {reason}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },
}

impl FetchError {
    /// Returns true when another attempt could plausibly succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::NotFound { .. } => false,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Transport { .. } => true,
        }
    }
}

/// HTTP fetcher using a `ureq` agent with a global request timeout.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl ManifestFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        response
            .into_body()
            .read_to_string()
            .map_err(|e| FetchError::Transport {
                url: url.to_owned(),
                reason: e.to_string(),
            })
    }
}

/// Map a ureq error to a [`FetchError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> FetchError {
    match err {
        ureq::Error::StatusCode(404) => FetchError::NotFound {
            url: url.to_owned(),
        },
        ureq::Error::StatusCode(status) => FetchError::Status {
            url: url.to_owned(),
            status: *status,
        },
        other => FetchError::Transport {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

/// Fetch `url`, retrying transient failures according to `policy`.
///
/// # Errors
///
/// Returns the last [`FetchError`] once the attempt budget is spent, or the
/// first non-retryable error.
pub fn fetch_with_retry(
    fetcher: &dyn ManifestFetcher,
    url: &str,
    policy: &FetchPolicy,
) -> Result<String, FetchError> {
    fetch_with_retry_using(fetcher, url, policy, std::thread::sleep)
}

/// Retry loop with an injectable sleep for testability.
fn fetch_with_retry_using<S>(
    fetcher: &dyn ManifestFetcher,
    url: &str,
    policy: &FetchPolicy,
    mut sleep: S,
) -> Result<String, FetchError>
where
    S: FnMut(Duration),
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        debug!("fetching {url} (attempt {attempt}/{attempts})");
        match fetcher.fetch(url) {
            Ok(body) => return Ok(body),
            Err(err) if err.is_retryable() && attempt < attempts => {
                let delay = policy.backoff_after(attempt);
                warn!("{err}; retrying in {}ms", delay.as_millis());
                sleep(delay);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
