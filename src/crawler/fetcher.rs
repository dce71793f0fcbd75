//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client
//! - Issuing a whole batch of GET requests concurrently
//! - Classifying failures as expected (dead address) or unusual

use crate::url::normalize_target;
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use tokio::task::JoinSet;
use url::Url;

const USER_AGENT: &str = concat!("knot-crawler/", env!("CARGO_PKG_VERSION"));

/// A page that answered with a success status
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Normalized target the page was fetched from
    pub target: String,

    /// Response headers
    pub headers: HeaderMap,

    /// Page body, decoded lossily as UTF-8
    pub body: String,
}

/// Why a fetch did not produce a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    ConnectionRefused,
    ConnectionAborted,
    HostUnreachable,
    NetworkUnreachable,
    AddressUnavailable,
    TimedOut,
    /// Non-success HTTP status
    Status(u16),
    /// Target could not be turned into a request URL
    InvalidUrl,
    /// Anything else, described by its root cause
    Other(String),
}

impl FetchError {
    /// Returns true for failures that are routine when probing random
    /// addresses and are dropped without logging
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::ConnectionRefused
                | Self::ConnectionAborted
                | Self::HostUnreachable
                | Self::NetworkUnreachable
                | Self::AddressUnavailable
                | Self::TimedOut
        )
    }

    /// Short error code for log lines
    pub fn code(&self) -> String {
        match self {
            Self::ConnectionRefused => "ECONNREFUSED".to_string(),
            Self::ConnectionAborted => "ECONNABORTED".to_string(),
            Self::HostUnreachable => "EHOSTUNREACH".to_string(),
            Self::NetworkUnreachable => "ENETUNREACH".to_string(),
            Self::AddressUnavailable => "EADDRNOTAVAIL".to_string(),
            Self::TimedOut => "ETIMEDOUT".to_string(),
            Self::Status(code) => format!("HTTP {}", code),
            Self::InvalidUrl => "ERR_INVALID_URL".to_string(),
            Self::Other(message) => message.clone(),
        }
    }

    /// Classifies a reqwest error
    ///
    /// Timeouts and status errors are flagged by reqwest itself; connection
    /// level failures are found by walking the source chain down to the
    /// underlying `io::Error`.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::TimedOut;
        }
        if let Some(status) = err.status() {
            return Self::Status(status.as_u16());
        }
        if err.is_builder() {
            return Self::InvalidUrl;
        }

        let mut source: Option<&(dyn StdError + 'static)> = err.source();
        let mut root = err.to_string();
        while let Some(cause) = source {
            if let Some(io_err) = cause.downcast_ref::<io::Error>() {
                if let Some(kind) = Self::from_io_kind(io_err.kind()) {
                    return kind;
                }
            }
            root = cause.to_string();
            source = cause.source();
        }

        Self::Other(root)
    }

    fn from_io_kind(kind: io::ErrorKind) -> Option<Self> {
        match kind {
            io::ErrorKind::ConnectionRefused => Some(Self::ConnectionRefused),
            io::ErrorKind::ConnectionAborted => Some(Self::ConnectionAborted),
            io::ErrorKind::HostUnreachable => Some(Self::HostUnreachable),
            io::ErrorKind::NetworkUnreachable => Some(Self::NetworkUnreachable),
            io::ErrorKind::AddrNotAvailable => Some(Self::AddressUnavailable),
            io::ErrorKind::TimedOut => Some(Self::TimedOut),
            _ => None,
        }
    }
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success(FetchedPage),

    /// The fetch failed
    Failed {
        /// Normalized target
        target: String,
        /// Classified failure
        error: FetchError,
    },
}

/// Builds the HTTP client shared by every batch
///
/// Timeouts are applied per request from the current configuration snapshot,
/// so an operator can change them between batches.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a single target
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `target` - URL or bare host; `http://` is prefixed when no scheme is present
/// * `timeout` - Upper bound for the whole request
///
/// # Returns
///
/// A FetchResult holding either the page or the classified failure
pub async fn fetch_url(client: &Client, target: &str, timeout: Duration) -> FetchResult {
    let target = normalize_target(target);
    let failed = |error: FetchError| FetchResult::Failed {
        target: target.clone(),
        error,
    };

    if Url::parse(&target).is_err() {
        return failed(FetchError::InvalidUrl);
    }

    let response = match client.get(&target).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => return failed(FetchError::from_reqwest(&e)),
    };

    let response = match response.error_for_status() {
        Ok(response) => response,
        Err(e) => return failed(FetchError::from_reqwest(&e)),
    };

    let headers = response.headers().clone();
    match response.bytes().await {
        Ok(bytes) => FetchResult::Success(FetchedPage {
            target: target.clone(),
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }),
        Err(e) => failed(FetchError::from_reqwest(&e)),
    }
}

/// Fetches every target concurrently and waits for all of them to settle
///
/// No single failure aborts the batch. Results arrive in completion order.
/// A task that panics is logged and simply missing from the results.
pub async fn fetch_batch(client: &Client, targets: &[String], timeout: Duration) -> Vec<FetchResult> {
    let mut tasks = JoinSet::new();
    for target in targets {
        let client = client.clone();
        let target = target.clone();
        tasks.spawn(async move { fetch_url(&client, &target, timeout).await });
    }

    let mut results = Vec::with_capacity(targets.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => tracing::error!("Fetch task failed: {}", e),
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client();
        assert!(client.is_ok());
    }

    #[test]
    fn test_connection_errors_are_expected() {
        for error in [
            FetchError::ConnectionRefused,
            FetchError::ConnectionAborted,
            FetchError::HostUnreachable,
            FetchError::NetworkUnreachable,
            FetchError::AddressUnavailable,
            FetchError::TimedOut,
        ] {
            assert!(error.is_expected(), "{:?}", error);
        }
    }

    #[test]
    fn test_other_errors_are_unusual() {
        assert!(!FetchError::Status(500).is_expected());
        assert!(!FetchError::InvalidUrl.is_expected());
        assert!(!FetchError::Other("dns error".to_string()).is_expected());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(FetchError::ConnectionRefused.code(), "ECONNREFUSED");
        assert_eq!(FetchError::Status(404).code(), "HTTP 404");
        assert_eq!(FetchError::Other("boom".to_string()).code(), "boom");
    }

    #[test]
    fn test_io_kind_mapping() {
        assert_eq!(
            FetchError::from_io_kind(io::ErrorKind::ConnectionRefused),
            Some(FetchError::ConnectionRefused)
        );
        assert_eq!(
            FetchError::from_io_kind(io::ErrorKind::AddrNotAvailable),
            Some(FetchError::AddressUnavailable)
        );
        assert_eq!(FetchError::from_io_kind(io::ErrorKind::InvalidData), None);
    }

    #[tokio::test]
    async fn test_invalid_target_is_unusual() {
        let client = build_http_client().unwrap();
        let result = fetch_url(&client, "http://exa mple.com", Duration::from_millis(200)).await;
        match result {
            FetchResult::Failed { target, error } => {
                assert_eq!(target, "http://exa mple.com");
                assert_eq!(error, FetchError::InvalidUrl);
            }
            FetchResult::Success(_) => panic!("invalid target should not be fetched"),
        }
    }

    #[tokio::test]
    async fn test_refused_connection_is_expected() {
        // Bind then drop a listener to get a local port nobody listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let client = build_http_client().unwrap();
        let target = format!("127.0.0.1:{}", port);
        let results = fetch_batch(&client, &[target], Duration::from_secs(2)).await;

        assert_eq!(results.len(), 1);
        match &results[0] {
            FetchResult::Failed { error, .. } => assert!(error.is_expected(), "{:?}", error),
            FetchResult::Success(_) => panic!("closed port should not answer"),
        }
    }
}
