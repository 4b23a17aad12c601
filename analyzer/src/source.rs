//! Activity log sources.
//!
//! The pager reads raw records through the [`ActivityLogSource`] trait. The
//! production implementation, [`KademliaClient`], calls the Kademlia host API
//! over HTTP.

use serde_json::Value;
use shared::models::RawLogEntry;
use shared::range::TimeRange;
use std::future::Future;
use thiserror::Error;

/// Path of the activity log endpoint, relative to the API base URL.
pub const ACTIVITY_LOG_PATH: &str = "/api/host/Kademlia/GetActivityLog";

/// Default Kademlia API base URL.
pub const DEFAULT_KADEMLIA_URL: &str = "http://localhost:7800";

/// Errors that can occur while fetching one window of activity logs.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// The response body is not JSON.
    #[error("Response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// The response is JSON but not an array of records.
    #[error("Response is not an array of activity records")]
    UnexpectedShape,
}

/// A source of raw activity log records.
pub trait ActivityLogSource: Send + Sync {
    /// Fetches every record with a timestamp in `window`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] if the window could not be fetched or parsed.
    fn fetch(
        &self,
        window: TimeRange,
    ) -> impl Future<Output = Result<Vec<RawLogEntry>, FetchError>> + Send;
}

/// HTTP client for the Kademlia activity log API.
#[derive(Debug, Clone)]
pub struct KademliaClient {
    http: reqwest::Client,
    endpoint: String,
}

impl KademliaClient {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("kadstats/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: format!("{}{ACTIVITY_LOG_PATH}", base_url.trim_end_matches('/')),
        })
    }

    /// Full URL of the activity log endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ActivityLogSource for KademliaClient {
    async fn fetch(&self, window: TimeRange) -> Result<Vec<RawLogEntry>, FetchError> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("startTime", window.start), ("endTime", window.end)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        parse_activity_log(&body)
    }
}

/// Parses an activity log response body.
///
/// Array elements that are not objects of the expected shape are dropped;
/// they could never pass the ingest filter anyway.
///
/// # Errors
///
/// Returns an error if the body is not JSON or not an array.
pub fn parse_activity_log(body: &[u8]) -> Result<Vec<RawLogEntry>, FetchError> {
    let Value::Array(items) = serde_json::from_slice::<Value>(body)? else {
        return Err(FetchError::UnexpectedShape);
    };

    let total = items.len();
    let records: Vec<RawLogEntry> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();

    if records.len() < total {
        tracing::debug!(
            dropped = total - records.len(),
            "Dropped malformed activity records"
        );
    }

    Ok(records)
}
