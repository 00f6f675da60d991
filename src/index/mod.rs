//! Package index queries: latest versions, update checks and search.

mod client;
mod limiter;
mod oracle;
mod search;
mod version;

pub use client::{IndexClient, ProjectInfo, PypiClient, MAX_RESPONSE_BYTES};
pub use limiter::RateLimiter;
pub use oracle::{CheckReport, UpdateOracle};
pub use search::{search, validate_term, SearchHit, MAX_RESULTS, SUMMARY_LIMIT};
pub use version::{compare_versions, InvalidVersion, LocalSegment, PreRelease, Version};

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::inventory::PackageStatus;

/// Default package index.
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org";

/// Errors from a single index query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("'{name}' is not on the package index")]
    NotFound { name: String },

    #[error("Index returned HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Could not reach the package index: {detail}")]
    Network { detail: String },

    #[error("Index request timed out: {url}")]
    Timeout { url: String },

    #[error("Index response larger than {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Unexpected index response: {detail}")]
    Malformed { detail: String },

    #[error("Invalid search term: {reason}")]
    InvalidQuery { reason: String },

    #[error("Update check was cancelled")]
    Cancelled,
}

impl IndexError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Whether the failure says something about the index rather than the
    /// package. Only these count toward the consecutive-failure limit.
    pub fn is_outage(&self) -> bool {
        self.is_retryable() || matches!(self, Self::Malformed { .. } | Self::TooLarge { .. })
    }
}

/// One package's update-check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    pub status: PackageStatus,
}

impl StatusUpdate {
    /// A result with no usable answer from the index.
    pub fn unknown(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latest: None,
            status: PackageStatus::Unknown,
        }
    }
}

/// Index client and scheduling limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSettings {
    pub url: String,
    pub timeout: Duration,
    pub retries: u32,
    pub retry_pause: Duration,
    pub max_parallel: usize,
    pub min_interval: Duration,
    pub failure_threshold: usize,
    pub deadline: Duration,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_INDEX_URL.to_string(),
            timeout: Duration::from_secs(10),
            retries: 3,
            retry_pause: Duration::from_secs(1),
            max_parallel: 4,
            min_interval: Duration::from_millis(100),
            failure_threshold: 10,
            deadline: Duration::from_secs(300),
        }
    }
}
