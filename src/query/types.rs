use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::app::QueryConfig;
use crate::constants::{QUERY_RETRY_BASE_DELAY_MS, QUERY_RETRY_MAX_DELAY_MS};

/// Lifecycle of a cached query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// No result yet
    Pending,
    Success,
    Error,
}

/// Failure shared by every caller that joined the same fetch
#[derive(Error, Debug, Clone)]
pub enum QueryError {
    #[error("{0:#}")]
    Fetch(Arc<anyhow::Error>),

    #[error("cached value for '{key}' has a different type")]
    TypeMismatch { key: String },
}

impl QueryError {
    /// The fetcher's error, when there is one
    pub fn fetch_error(&self) -> Option<&anyhow::Error> {
        match self {
            QueryError::Fetch(e) => Some(&**e),
            QueryError::TypeMismatch { .. } => None,
        }
    }
}

/// Point-in-time view of one cache entry
#[derive(Debug, Clone)]
pub struct QueryState {
    pub status: QueryStatus,
    pub error: Option<QueryError>,
    pub updated_at: Option<DateTime<Utc>>,
    pub is_fetching: bool,
    pub is_stale: bool,
}

/// Cache behaviour shared by every key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Age below which a successful result is served without fetching
    pub stale_time: Duration,
    /// Retries after the first failed attempt
    pub retry: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::from(&QueryConfig::default())
    }
}

impl From<&QueryConfig> for QueryOptions {
    fn from(config: &QueryConfig) -> Self {
        Self {
            stale_time: Duration::from_secs(config.stale_time_secs),
            retry: config.retry,
            retry_base_delay: Duration::from_millis(QUERY_RETRY_BASE_DELAY_MS),
            retry_max_delay: Duration::from_millis(QUERY_RETRY_MAX_DELAY_MS),
        }
    }
}

impl QueryOptions {
    /// `min(base * 2^attempt, max)`
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.retry_base_delay
            .saturating_mul(factor)
            .min(self.retry_max_delay)
    }
}
