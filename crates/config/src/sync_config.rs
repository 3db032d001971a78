//! Synchronization timing section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use shelfcast_resilience::RetryPolicy;
use shelfcast_sync_engine::{SyncSettings, DEFAULT_REQUEST_TIMEOUT, LONG_SYNC_INTERVAL, SHORT_SYNC_INTERVAL};
use std::time::Duration;

/// How often and how persistently the client talks to the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    /// Progress sync period in the middle of an item
    pub long_interval_ms: u64,

    /// Progress sync period near the start or end of an item
    pub short_interval_ms: u64,

    /// Timeout of one remote call attempt
    pub request_timeout_ms: u64,

    /// Attempts per bookmark push, including the first
    pub retry_attempts: usize,

    /// Delay before the first retry; doubles with each retry
    pub retry_initial_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            long_interval_ms: LONG_SYNC_INTERVAL.as_millis() as u64,
            short_interval_ms: SHORT_SYNC_INTERVAL.as_millis() as u64,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            retry_attempts: 3,
            retry_initial_delay_ms: 100,
        }
    }
}

impl SyncConfig {
    /// Retry policy for bookmark pushes
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts)
            .with_initial_delay(Duration::from_millis(self.retry_initial_delay_ms))
    }

    /// Settings for the synchronizers
    pub fn settings(&self) -> SyncSettings {
        SyncSettings {
            long_interval: Duration::from_millis(self.long_interval_ms),
            short_interval: Duration::from_millis(self.short_interval_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            retry: self.retry_policy(),
        }
    }
}

impl ConfigSection for SyncConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![
            Validator::in_range(self.long_interval_ms, 1_000, 600_000, "sync.long_interval_ms"),
            Validator::in_range(self.short_interval_ms, 500, 600_000, "sync.short_interval_ms"),
            Validator::in_range(self.request_timeout_ms, 500, 120_000, "sync.request_timeout_ms"),
            Validator::in_range(self.retry_attempts, 1, 10, "sync.retry_attempts"),
            Validator::in_range(self.retry_initial_delay_ms, 0, 60_000, "sync.retry_initial_delay_ms"),
        ];

        if self.short_interval_ms > self.long_interval_ms {
            results.push(Err(ValidationError::with_value(
                "sync.short_interval_ms",
                "must not exceed sync.long_interval_ms",
                self.short_interval_ms,
            )));
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        self.long_interval_ms = other.long_interval_ms;
        self.short_interval_ms = other.short_interval_ms;
        self.request_timeout_ms = other.request_timeout_ms;
        self.retry_attempts = other.retry_attempts;
        self.retry_initial_delay_ms = other.retry_initial_delay_ms;
    }

    fn section_name(&self) -> &'static str {
        "sync"
    }
}
