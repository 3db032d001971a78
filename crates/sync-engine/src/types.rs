// crates/sync-engine/src/types.rs
//! Core sync types and data structures

use serde::{Deserialize, Serialize};
use shelfcast_resilience::RetryPolicy;
use std::time::Duration;
use uuid::Uuid;

/// Sync period while the listener is far from both ends of the item
pub const LONG_SYNC_INTERVAL: Duration = Duration::from_millis(30_000);

/// Sync period near the start or the end of the item
pub const SHORT_SYNC_INTERVAL: Duration = Duration::from_millis(5_000);

/// Request timeout for a single remote call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Unique device identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a new random device ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates a device ID from a string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    /// Returns the device ID as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side wins when local and remote progress disagree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictResolution {
    /// Use the progress cached on the device
    UseLocal,
    /// Use the progress reported by the server
    UseRemote,
    /// Use whichever was updated last
    #[default]
    UseNewest,
}

/// Timing of the synchronizers
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    pub long_interval: Duration,
    pub short_interval: Duration,
    /// Applies to each attempt of a remote call
    pub request_timeout: Duration,
    /// Used for bookmark pushes; progress pushes are never retried
    pub retry: RetryPolicy,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            long_interval: LONG_SYNC_INTERVAL,
            short_interval: SHORT_SYNC_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl SyncSettings {
    /// Distance from either end of the item inside which the short period applies
    pub fn short_window(&self) -> Duration {
        (self.long_interval * 2).saturating_sub(Duration::from_millis(1))
    }

    /// Period until the next progress sync
    ///
    /// `duration` and `position` describe the media item being played.
    pub fn interval_for(&self, duration: Duration, position: Duration) -> Duration {
        let window = self.short_window();
        let remaining = duration.saturating_sub(position);

        if remaining < window || position < window {
            self.short_interval
        } else {
            self.long_interval
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_creation() {
        let id1 = DeviceId::new();
        let id2 = DeviceId::new();
        assert_ne!(id1, id2);
        assert_eq!(DeviceId::from_string("pixel-7".to_string()).as_str(), "pixel-7");
    }

    #[test]
    fn test_default_resolution_is_newest() {
        assert_eq!(ConflictResolution::default(), ConflictResolution::UseNewest);
    }

    #[test]
    fn test_short_window() {
        assert_eq!(SyncSettings::default().short_window(), Duration::from_millis(59_999));
    }
}
