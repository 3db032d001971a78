//! Listening progress models

use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Persisted listening progress of one book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaProgress {
    /// Overall position in seconds
    pub current_time: f64,
    pub is_finished: bool,
    pub last_update: Timestamp,
}

impl MediaProgress {
    /// Creates a progress entry stamped with the current time
    pub fn new(current_time: f64, is_finished: bool) -> Self {
        Self {
            current_time,
            is_finished,
            last_update: Timestamp::now(),
        }
    }

    /// Returns true if this progress was recorded after `other`
    pub fn is_newer_than(&self, other: &MediaProgress) -> bool {
        self.last_update > other.last_update
    }
}

/// Position snapshot reported by the playback engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackProgress {
    /// Seconds since the start of the book
    pub current_total_time: f64,
    /// Seconds since the start of the current chapter
    pub current_chapter_time: f64,
}

impl PlaybackProgress {
    /// Creates a snapshot
    pub fn new(current_total_time: f64, current_chapter_time: f64) -> Self {
        Self {
            current_total_time,
            current_chapter_time,
        }
    }
}
