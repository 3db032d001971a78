//! Bookmark domain model

use crate::types::{format_time, BookId, Timestamp, Validator};
use serde::{Deserialize, Serialize};

/// Reconciliation status of a locally stored bookmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookmarkSyncState {
    /// Present on the server
    Synced,
    /// Created offline, waiting for the server to confirm
    PendingCreate,
    /// Deleted locally, waiting for the server to confirm
    PendingDelete,
}

impl BookmarkSyncState {
    /// Integer code stored in the database
    pub fn as_integer(self) -> i64 {
        match self {
            Self::Synced => 1,
            Self::PendingCreate => 2,
            Self::PendingDelete => 3,
        }
    }

    /// Decodes a stored code; unknown codes are treated as pending deletion
    pub fn from_integer(value: i64) -> Self {
        match value {
            1 => Self::Synced,
            2 => Self::PendingCreate,
            _ => Self::PendingDelete,
        }
    }
}

/// Represents a user bookmark in a book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub library_item_id: BookId,
    pub title: String,
    /// Overall position in seconds
    pub total_position: f64,
    pub created_at: Timestamp,
    pub sync_state: BookmarkSyncState,
}

impl Bookmark {
    /// Creates a bookmark that has not been pushed to the server yet
    pub fn draft(library_item_id: BookId, title: impl Into<String>, total_position: f64) -> Self {
        Self {
            library_item_id,
            title: title.into(),
            total_position,
            created_at: Timestamp::now(),
            sync_state: BookmarkSyncState::PendingCreate,
        }
    }

    /// Returns a copy tagged with another sync state
    pub fn with_sync_state(&self, sync_state: BookmarkSyncState) -> Self {
        Self {
            sync_state,
            ..self.clone()
        }
    }

    /// Two bookmarks are the same entity when item and position match exactly
    pub fn is_same(&self, other: &Bookmark) -> bool {
        self.library_item_id == other.library_item_id && self.total_position == other.total_position
    }
}

impl Validator for Bookmark {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.library_item_id.as_str().trim().is_empty() {
            errors.push("Bookmark must reference a library item".to_string());
        }

        if !self.total_position.is_finite() || self.total_position < 0.0 {
            errors.push(format!(
                "Bookmark position must be a non-negative number: {}",
                self.total_position
            ));
        }

        if self.title.trim().is_empty() {
            errors.push("Bookmark title cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Builds the default bookmark title, e.g. `Chapter 3 - 04:05`
pub fn build_bookmark_title(chapter_title: &str, chapter_time: f64) -> String {
    format!("{} - {}", chapter_title, format_time(chapter_time as i64))
}
