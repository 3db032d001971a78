// crates/sync-engine/src/channel.rs
//! The remote media server seam
//!
//! Everything the synchronizers need from a server goes through
//! [`MediaChannel`], so an HTTP client, a test double or an offline stub can
//! be plugged in without touching the reconciliation logic.

use crate::error::{SyncError, SyncResult};
use crate::types::DeviceId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shelfcast_core::{BookId, Bookmark, ChapterId, LibraryId, MediaProgress, PlaybackProgress, RecentBook};
use shelfcast_resilience::{retry_if, with_timeout, RetryPolicy};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Result type for channel calls
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Failures reported by a media server
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The server does not know the item, bookmark or session
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credentials were rejected
    #[error("Unauthorized")]
    Unauthorized,

    /// The server could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// The server failed while handling the call
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl ChannelError {
    /// Transport and server failures may go away; the others will not
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::InternalError(_))
    }
}

/// Payload for creating a bookmark on the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBookmarkRequest {
    pub title: String,
    /// Whole seconds since the start of the book
    pub time: i64,
    pub library_item_id: BookId,
}

impl CreateBookmarkRequest {
    /// Builds the request for a locally stored bookmark
    pub fn from_bookmark(bookmark: &Bookmark) -> Self {
        Self {
            title: bookmark.title.clone(),
            time: bookmark.total_position as i64,
            library_item_id: bookmark.library_item_id.clone(),
        }
    }
}

/// A listening session opened on the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSession {
    pub session_id: String,
    pub item_id: BookId,
    pub opened_at: DateTime<Utc>,
}

impl PlaybackSession {
    /// Creates a session record stamped with the current time
    pub fn new(session_id: impl Into<String>, item_id: BookId) -> Self {
        Self {
            session_id: session_id.into(),
            item_id,
            opened_at: Utc::now(),
        }
    }
}

/// Operations a media server exposes to the client
#[async_trait]
pub trait MediaChannel: Send + Sync {
    /// Bookmarks the server holds for one item
    async fn fetch_bookmarks(&self, item_id: &BookId) -> ChannelResult<Vec<Bookmark>>;

    /// Creates a bookmark and returns the server's copy
    async fn create_bookmark(&self, request: CreateBookmarkRequest) -> ChannelResult<Bookmark>;

    /// Deletes the bookmark at the item and whole-second position
    async fn drop_bookmark(&self, bookmark: &Bookmark) -> ChannelResult<()>;

    /// Opens a listening session for an item, positioned at a chapter
    async fn start_playback(
        &self,
        item_id: &BookId,
        device_id: &DeviceId,
        chapter_id: &ChapterId,
    ) -> ChannelResult<PlaybackSession>;

    /// Reports the listening position of an open session
    async fn sync_progress(
        &self,
        session_id: &str,
        item_id: &BookId,
        progress: &PlaybackProgress,
    ) -> ChannelResult<()>;

    /// Progress the server holds for the given items
    async fn fetch_progress(&self, item_ids: &[BookId]) -> ChannelResult<HashMap<BookId, MediaProgress>>;

    /// The server's "continue listening" shelf
    async fn fetch_recent_books(&self, library_id: &LibraryId) -> ChannelResult<Vec<RecentBook>>;
}

/// Runs a channel call with a per-attempt timeout and the given retry policy
///
/// Only failures that may go away (network, server errors, timeouts) are
/// retried.
pub(crate) async fn guarded<T, F, Fut>(timeout: Duration, policy: &RetryPolicy, mut call: F) -> SyncResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ChannelResult<T>>,
{
    retry_if(policy, SyncError::is_retryable, || {
        let attempt = call();
        async move {
            with_timeout(timeout, attempt)
                .await
                .map_err(SyncError::from)
                .and_then(|outcome| outcome.map_err(SyncError::from))
        }
    })
    .await
}
