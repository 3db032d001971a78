// crates/sync-engine/src/lib.rs
//! Remote reconciliation for Shelfcast
//!
//! Keeps the offline cache and a media server in step:
//! - `channel`: the [`MediaChannel`] trait a server client implements
//! - `bookmarks`: push of pending bookmarks and mirroring of the server list
//! - `progress`: periodic listening-progress sync through playback sessions
//! - `conflict`: choosing between local and remote progress
//!
//! Every remote call is bounded by a timeout; bookmark pushes are retried
//! with backoff before being left pending for the next round.
//!
//! # Example
//!
//! ```no_run
//! use shelfcast_sync_engine::{BookmarkSynchronizer, MediaChannel, SyncSettings};
//! use shelfcast_database::BookmarkRepository;
//! use shelfcast_core::BookId;
//! use std::sync::Arc;
//!
//! # async fn example(channel: Arc<dyn MediaChannel>, repository: BookmarkRepository)
//! #     -> shelfcast_sync_engine::SyncResult<()> {
//! let bookmarks = BookmarkSynchronizer::new(channel, repository, SyncSettings::default());
//! for bookmark in bookmarks.fetch_bookmarks(&BookId::new("li_1")).await? {
//!     println!("{} at {}s", bookmark.title, bookmark.total_position);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bookmarks;
pub mod channel;
pub mod conflict;
pub mod error;
pub mod progress;
pub mod types;

pub use bookmarks::BookmarkSynchronizer;
pub use channel::{ChannelError, ChannelResult, CreateBookmarkRequest, MediaChannel, PlaybackSession};
pub use conflict::{merge_progress, recent_books, sync_from_local_progress, ProgressMerger};
pub use error::{SyncError, SyncResult};
pub use progress::{next_interval, PlaybackClock, ProgressSynchronizer, SyncOutcome};
pub use types::{
    ConflictResolution, DeviceId, SyncSettings, DEFAULT_REQUEST_TIMEOUT, LONG_SYNC_INTERVAL,
    SHORT_SYNC_INTERVAL,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = SyncSettings::default();
        assert_eq!(settings.long_interval, LONG_SYNC_INTERVAL);
        assert_eq!(settings.short_interval, SHORT_SYNC_INTERVAL);
        assert_eq!(settings.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(ProgressMerger::default().strategy(), ConflictResolution::UseNewest);
        assert_ne!(DeviceId::new(), DeviceId::new());
    }
}
