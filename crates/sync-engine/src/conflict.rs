// crates/sync-engine/src/conflict.rs
//! Reconciliation of local and remote listening progress
//!
//! Progress is written on the device while offline and on the server by
//! other devices. Neither side always wins: by default the entry updated
//! last is kept.

use crate::channel::{guarded, MediaChannel};
use crate::error::SyncResult;
use crate::types::{ConflictResolution, SyncSettings};
use shelfcast_core::{DetailedBook, LibraryId, MediaProgress, RecentBook};
use shelfcast_database::CachedBookStore;
use std::collections::HashMap;

/// Picks the progress to keep when both sides hold one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressMerger {
    strategy: ConflictResolution,
}

impl ProgressMerger {
    pub fn new(strategy: ConflictResolution) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> ConflictResolution {
        self.strategy
    }

    /// Merges two optional entries; a missing side never wins over a present one
    pub fn merge(&self, local: Option<&MediaProgress>, remote: Option<&MediaProgress>) -> Option<MediaProgress> {
        match (local, remote) {
            (None, None) => None,
            (Some(local), None) => Some(local.clone()),
            (None, Some(remote)) => Some(remote.clone()),
            (Some(local), Some(remote)) => Some(match self.strategy {
                ConflictResolution::UseLocal => local.clone(),
                ConflictResolution::UseRemote => remote.clone(),
                ConflictResolution::UseNewest => merge_progress(local, remote),
            }),
        }
    }

    /// Overlays the cached progress of a book onto a copy fetched from the server
    pub async fn sync_from_local_progress(
        &self,
        store: &CachedBookStore,
        mut book: DetailedBook,
    ) -> SyncResult<DetailedBook> {
        let Some(local) = store.fetch_media_progress(&book.id).await? else {
            return Ok(book);
        };

        let merged = self.merge(Some(&local), book.progress.as_ref());
        log::debug!(
            "Merging progress of {}: remote {:?}, local {:?}, kept {:?}",
            book.id,
            book.progress,
            local,
            merged
        );

        book.progress = merged;
        Ok(book)
    }
}

/// Newest `last_update` wins; on a tie the remote entry is kept
pub fn merge_progress(local: &MediaProgress, remote: &MediaProgress) -> MediaProgress {
    if local.is_newer_than(remote) {
        local.clone()
    } else {
        remote.clone()
    }
}

/// Overlays cached progress with the default newest-wins strategy
pub async fn sync_from_local_progress(store: &CachedBookStore, book: DetailedBook) -> SyncResult<DetailedBook> {
    ProgressMerger::default().sync_from_local_progress(store, book).await
}

/// The "continue listening" shelf, merged with progress cached on the device
///
/// Falls back to the cached shelf when the server is unreachable. A failed
/// progress lookup only loses the remote side of the merge.
pub async fn recent_books(
    channel: &dyn MediaChannel,
    store: &CachedBookStore,
    library_id: &LibraryId,
    settings: &SyncSettings,
) -> SyncResult<Vec<RecentBook>> {
    let remote_books = match guarded(settings.request_timeout, &settings.retry, || {
        channel.fetch_recent_books(library_id)
    })
    .await
    {
        Ok(books) => books,
        Err(e) => {
            log::warn!("Unable to fetch recent books of {}: {}, using the cache", library_id, e);
            return Ok(store.fetch_recent_books().await?);
        }
    };

    let ids: Vec<_> = remote_books.iter().map(|b| b.id.clone()).collect();
    let remote_progress = guarded(settings.request_timeout, &settings.retry, || channel.fetch_progress(&ids))
        .await
        .unwrap_or_else(|e| {
            log::warn!("Unable to fetch progress of recent books: {}", e);
            HashMap::new()
        });

    let mut books = Vec::with_capacity(remote_books.len());
    for mut book in remote_books {
        let local = store.fetch_media_progress(&book.id).await?;
        let remote = remote_progress.get(&book.id);

        let local_wins = match (&local, remote) {
            (Some(local), Some(remote)) => local.is_newer_than(remote),
            (Some(_), None) => true,
            _ => false,
        };

        if local_wins {
            if let Some(local) = &local {
                book.listened_last_update = Some(local.last_update);
                if let Some(cached) = store.fetch_book(&book.id).await? {
                    book.listened_percentage = RecentBook::percentage(local.current_time, cached.total_duration());
                }
            }
        } else if let Some(remote) = remote {
            book.listened_last_update = Some(remote.last_update);
        }

        books.push(book);
    }

    Ok(books)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfcast_core::Timestamp;

    fn progress(time: f64, updated: i64) -> MediaProgress {
        MediaProgress {
            current_time: time,
            is_finished: false,
            last_update: Timestamp::from_millis(updated),
        }
    }

    #[test]
    fn test_newest_wins() {
        let local = progress(100.0, 2_000);
        let remote = progress(50.0, 1_000);
        assert_eq!(merge_progress(&local, &remote).current_time, 100.0);
        assert_eq!(merge_progress(&remote, &local).current_time, 100.0);
    }

    #[test]
    fn test_tie_keeps_remote() {
        let local = progress(100.0, 1_000);
        let remote = progress(50.0, 1_000);
        assert_eq!(merge_progress(&local, &remote).current_time, 50.0);
    }

    #[test]
    fn test_missing_side_never_wins() {
        let merger = ProgressMerger::new(ConflictResolution::UseRemote);
        let local = progress(10.0, 1);
        assert_eq!(merger.merge(Some(&local), None), Some(local.clone()));
        assert_eq!(merger.merge(None, None), None);
    }

    #[test]
    fn test_fixed_strategies() {
        let local = progress(10.0, 1);
        let remote = progress(20.0, 2);

        let use_local = ProgressMerger::new(ConflictResolution::UseLocal);
        assert_eq!(use_local.merge(Some(&local), Some(&remote)), Some(local.clone()));

        let use_remote = ProgressMerger::new(ConflictResolution::UseRemote);
        assert_eq!(use_remote.merge(Some(&local), Some(&remote)), Some(remote.clone()));

        let newest = ProgressMerger::default();
        assert_eq!(newest.strategy(), ConflictResolution::UseNewest);
        assert_eq!(newest.merge(Some(&local), Some(&remote)), Some(remote));
    }
}
