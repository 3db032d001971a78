// crates/sync-engine/src/bookmarks.rs
//! Bookmark reconciliation between the device and the server
//!
//! The local table is the source of truth for what the user sees. Bookmarks
//! created or deleted while offline keep a pending state until the server
//! confirms them; every [`BookmarkSynchronizer::fetch_bookmarks`] call
//! pushes those first and then mirrors the server's list.

use crate::channel::{guarded, CreateBookmarkRequest, MediaChannel};
use crate::error::SyncResult;
use crate::types::SyncSettings;
use shelfcast_core::{build_bookmark_title, BookId, Bookmark, BookmarkSyncState};
use shelfcast_database::{stored_position, BookmarkRepository};
use std::sync::Arc;

/// Keeps cached bookmarks and server bookmarks in step
pub struct BookmarkSynchronizer {
    channel: Arc<dyn MediaChannel>,
    repository: BookmarkRepository,
    settings: SyncSettings,
}

impl BookmarkSynchronizer {
    pub fn new(channel: Arc<dyn MediaChannel>, repository: BookmarkRepository, settings: SyncSettings) -> Self {
        Self {
            channel,
            repository,
            settings,
        }
    }

    /// Bookmarks to show for an item, newest first, without any remote call
    ///
    /// Pending deletions are hidden and duplicates at the same position
    /// collapse to the newest entry.
    pub async fn provide_bookmarks(&self, item_id: &BookId) -> SyncResult<Vec<Bookmark>> {
        let mut bookmarks: Vec<Bookmark> = self
            .repository
            .fetch_bookmarks(item_id)
            .await?
            .into_iter()
            .filter(|b| b.sync_state != BookmarkSyncState::PendingDelete)
            .collect();

        bookmarks.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut visible: Vec<Bookmark> = Vec::with_capacity(bookmarks.len());
        for bookmark in bookmarks {
            if !visible.iter().any(|kept| kept.is_same(&bookmark)) {
                visible.push(bookmark);
            }
        }

        Ok(visible)
    }

    /// Reconciles one item with the server and returns the resulting view
    ///
    /// A failed push leaves the entry pending for the next round. A failed
    /// pull leaves the local table untouched.
    pub async fn fetch_bookmarks(&self, item_id: &BookId) -> SyncResult<Vec<Bookmark>> {
        let local = self.repository.fetch_bookmarks(item_id).await?;

        for pending in local.iter().filter(|b| b.sync_state == BookmarkSyncState::PendingCreate) {
            if let Err(e) = self.push_create(pending).await {
                log::warn!("Bookmark '{}' stays pending: {}", pending.title, e);
            }
        }

        for pending in local.iter().filter(|b| b.sync_state == BookmarkSyncState::PendingDelete) {
            if let Err(e) = self.push_drop(pending).await {
                log::warn!("Deletion of bookmark '{}' stays pending: {}", pending.title, e);
            }
        }

        let remote = match self.pull(item_id).await {
            Ok(remote) => remote.into_iter().map(at_stored_position).collect::<Vec<_>>(),
            Err(e) => {
                log::warn!("Unable to fetch bookmarks of {} from the server: {}", item_id, e);
                return self.provide_bookmarks(item_id).await;
            }
        };

        for bookmark in &remote {
            self.repository
                .upsert_bookmark(&bookmark.with_sync_state(BookmarkSyncState::Synced))
                .await?;
        }

        let orphans = self
            .repository
            .fetch_bookmarks(item_id)
            .await?
            .into_iter()
            .filter(|local| local.sync_state == BookmarkSyncState::Synced)
            .filter(|local| !remote.iter().any(|r| r.is_same(local)));

        for orphan in orphans {
            log::debug!("Removing bookmark '{}' deleted on the server", orphan.title);
            self.repository
                .delete_bookmark(&orphan.library_item_id, orphan.total_position)
                .await?;
        }

        self.provide_bookmarks(item_id).await
    }

    /// Bookmarks the current position
    ///
    /// The bookmark is stored locally before the server is asked. The
    /// returned bookmark is the server's copy when the server accepted it,
    /// otherwise the pending draft.
    pub async fn create_bookmark(
        &self,
        chapter_time: f64,
        total_time: f64,
        item_id: &BookId,
        chapter_title: &str,
    ) -> SyncResult<Bookmark> {
        let draft = Bookmark::draft(
            item_id.clone(),
            build_bookmark_title(chapter_title, chapter_time),
            total_time,
        );
        self.repository.upsert_bookmark(&draft).await?;

        match self.push_create(&draft).await {
            Ok(synced) => Ok(synced),
            Err(e) => {
                log::warn!("Bookmark '{}' saved offline: {}", draft.title, e);
                Ok(draft)
            }
        }
    }

    /// Deletes a bookmark, keeping a pending tombstone until the server confirms
    pub async fn drop_bookmark(&self, bookmark: &Bookmark) -> SyncResult<()> {
        self.repository
            .upsert_bookmark(&bookmark.with_sync_state(BookmarkSyncState::PendingDelete))
            .await?;

        if let Err(e) = self.push_drop(bookmark).await {
            log::warn!("Deletion of bookmark '{}' deferred: {}", bookmark.title, e);
        }

        Ok(())
    }

    async fn push_create(&self, pending: &Bookmark) -> SyncResult<Bookmark> {
        let request = CreateBookmarkRequest::from_bookmark(pending);
        let created = guarded(self.settings.request_timeout, &self.settings.retry, || {
            self.channel.create_bookmark(request.clone())
        })
        .await?;

        let synced = at_stored_position(created).with_sync_state(BookmarkSyncState::Synced);
        self.repository
            .delete_bookmark(&pending.library_item_id, pending.total_position)
            .await?;
        self.repository.upsert_bookmark(&synced).await?;

        Ok(synced)
    }

    async fn push_drop(&self, bookmark: &Bookmark) -> SyncResult<()> {
        guarded(self.settings.request_timeout, &self.settings.retry, || {
            self.channel.drop_bookmark(bookmark)
        })
        .await?;

        self.repository
            .delete_bookmark(&bookmark.library_item_id, bookmark.total_position)
            .await?;
        Ok(())
    }

    async fn pull(&self, item_id: &BookId) -> SyncResult<Vec<Bookmark>> {
        guarded(self.settings.request_timeout, &self.settings.retry, || {
            self.channel.fetch_bookmarks(item_id)
        })
        .await
    }
}

/// Snaps a server bookmark onto the whole-second position the cache keys on
fn at_stored_position(bookmark: Bookmark) -> Bookmark {
    Bookmark {
        total_position: stored_position(bookmark.total_position) as f64,
        ..bookmark
    }
}
