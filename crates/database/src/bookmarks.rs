//! Local bookmark repository

use crate::queries::bookmarks;
use crate::DbPool;
use shelfcast_core::{AppError, BookId, Bookmark};

/// Bookmarks stored on the device, each tagged with its sync state
#[derive(Debug, Clone)]
pub struct BookmarkRepository {
    pool: DbPool,
}

impl BookmarkRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Bookmarks of an item ordered by position, then creation time
    pub async fn fetch_bookmarks(&self, library_item_id: &BookId) -> Result<Vec<Bookmark>, AppError> {
        bookmarks::get_item_bookmarks(&self.pool, library_item_id).await
    }

    /// Stores a bookmark, replacing any at the same item and whole-second position
    pub async fn upsert_bookmark(&self, bookmark: &Bookmark) -> Result<(), AppError> {
        bookmarks::upsert_bookmark(&self.pool, bookmark).await?;
        log::debug!(
            "Stored bookmark {}@{} as {:?}",
            bookmark.library_item_id,
            bookmarks::stored_position(bookmark.total_position),
            bookmark.sync_state
        );
        Ok(())
    }

    /// Removes the bookmark of an item at a position, matched in whole seconds
    pub async fn delete_bookmark(&self, library_item_id: &BookId, total_position: f64) -> Result<bool, AppError> {
        bookmarks::delete_bookmark(&self.pool, library_item_id, total_position).await
    }
}
