//! Bookmark database operations

use crate::DbPool;
use shelfcast_core::{AppError, BookId, Bookmark, BookmarkSyncState, Timestamp};
use uuid::Uuid;

/// Positions are stored as whole seconds, truncated toward zero
pub fn stored_position(total_position: f64) -> i64 {
    total_position as i64
}

/// Inserts a bookmark or replaces the one at the same item and position
///
/// On conflict the row id is kept; title, creation time and sync state are
/// overwritten.
pub async fn upsert_bookmark(pool: &DbPool, bookmark: &Bookmark) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO cached_bookmark (id, title, libraryItemId, createdAt, totalPosition, syncState)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(libraryItemId, totalPosition) DO UPDATE SET
            title = excluded.title,
            createdAt = excluded.createdAt,
            syncState = excluded.syncState
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&bookmark.title)
    .bind(bookmark.library_item_id.as_str())
    .bind(bookmark.created_at.as_millis())
    .bind(stored_position(bookmark.total_position))
    .bind(bookmark.sync_state.as_integer())
    .execute(pool)
    .await
    .map_err(|e| AppError::database("Failed to save bookmark", e))?;

    Ok(())
}

/// Gets all bookmarks of an item, by position then creation time
pub async fn get_item_bookmarks(
    pool: &DbPool,
    library_item_id: &BookId,
) -> Result<Vec<Bookmark>, AppError> {
    let rows = sqlx::query(
        r#"
        SELECT title, libraryItemId, createdAt, totalPosition, syncState
        FROM cached_bookmark
        WHERE libraryItemId = ?
        ORDER BY totalPosition ASC, createdAt ASC
        "#,
    )
    .bind(library_item_id.as_str())
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::database("Failed to get item bookmarks", e))?;

    rows.into_iter().map(row_to_bookmark).collect()
}

/// Deletes the bookmark of an item at a position
///
/// Returns false if nothing matched.
pub async fn delete_bookmark(
    pool: &DbPool,
    library_item_id: &BookId,
    total_position: f64,
) -> Result<bool, AppError> {
    let result =
        sqlx::query("DELETE FROM cached_bookmark WHERE libraryItemId = ? AND totalPosition = ?")
            .bind(library_item_id.as_str())
            .bind(stored_position(total_position))
            .execute(pool)
            .await
            .map_err(|e| AppError::database("Failed to delete bookmark", e))?;

    Ok(result.rows_affected() > 0)
}

pub(crate) fn row_to_bookmark(row: sqlx::sqlite::SqliteRow) -> Result<Bookmark, AppError> {
    use sqlx::Row;

    let library_item_id: String = row
        .try_get("libraryItemId")
        .map_err(|e| AppError::database("Missing library item ID", e))?;
    let created_at: i64 = row
        .try_get("createdAt")
        .map_err(|e| AppError::database("Missing created_at", e))?;
    let total_position: i64 = row
        .try_get("totalPosition")
        .map_err(|e| AppError::database("Missing position", e))?;
    let sync_state: i64 = row
        .try_get("syncState")
        .map_err(|e| AppError::database("Missing sync state", e))?;

    Ok(Bookmark {
        library_item_id: BookId::from(library_item_id),
        title: row
            .try_get("title")
            .map_err(|e| AppError::database("Missing title", e))?,
        total_position: total_position as f64,
        created_at: Timestamp::from_millis(created_at),
        sync_state: BookmarkSyncState::from_integer(sync_state),
    })
}
