//! Media progress database operations

use crate::DbPool;
use shelfcast_core::{AppError, BookId, MediaProgress, Timestamp};
use sqlx::SqliteExecutor;

/// Creates or replaces the progress of a book
pub async fn upsert_media_progress<'c, E>(
    executor: E,
    book_id: &BookId,
    progress: &MediaProgress,
) -> Result<(), AppError>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query(
        r#"
        INSERT INTO media_progress (bookId, currentTime, isFinished, lastUpdate)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(bookId) DO UPDATE SET
            currentTime = excluded.currentTime,
            isFinished = excluded.isFinished,
            lastUpdate = excluded.lastUpdate
        "#,
    )
    .bind(book_id.as_str())
    .bind(progress.current_time)
    .bind(progress.is_finished)
    .bind(progress.last_update.as_millis())
    .execute(executor)
    .await
    .map_err(|e| AppError::database("Failed to save media progress", e))?;

    Ok(())
}

/// Gets the progress of a book, `None` if nothing was recorded
pub async fn get_media_progress(
    pool: &DbPool,
    book_id: &BookId,
) -> Result<Option<MediaProgress>, AppError> {
    let row = sqlx::query(
        "SELECT currentTime, isFinished, lastUpdate FROM media_progress WHERE bookId = ?",
    )
    .bind(book_id.as_str())
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::database("Failed to fetch media progress", e))?;

    row.map(row_to_progress).transpose()
}

fn row_to_progress(row: sqlx::sqlite::SqliteRow) -> Result<MediaProgress, AppError> {
    use sqlx::Row;

    let current_time: f64 = row
        .try_get("currentTime")
        .map_err(|e| AppError::database("Missing current time", e))?;
    let is_finished: bool = row
        .try_get("isFinished")
        .map_err(|e| AppError::database("Missing finished flag", e))?;
    let last_update: i64 = row
        .try_get("lastUpdate")
        .map_err(|e| AppError::database("Missing last update", e))?;

    Ok(MediaProgress {
        current_time,
        is_finished,
        last_update: Timestamp::from_millis(last_update),
    })
}
