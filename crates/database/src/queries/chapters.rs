//! Chapter database operations

use crate::DbPool;
use shelfcast_core::{AppError, BookId, Chapter, ChapterId};
use sqlx::{SqliteConnection, SqliteExecutor};
use std::collections::HashSet;

/// Replaces the chapter rows of a book with the given chapters and cached flags
///
/// Chapters that are not in `chapters` any more are removed.
pub async fn replace_chapters(
    conn: &mut SqliteConnection,
    book_id: &BookId,
    chapters: &[(Chapter, bool)],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM book_chapters WHERE bookId = ?")
        .bind(book_id.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::database("Failed to clear book chapters", e))?;

    for (chapter, cached) in chapters {
        sqlx::query(
            r#"
            INSERT INTO book_chapters (bookChapterId, duration, start, "end", title, bookId, isCached)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(chapter.id.as_str())
        .bind(chapter.duration)
        .bind(chapter.start)
        .bind(chapter.end)
        .bind(&chapter.title)
        .bind(book_id.as_str())
        .bind(*cached)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::database("Failed to save chapter", e))?;
    }

    Ok(())
}

/// Ids of the chapters of a book currently flagged as cached
pub async fn cached_chapter_ids<'c, E>(
    executor: E,
    book_id: &BookId,
) -> Result<HashSet<ChapterId>, AppError>
where
    E: SqliteExecutor<'c>,
{
    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT bookChapterId FROM book_chapters WHERE bookId = ? AND isCached = 1",
    )
    .bind(book_id.as_str())
    .fetch_all(executor)
    .await
    .map_err(|e| AppError::database("Failed to read cached chapters", e))?;

    Ok(ids.into_iter().map(ChapterId::from).collect())
}

/// Gets all chapters of a book ordered by start; `available` mirrors the cached flag
pub async fn get_book_chapters(pool: &DbPool, book_id: &BookId) -> Result<Vec<Chapter>, AppError> {
    let rows = sqlx::query(
        r#"
        SELECT bookChapterId, duration, start, "end", title, isCached
        FROM book_chapters WHERE bookId = ?
        ORDER BY start ASC
        "#,
    )
    .bind(book_id.as_str())
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::database("Failed to get book chapters", e))?;

    rows.into_iter().map(row_to_chapter).collect()
}

/// Checks whether one chapter of a book is cached on the device
pub async fn is_chapter_cached(
    pool: &DbPool,
    book_id: &BookId,
    chapter_id: &ChapterId,
) -> Result<bool, AppError> {
    let cached: bool = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) > 0
        FROM book_chapters
        WHERE bookId = ?
          AND bookChapterId = ?
          AND isCached = 1
        "#,
    )
    .bind(book_id.as_str())
    .bind(chapter_id.as_str())
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::database("Failed to check chapter cache", e))?;

    Ok(cached)
}

/// Sum of the chapter durations of a book, 0 when it has none
pub async fn total_duration<'c, E>(executor: E, book_id: &BookId) -> Result<f64, AppError>
where
    E: SqliteExecutor<'c>,
{
    let total: f64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(duration), 0.0) FROM book_chapters WHERE bookId = ?")
            .bind(book_id.as_str())
            .fetch_one(executor)
            .await
            .map_err(|e| AppError::database("Failed to sum chapter durations", e))?;

    Ok(total)
}

pub(crate) fn row_to_chapter(row: sqlx::sqlite::SqliteRow) -> Result<Chapter, AppError> {
    use sqlx::Row;

    let id: String = row
        .try_get("bookChapterId")
        .map_err(|e| AppError::database("Missing chapter ID", e))?;
    let start: f64 = row
        .try_get("start")
        .map_err(|e| AppError::database("Missing start", e))?;
    let end: f64 = row
        .try_get("end")
        .map_err(|e| AppError::database("Missing end", e))?;
    let duration: f64 = row
        .try_get("duration")
        .map_err(|e| AppError::database("Missing duration", e))?;
    let cached: bool = row
        .try_get("isCached")
        .map_err(|e| AppError::database("Missing cached flag", e))?;

    Ok(Chapter {
        id: ChapterId::from(id),
        title: row
            .try_get("title")
            .map_err(|e| AppError::database("Missing title", e))?,
        start,
        end,
        duration,
        available: cached,
    })
}
