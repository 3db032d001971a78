//! Cached book database operations

use crate::queries::{chapters, progress};
use crate::DbPool;
use shelfcast_core::{
    AppError, Book, BookFile, BookId, BookSeries, DetailedBook, LibraryId, Timestamp,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqliteExecutor};

/// Inserts a book row or updates it in place
///
/// An in-place update keeps the dependent rows alive; a `REPLACE` would
/// cascade-delete the book's chapters and progress.
pub async fn upsert_book<'c, E>(executor: E, book: &DetailedBook) -> Result<(), AppError>
where
    E: SqliteExecutor<'c>,
{
    let series_json = serde_json::to_string(&book.series)
        .map_err(|e| AppError::database("Failed to serialize series", e))?;

    sqlx::query(
        r#"
        INSERT INTO detailed_books (
            id, title, subtitle, author, narrator, duration, libraryId,
            year, abstract, publisher, createdAt, updatedAt, seriesNames, seriesJson
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            subtitle = excluded.subtitle,
            author = excluded.author,
            narrator = excluded.narrator,
            duration = excluded.duration,
            libraryId = excluded.libraryId,
            year = excluded.year,
            abstract = excluded.abstract,
            publisher = excluded.publisher,
            createdAt = excluded.createdAt,
            updatedAt = excluded.updatedAt,
            seriesNames = excluded.seriesNames,
            seriesJson = excluded.seriesJson
        "#,
    )
    .bind(book.id.as_str())
    .bind(&book.title)
    .bind(&book.subtitle)
    .bind(&book.author)
    .bind(&book.narrator)
    .bind(book.total_duration() as i64)
    .bind(book.library_id.as_ref().map(|id| id.as_str()))
    .bind(&book.year)
    .bind(&book.abstract_text)
    .bind(&book.publisher)
    .bind(book.created_at.as_millis())
    .bind(book.updated_at.as_millis())
    .bind(book.series_names())
    .bind(series_json)
    .execute(executor)
    .await
    .map_err(|e| AppError::database("Failed to save book", e))?;

    Ok(())
}

/// Replaces the file rows of a book, keeping the given order
pub async fn replace_book_files(
    conn: &mut SqliteConnection,
    book_id: &BookId,
    files: &[BookFile],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM book_files WHERE bookId = ?")
        .bind(book_id.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::database("Failed to clear book files", e))?;

    for (index, file) in files.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO book_files (bookFileId, name, duration, mimeType, fileIndex, bookId)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(file.id.as_str())
        .bind(&file.name)
        .bind(file.duration)
        .bind(&file.mime_type)
        .bind(index as i64)
        .bind(book_id.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::database("Failed to save book file", e))?;
    }

    Ok(())
}

/// Gets the files of a book in playback order
pub async fn get_book_files(pool: &DbPool, book_id: &BookId) -> Result<Vec<BookFile>, AppError> {
    let rows = sqlx::query(
        "SELECT bookFileId, name, duration, mimeType FROM book_files WHERE bookId = ? ORDER BY fileIndex",
    )
    .bind(book_id.as_str())
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::database("Failed to fetch book files", e))?;

    rows.into_iter().map(row_to_file).collect()
}

/// Rebuilds the full book aggregate, `None` when the book is not cached
pub async fn get_book(pool: &DbPool, id: &BookId) -> Result<Option<DetailedBook>, AppError> {
    let row = sqlx::query("SELECT * FROM detailed_books WHERE id = ?")
        .bind(id.as_str())
        .fetch_optional(pool)
        .await
        .map_err(|e| AppError::database("Failed to fetch book", e))?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut book = row_to_detailed_book(&row)?;
    book.files = get_book_files(pool, id).await?;
    book.chapters = chapters::get_book_chapters(pool, id).await?;
    book.progress = progress::get_media_progress(pool, id).await?;

    Ok(Some(book))
}

/// Deletes a book with its files, chapters and progress
///
/// Returns false if the book was not cached.
pub async fn delete_book(pool: &DbPool, id: &BookId) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM detailed_books WHERE id = ?")
        .bind(id.as_str())
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to delete book", e))?;

    Ok(result.rows_affected() > 0)
}

/// Checks whether a book row exists
pub async fn book_exists<'c, E>(executor: E, id: &BookId) -> Result<bool, AppError>
where
    E: SqliteExecutor<'c>,
{
    let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM detailed_books WHERE id = ?")
        .bind(id.as_str())
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::database("Failed to check book", e))?;

    Ok(exists)
}

/// Lists the ids of every cached book
pub async fn list_book_ids(pool: &DbPool) -> Result<Vec<BookId>, AppError> {
    let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM detailed_books ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::database("Failed to list cached books", e))?;

    Ok(ids.into_iter().map(BookId::from).collect())
}

/// Pages through every cached book regardless of library
pub async fn list_cached_items(
    pool: &DbPool,
    page_number: u32,
    page_size: u32,
) -> Result<Vec<DetailedBook>, AppError> {
    let ids: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT id FROM detailed_books
        ORDER BY title ASC, libraryId ASC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(i64::from(page_size))
    .bind(i64::from(page_number) * i64::from(page_size))
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::database("Failed to list cached items", e))?;

    let mut books = Vec::with_capacity(ids.len());
    for id in ids {
        // Removed between the two queries; skip rather than fail the page
        if let Some(book) = get_book(pool, &BookId::from(id)).await? {
            books.push(book);
        }
    }

    Ok(books)
}

/// Most recent progress update among books visible in a library
pub async fn latest_progress_update(
    pool: &DbPool,
    library_id: &LibraryId,
) -> Result<Option<Timestamp>, AppError> {
    let latest: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT MAX(mp.lastUpdate)
        FROM detailed_books AS d
        INNER JOIN media_progress AS mp ON d.id = mp.bookId
        WHERE (d.libraryId IS NULL OR d.libraryId = ?)
        "#,
    )
    .bind(library_id.as_str())
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::database("Failed to fetch latest update", e))?;

    Ok(latest.map(Timestamp::from_millis))
}

/// Maps a `detailed_books` row to a list entry
pub(crate) fn row_to_book(row: &SqliteRow) -> Result<Book, AppError> {
    let id: String = row
        .try_get("id")
        .map_err(|e| AppError::database("Missing book ID", e))?;
    let title: String = row
        .try_get("title")
        .map_err(|e| AppError::database("Missing title", e))?;
    let duration: i64 = row
        .try_get("duration")
        .map_err(|e| AppError::database("Missing duration", e))?;
    let library_id: Option<String> = row
        .try_get("libraryId")
        .map_err(|e| AppError::database("Missing library ID", e))?;

    Ok(Book {
        id: BookId::from(id),
        title,
        subtitle: row.try_get("subtitle").ok().flatten(),
        author: row.try_get("author").ok().flatten(),
        duration,
        library_id: library_id.map(LibraryId::from),
        cached: true,
    })
}

fn row_to_detailed_book(row: &SqliteRow) -> Result<DetailedBook, AppError> {
    let id: String = row
        .try_get("id")
        .map_err(|e| AppError::database("Missing book ID", e))?;
    let title: String = row
        .try_get("title")
        .map_err(|e| AppError::database("Missing title", e))?;
    let created_at: i64 = row
        .try_get("createdAt")
        .map_err(|e| AppError::database("Missing createdAt", e))?;
    let updated_at: i64 = row
        .try_get("updatedAt")
        .map_err(|e| AppError::database("Missing updatedAt", e))?;
    let library_id: Option<String> = row
        .try_get("libraryId")
        .map_err(|e| AppError::database("Missing library ID", e))?;
    let series_json: Option<String> = row
        .try_get("seriesJson")
        .map_err(|e| AppError::database("Missing series", e))?;

    let series: Vec<BookSeries> = match series_json {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| AppError::database("Failed to deserialize series", e))?,
        None => Vec::new(),
    };

    Ok(DetailedBook {
        id: BookId::from(id),
        title,
        subtitle: row.try_get("subtitle").ok().flatten(),
        author: row.try_get("author").ok().flatten(),
        narrator: row.try_get("narrator").ok().flatten(),
        publisher: row.try_get("publisher").ok().flatten(),
        year: row.try_get("year").ok().flatten(),
        abstract_text: row.try_get("abstract").ok().flatten(),
        series,
        files: Vec::new(),
        chapters: Vec::new(),
        progress: None,
        library_id: library_id.map(LibraryId::from),
        created_at: Timestamp::from_millis(created_at),
        updated_at: Timestamp::from_millis(updated_at),
    })
}

fn row_to_file(row: SqliteRow) -> Result<BookFile, AppError> {
    let id: String = row
        .try_get("bookFileId")
        .map_err(|e| AppError::database("Missing file ID", e))?;
    let name: String = row
        .try_get("name")
        .map_err(|e| AppError::database("Missing file name", e))?;
    let duration: f64 = row
        .try_get("duration")
        .map_err(|e| AppError::database("Missing file duration", e))?;
    let mime_type: String = row
        .try_get("mimeType")
        .map_err(|e| AppError::database("Missing mime type", e))?;

    Ok(BookFile::new(id, name, duration, mime_type))
}
