//! Cached book store
//!
//! Composes the per-table queries into the operations the rest of the app
//! uses. Listing behaviour depends on a [`CacheContext`] owned by the store.
//! Writes that touch one book are serialized through [`BookLocks`]; reads
//! go straight to the pool.

use crate::locks::BookLocks;
use crate::queries::{books, chapters, progress};
use crate::request::{BookQuery, RecentQuery, RECENT_BOOKS_LIMIT};
use crate::DbPool;
use shelfcast_core::{
    AppError, Book, BookId, Chapter, ChapterId, DetailedBook, LibraryId, LibraryOrdering,
    MediaProgress, PagedItems, PlaybackProgress, RecentBook, Timestamp,
};
use sqlx::Row;
use std::collections::HashSet;
use std::sync::RwLock;

/// How a synced position is compared with the book length
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FinishedCheck {
    /// Finished only when the position equals the chapter sum
    #[default]
    Exact,
    /// Finished when the position is within the given seconds of the end
    Tolerance(f64),
}

impl FinishedCheck {
    pub fn is_finished(self, current_time: f64, total_duration: f64) -> bool {
        match self {
            Self::Exact => current_time == total_duration,
            Self::Tolerance(seconds) => (total_duration - current_time).abs() <= seconds,
        }
    }
}

/// Listing preferences applied by the store
#[derive(Debug, Clone, PartialEq)]
pub struct CacheContext {
    /// `None` lists only books that belong to no library
    pub library_id: Option<LibraryId>,
    pub ordering: LibraryOrdering,
    pub hide_finished: bool,
    pub downloaded_only: bool,
    pub finished_check: FinishedCheck,
    pub recent_limit: u32,
}

impl Default for CacheContext {
    fn default() -> Self {
        Self {
            library_id: None,
            ordering: LibraryOrdering::default(),
            hide_finished: false,
            downloaded_only: false,
            finished_check: FinishedCheck::default(),
            recent_limit: RECENT_BOOKS_LIMIT,
        }
    }
}

/// Computes the cached flag of every chapter of a book
///
/// A dropped chapter is never cached; otherwise a chapter is cached when it
/// was fetched now or was already cached before.
pub fn merge_cached_flags(
    chapters: &[Chapter],
    already_cached: &HashSet<ChapterId>,
    fetched: &[Chapter],
    dropped: &[Chapter],
) -> Vec<(Chapter, bool)> {
    chapters
        .iter()
        .map(|chapter| {
            let is_fetched = fetched.iter().any(|c| c.id == chapter.id);
            let is_dropped = dropped.iter().any(|c| c.id == chapter.id);
            let cached = !is_dropped && (is_fetched || already_cached.contains(&chapter.id));
            (chapter.clone(), cached)
        })
        .collect()
}

/// Local store of cached books, their chapters and progress
#[derive(Debug)]
pub struct CachedBookStore {
    pool: DbPool,
    context: RwLock<CacheContext>,
    locks: BookLocks,
}

impl CachedBookStore {
    pub fn new(pool: DbPool, context: CacheContext) -> Self {
        Self {
            pool,
            context: RwLock::new(context),
            locks: BookLocks::new(),
        }
    }

    /// Underlying pool
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Snapshot of the listing preferences
    pub fn context(&self) -> Result<CacheContext, AppError> {
        self.context
            .read()
            .map(|context| context.clone())
            .map_err(|_| AppError::InternalError {
                message: "Cache context lock poisoned".to_string(),
            })
    }

    /// Changes the listing preferences, e.g. after the user switches library
    pub fn update_context<F>(&self, f: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut CacheContext),
    {
        let mut context = self.context.write().map_err(|_| AppError::InternalError {
            message: "Cache context lock poisoned".to_string(),
        })?;
        f(&mut context);
        Ok(())
    }

    /// Stores a book and records which of its chapters are on the device
    ///
    /// The existing cached flags are read inside the same transaction that
    /// writes the new ones, so a download that completed concurrently is not
    /// lost. A failure leaves the previous state untouched.
    pub async fn upsert_cached_book(
        &self,
        book: &DetailedBook,
        fetched: &[Chapter],
        dropped: &[Chapter],
    ) -> Result<(), AppError> {
        let _guard = self.locks.acquire(&book.id).await?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database("Failed to begin transaction", e))?;

        let already_cached = chapters::cached_chapter_ids(&mut *tx, &book.id).await?;
        let rows = merge_cached_flags(&book.chapters, &already_cached, fetched, dropped);

        books::upsert_book(&mut *tx, book).await?;
        books::replace_book_files(&mut tx, &book.id, &book.files).await?;
        chapters::replace_chapters(&mut tx, &book.id, &rows).await?;

        if let Some(media_progress) = &book.progress {
            progress::upsert_media_progress(&mut *tx, &book.id, media_progress).await?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::database("Failed to commit cached book", e))?;

        log::debug!(
            "Cached book {} ({} of {} chapters on device)",
            book.id,
            rows.iter().filter(|(_, cached)| *cached).count(),
            rows.len()
        );
        Ok(())
    }

    /// One page of the library listing under the current preferences
    pub async fn fetch_books(&self, page_number: u32, page_size: u32) -> Result<PagedItems<Book>, AppError> {
        let context = self.context()?;
        let query = Self::listing(&context).page(page_number, page_size);
        let items = self.run_book_query(&query).await?;
        Ok(PagedItems::new(items, page_number))
    }

    /// Books whose title or author contains `query`
    pub async fn search_books(&self, query: &str) -> Result<Vec<Book>, AppError> {
        let context = self.context()?;
        let request = Self::listing(&context).search(query);
        self.run_book_query(&request).await
    }

    /// Started, unfinished books, most recently listened first
    pub async fn fetch_recent_books(&self) -> Result<Vec<RecentBook>, AppError> {
        let context = self.context()?;
        let request = RecentQuery::new()
            .library_id(context.library_id.clone())
            .downloaded_only(context.downloaded_only)
            .limit(context.recent_limit);

        let mut builder = request.build();
        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database("Failed to fetch recent books", e))?;

        rows.iter()
            .map(|row| {
                let book = books::row_to_book(row)?;
                let current_time: f64 = row
                    .try_get("currentTime")
                    .map_err(|e| AppError::database("Missing current time", e))?;
                let last_update: i64 = row
                    .try_get("lastUpdate")
                    .map_err(|e| AppError::database("Missing last update", e))?;

                Ok(RecentBook {
                    id: book.id,
                    title: book.title,
                    author: book.author,
                    listened_last_update: Some(Timestamp::from_millis(last_update)),
                    listened_percentage: RecentBook::percentage(current_time, book.duration as f64),
                })
            })
            .collect()
    }

    pub async fn fetch_book(&self, book_id: &BookId) -> Result<Option<DetailedBook>, AppError> {
        books::get_book(&self.pool, book_id).await
    }

    /// Evicts a book with everything that hangs off it
    pub async fn remove_book(&self, book_id: &BookId) -> Result<bool, AppError> {
        let _guard = self.locks.acquire(book_id).await?;
        let removed = books::delete_book(&self.pool, book_id).await?;
        if removed {
            log::info!("Removed cached book {}", book_id);
        }
        Ok(removed)
    }

    pub async fn is_book_cached(&self, book_id: &BookId) -> Result<bool, AppError> {
        books::book_exists(&self.pool, book_id).await
    }

    pub async fn is_chapter_cached(&self, book_id: &BookId, chapter_id: &ChapterId) -> Result<bool, AppError> {
        chapters::is_chapter_cached(&self.pool, book_id, chapter_id).await
    }

    pub async fn fetch_cached_book_ids(&self) -> Result<Vec<BookId>, AppError> {
        books::list_book_ids(&self.pool).await
    }

    /// Every cached book regardless of library, ordered by title
    pub async fn fetch_cached_items(
        &self,
        page_number: u32,
        page_size: u32,
    ) -> Result<PagedItems<DetailedBook>, AppError> {
        let items = books::list_cached_items(&self.pool, page_number, page_size).await?;
        Ok(PagedItems::new(items, page_number))
    }

    /// Newest progress timestamp among books visible in `library_id`
    pub async fn fetch_latest_update(&self, library_id: &LibraryId) -> Result<Option<Timestamp>, AppError> {
        books::latest_progress_update(&self.pool, library_id).await
    }

    pub async fn fetch_media_progress(&self, book_id: &BookId) -> Result<Option<MediaProgress>, AppError> {
        progress::get_media_progress(&self.pool, book_id).await
    }

    /// Marks which books of a remote page are also in the local cache
    pub async fn flag_cached(&self, page: PagedItems<Book>) -> Result<PagedItems<Book>, AppError> {
        let cached: HashSet<BookId> = self.fetch_cached_book_ids().await?.into_iter().collect();
        let items = page
            .items
            .into_iter()
            .map(|book| Book {
                cached: cached.contains(&book.id),
                ..book
            })
            .collect();
        Ok(PagedItems::new(items, page.current_page))
    }

    /// Mirrors a playback position into the cache
    ///
    /// Does nothing for books that are not cached.
    pub async fn sync_progress(&self, book_id: &BookId, playback: &PlaybackProgress) -> Result<(), AppError> {
        let finished_check = self.context()?.finished_check;
        let _guard = self.locks.acquire(book_id).await?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database("Failed to begin transaction", e))?;

        if !books::book_exists(&mut *tx, book_id).await? {
            log::debug!("Skipping progress for uncached book {}", book_id);
            return Ok(());
        }

        let total_duration = chapters::total_duration(&mut *tx, book_id).await?;
        let entry = MediaProgress::new(
            playback.current_total_time,
            finished_check.is_finished(playback.current_total_time, total_duration),
        );
        progress::upsert_media_progress(&mut *tx, book_id, &entry).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::database("Failed to commit progress", e))?;
        Ok(())
    }

    fn listing(context: &CacheContext) -> BookQuery {
        BookQuery::new()
            .library_id(context.library_id.clone())
            .ordering(context.ordering)
            .downloaded_only(context.downloaded_only)
            .hide_finished(context.hide_finished)
    }

    async fn run_book_query(&self, query: &BookQuery) -> Result<Vec<Book>, AppError> {
        let mut builder = query.build();
        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database("Failed to list cached books", e))?;

        rows.iter().map(books::row_to_book).collect()
    }
}
