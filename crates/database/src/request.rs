//! Library listing queries
//!
//! The listing, search and recent shelves share one filter vocabulary
//! (library scope, download state, finished state) and are assembled with
//! `sqlx::QueryBuilder` so every user-provided value is bound, never spliced.
//! Sort columns come from the closed [`OrderingField`] enum.

use shelfcast_core::{LibraryId, LibraryOrdering};
use sqlx::{QueryBuilder, Sqlite};

/// Number of entries on the recent shelf
pub const RECENT_BOOKS_LIMIT: u32 = 10;

/// Progress below this many seconds does not count as started
pub const RECENT_MIN_POSITION: f64 = 1.0;

const CACHED_CHAPTERS_JOIN: &str = " INNER JOIN book_chapters ON detailed_books.id = book_chapters.bookId AND book_chapters.isCached = 1";

/// Restricts to the library, or to library-less items when there is none
fn push_library_filter(builder: &mut QueryBuilder<'static, Sqlite>, library_id: Option<&LibraryId>) {
    match library_id {
        None => {
            builder.push(" WHERE detailed_books.libraryId IS NULL");
        }
        Some(id) => {
            builder.push(" WHERE (detailed_books.libraryId = ");
            builder.push_bind(id.as_str().to_string());
            builder.push(" OR detailed_books.libraryId IS NULL)");
        }
    }
}

/// Listing or search over the cached books
#[derive(Debug, Clone, Default)]
pub struct BookQuery {
    library_id: Option<LibraryId>,
    ordering: LibraryOrdering,
    downloaded_only: bool,
    hide_finished: bool,
    search: Option<String>,
    page: Option<(u32, u32)>,
}

impl BookQuery {
    /// Creates an unpaged listing of library-less books ordered by title
    pub fn new() -> Self {
        Self::default()
    }

    pub fn library_id(mut self, library_id: Option<LibraryId>) -> Self {
        self.library_id = library_id;
        self
    }

    pub fn ordering(mut self, ordering: LibraryOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Only books with at least one chapter cached on the device
    pub fn downloaded_only(mut self, enabled: bool) -> Self {
        self.downloaded_only = enabled;
        self
    }

    /// Leave out books whose progress is marked finished
    pub fn hide_finished(mut self, enabled: bool) -> Self {
        self.hide_finished = enabled;
        self
    }

    /// Substring match on title or author
    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    /// Zero-based page of `page_size` books
    pub fn page(mut self, page_number: u32, page_size: u32) -> Self {
        self.page = Some((page_number, page_size));
        self
    }

    /// Assembles the statement; rows are `detailed_books` rows
    pub fn build(&self) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new("SELECT DISTINCT detailed_books.* FROM detailed_books");

        if self.downloaded_only {
            builder.push(CACHED_CHAPTERS_JOIN);
        }
        if self.hide_finished {
            builder.push(" LEFT JOIN media_progress ON detailed_books.id = media_progress.bookId");
        }

        push_library_filter(&mut builder, self.library_id.as_ref());

        if self.hide_finished {
            builder.push(" AND (media_progress.isFinished IS NULL OR media_progress.isFinished = 0)");
        }

        if let Some(query) = &self.search {
            let pattern = contains_pattern(query);
            builder.push(" AND (detailed_books.title LIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" ESCAPE '\\' OR detailed_books.author LIKE ");
            builder.push_bind(pattern);
            builder.push(" ESCAPE '\\')");
        }

        builder.push(" ORDER BY ");
        builder.push(self.ordering.field.column());
        builder.push(" ");
        builder.push(self.ordering.direction.as_sql());
        // Stable pages when the sort column has ties
        builder.push(", detailed_books.id ASC");

        if let Some((page_number, page_size)) = self.page {
            builder.push(" LIMIT ");
            builder.push_bind(i64::from(page_size));
            builder.push(" OFFSET ");
            builder.push_bind(i64::from(page_number) * i64::from(page_size));
        }

        builder
    }
}

/// The "continue listening" shelf
#[derive(Debug, Clone)]
pub struct RecentQuery {
    library_id: Option<LibraryId>,
    downloaded_only: bool,
    limit: u32,
}

impl Default for RecentQuery {
    fn default() -> Self {
        Self {
            library_id: None,
            downloaded_only: false,
            limit: RECENT_BOOKS_LIMIT,
        }
    }
}

impl RecentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn library_id(mut self, library_id: Option<LibraryId>) -> Self {
        self.library_id = library_id;
        self
    }

    pub fn downloaded_only(mut self, enabled: bool) -> Self {
        self.downloaded_only = enabled;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Assembles the statement; rows carry `currentTime` and `lastUpdate` next
    /// to the book columns
    pub fn build(&self) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new(
            "SELECT DISTINCT detailed_books.*, media_progress.currentTime, media_progress.lastUpdate \
             FROM detailed_books \
             INNER JOIN media_progress ON detailed_books.id = media_progress.bookId",
        );

        if self.downloaded_only {
            builder.push(CACHED_CHAPTERS_JOIN);
        }

        push_library_filter(&mut builder, self.library_id.as_ref());

        builder.push(" AND media_progress.currentTime > ");
        builder.push_bind(RECENT_MIN_POSITION);
        builder.push(" AND media_progress.isFinished = 0");
        builder.push(" ORDER BY media_progress.lastUpdate DESC LIMIT ");
        builder.push_bind(i64::from(self.limit));

        builder
    }
}

/// LIKE pattern matching `query` anywhere, with its wildcards taken literally
fn contains_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
