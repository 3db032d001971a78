//! Domain types for Shelfcast
//!
//! - `book`: books, chapters, files and their identifiers
//! - `bookmark`: user bookmarks and their sync state
//! - `progress`: listening progress
//! - `library`: listing order and paging
//! - `common`: shared traits and utilities

mod book;
mod bookmark;
mod common;
mod library;
mod progress;

pub use book::{
    Book, BookFile, BookId, BookSeries, Chapter, ChapterId, DetailedBook, FileId, LibraryId,
    RecentBook,
};
pub use bookmark::{build_bookmark_title, Bookmark, BookmarkSyncState};
pub use common::{format_time, Timestamp, Validator};
pub use library::{LibraryOrdering, OrderingDirection, OrderingField, PagedItems};
pub use progress::{MediaProgress, PlaybackProgress};
