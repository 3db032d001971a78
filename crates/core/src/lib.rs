//! Shelfcast core domain
//!
//! Pure types and algorithms shared by the cache, sync and config crates:
//! - `types`: books, chapters, files, bookmarks, progress, listing options
//! - `position`: chapter-position resolution for an overall playback position
//! - `clips`: mapping of chapters onto audio file slices
//! - `error`: the application error type and its recovery hints

pub mod clips;
pub mod error;
pub mod position;
pub mod types;

pub use clips::{resolve_chapter_files, FileClip, CLIP_EPSILON};
pub use error::{AppError, ErrorSeverity, RecoveryAction, Result};
pub use position::{
    resolve_chapter_index, resolve_chapter_offset, resolve_chapter_position, ChapterPosition,
    BOUNDARY_EPSILON, NO_CHAPTER,
};
pub use types::{
    build_bookmark_title, format_time, Book, BookFile, BookId, BookSeries, Bookmark,
    BookmarkSyncState, Chapter, ChapterId, DetailedBook, FileId, LibraryId, LibraryOrdering,
    MediaProgress, OrderingDirection, OrderingField, PagedItems, PlaybackProgress, RecentBook,
    Timestamp, Validator,
};
