//! Database query operations organized by table

pub mod bookmarks;
pub mod books;
pub mod chapters;
pub mod progress;

pub use bookmarks::{delete_bookmark, get_item_bookmarks, stored_position, upsert_bookmark};
pub use books::{
    book_exists, delete_book, get_book, get_book_files, latest_progress_update, list_book_ids,
    list_cached_items, replace_book_files, upsert_book,
};
pub use chapters::{
    cached_chapter_ids, get_book_chapters, is_chapter_cached, replace_chapters, total_duration,
};
pub use progress::{get_media_progress, upsert_media_progress};
