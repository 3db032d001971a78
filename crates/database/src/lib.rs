//! Shelfcast Database Layer
//!
//! Offline cache of books, chapters, audio files, listening progress and
//! bookmarks. It uses SQLite through sqlx; every write that touches a book runs
//! in a single transaction.
//!
//! # Example
//!
//! ```no_run
//! use shelfcast_database::{connect, run_migrations, CacheContext, CachedBookStore, DatabaseConfig};
//!
//! # async fn example() -> Result<(), shelfcast_core::AppError> {
//! let pool = connect(DatabaseConfig::new("shelfcast.db")).await?;
//! run_migrations(&pool).await?;
//!
//! let store = CachedBookStore::new(pool, CacheContext::default());
//! let page = store.fetch_books(0, 20).await?;
//! println!("{} books on this page", page.items.len());
//! # Ok(())
//! # }
//! ```

pub mod bookmarks;
pub mod connection;
pub mod locks;
pub mod migrations;
pub mod queries;
pub mod request;
pub mod store;

pub use bookmarks::BookmarkRepository;
pub use connection::{close, connect, database_exists, DatabaseConfig, DbPool};
pub use locks::BookLocks;
pub use queries::stored_position;
pub use migrations::{applied_version, current_version, optimize, run_migrations, verify_integrity};
pub use request::{BookQuery, RecentQuery, RECENT_BOOKS_LIMIT};
pub use store::{merge_cached_flags, CacheContext, CachedBookStore, FinishedCheck};
