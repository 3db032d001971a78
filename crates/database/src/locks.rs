//! Per-book write serialization

use shelfcast_core::{AppError, BookId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Map of async mutexes keyed by book id
///
/// Writers for the same book queue up behind each other; writers for
/// different books never contend. Entries nobody holds or waits on are
/// dropped on the next acquisition.
#[derive(Debug, Clone, Default)]
pub struct BookLocks {
    locks: Arc<Mutex<HashMap<BookId, Arc<AsyncMutex<()>>>>>,
}

impl BookLocks {
    /// Creates an empty lock map
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive write access to one book
    pub async fn acquire(&self, book_id: &BookId) -> Result<OwnedMutexGuard<()>, AppError> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|_| AppError::InternalError {
                message: "Book lock map poisoned".to_string(),
            })?;

            // A count of one means only the map still references the mutex
            locks.retain(|id, lock| id == book_id || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(book_id.clone()).or_default())
        };

        Ok(lock.lock_owned().await)
    }

    /// Number of books with a live lock entry
    pub fn tracked(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}
