// crates/sync-engine/tests/sync_tests.rs
//! Integration tests for bookmark and progress synchronization

use async_trait::async_trait;
use shelfcast_core::{
    BookId, Bookmark, BookmarkSyncState, Chapter, ChapterId, DetailedBook, LibraryId, MediaProgress,
    PlaybackProgress, RecentBook, Timestamp,
};
use shelfcast_database::{connect, run_migrations, BookmarkRepository, CacheContext, CachedBookStore, DatabaseConfig};
use shelfcast_resilience::RetryPolicy;
use shelfcast_sync_engine::{
    recent_books, sync_from_local_progress, BookmarkSynchronizer, ChannelError, ChannelResult,
    CreateBookmarkRequest, DeviceId, MediaChannel, PlaybackClock, PlaybackSession, ProgressSynchronizer,
    SyncOutcome, SyncSettings,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// In-memory server with switchable failures
#[derive(Default)]
struct FakeChannel {
    offline: Mutex<bool>,
    bookmarks: Mutex<Vec<Bookmark>>,
    sessions_opened: Mutex<Vec<(BookId, ChapterId)>>,
    pushed: Mutex<Vec<(String, f64)>>,
    forget_next_session: Mutex<bool>,
    progress: Mutex<HashMap<BookId, MediaProgress>>,
    progress_unavailable: Mutex<bool>,
    recent: Mutex<Vec<RecentBook>>,
}

impl FakeChannel {
    fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    fn check_online(&self) -> ChannelResult<()> {
        if *self.offline.lock().unwrap() {
            Err(ChannelError::Network("server unreachable".to_string()))
        } else {
            Ok(())
        }
    }

    fn remote_bookmarks(&self) -> Vec<Bookmark> {
        self.bookmarks.lock().unwrap().clone()
    }

    fn sessions(&self) -> Vec<(BookId, ChapterId)> {
        self.sessions_opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaChannel for FakeChannel {
    async fn fetch_bookmarks(&self, item_id: &BookId) -> ChannelResult<Vec<Bookmark>> {
        self.check_online()?;
        Ok(self
            .remote_bookmarks()
            .into_iter()
            .filter(|b| &b.library_item_id == item_id)
            .collect())
    }

    async fn create_bookmark(&self, request: CreateBookmarkRequest) -> ChannelResult<Bookmark> {
        self.check_online()?;
        let bookmark = Bookmark {
            library_item_id: request.library_item_id,
            title: request.title,
            total_position: request.time as f64,
            created_at: Timestamp::now(),
            sync_state: BookmarkSyncState::Synced,
        };
        self.bookmarks.lock().unwrap().push(bookmark.clone());
        Ok(bookmark)
    }

    async fn drop_bookmark(&self, bookmark: &Bookmark) -> ChannelResult<()> {
        self.check_online()?;
        // The server addresses bookmarks by whole-second time
        self.bookmarks.lock().unwrap().retain(|b| {
            b.library_item_id != bookmark.library_item_id
                || b.total_position as i64 != bookmark.total_position as i64
        });
        Ok(())
    }

    async fn start_playback(
        &self,
        item_id: &BookId,
        _device_id: &DeviceId,
        chapter_id: &ChapterId,
    ) -> ChannelResult<PlaybackSession> {
        self.check_online()?;
        let mut sessions = self.sessions_opened.lock().unwrap();
        sessions.push((item_id.clone(), chapter_id.clone()));
        Ok(PlaybackSession::new(format!("session-{}", sessions.len()), item_id.clone()))
    }

    async fn sync_progress(&self, session_id: &str, _item_id: &BookId, progress: &PlaybackProgress) -> ChannelResult<()> {
        self.check_online()?;
        let mut forget = self.forget_next_session.lock().unwrap();
        if *forget {
            *forget = false;
            return Err(ChannelError::NotFound(session_id.to_string()));
        }
        self.pushed
            .lock()
            .unwrap()
            .push((session_id.to_string(), progress.current_total_time));
        Ok(())
    }

    async fn fetch_progress(&self, item_ids: &[BookId]) -> ChannelResult<HashMap<BookId, MediaProgress>> {
        self.check_online()?;
        if *self.progress_unavailable.lock().unwrap() {
            return Err(ChannelError::InternalError("progress lookup failed".to_string()));
        }
        let progress = self.progress.lock().unwrap();
        Ok(item_ids
            .iter()
            .filter_map(|id| progress.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }

    async fn fetch_recent_books(&self, _library_id: &LibraryId) -> ChannelResult<Vec<RecentBook>> {
        self.check_online()?;
        Ok(self.recent.lock().unwrap().clone())
    }
}

struct Fixture {
    _dir: TempDir,
    channel: Arc<FakeChannel>,
    store: Arc<CachedBookStore>,
    repository: BookmarkRepository,
}

fn settings() -> SyncSettings {
    SyncSettings {
        long_interval: Duration::from_millis(20),
        short_interval: Duration::from_millis(10),
        request_timeout: Duration::from_secs(2),
        retry: RetryPolicy::new(2).with_initial_delay(Duration::from_millis(1)),
    }
}

async fn fixture() -> Fixture {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sync.db");
    let pool = connect(DatabaseConfig::new(path.to_string_lossy().to_string()))
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();

    Fixture {
        _dir: dir,
        channel: Arc::new(FakeChannel::default()),
        store: Arc::new(CachedBookStore::new(pool.clone(), CacheContext::default())),
        repository: BookmarkRepository::new(pool),
    }
}

impl Fixture {
    fn bookmarks(&self) -> BookmarkSynchronizer {
        BookmarkSynchronizer::new(self.channel.clone(), self.repository.clone(), settings())
    }

    fn progress(&self) -> ProgressSynchronizer {
        ProgressSynchronizer::new(
            self.channel.clone(),
            Arc::clone(&self.store),
            DeviceId::from_string("test-device".to_string()),
            settings(),
        )
    }
}

fn book(id: &str, durations: &[f64]) -> DetailedBook {
    let mut book = DetailedBook::new(id, format!("Book {}", id));
    let mut start = 0.0;
    for (i, duration) in durations.iter().enumerate() {
        book.chapters
            .push(Chapter::new(format!("{}_c{}", id, i).as_str(), format!("Chapter {}", i + 1), start, *duration));
        start += duration;
    }
    book
}

fn remote_bookmark(item: &str, title: &str, position: f64) -> Bookmark {
    Bookmark {
        library_item_id: BookId::new(item),
        title: title.to_string(),
        total_position: position,
        created_at: Timestamp::from_millis(1_000),
        sync_state: BookmarkSyncState::Synced,
    }
}

// Bookmarks

#[tokio::test]
async fn test_create_bookmark_online_is_synced() {
    let f = fixture().await;
    let sync = f.bookmarks();
    let item = BookId::new("li_1");

    let created = sync.create_bookmark(245.9, 845.9, &item, "Chapter 3").await.unwrap();

    assert_eq!(created.sync_state, BookmarkSyncState::Synced);
    assert_eq!(created.title, "Chapter 3 - 04:05");
    assert_eq!(created.total_position, 845.0);
    assert_eq!(f.channel.remote_bookmarks().len(), 1);

    let local = f.repository.fetch_bookmarks(&item).await.unwrap();
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].sync_state, BookmarkSyncState::Synced);
}

#[tokio::test]
async fn test_offline_bookmark_is_pushed_on_next_fetch() {
    let f = fixture().await;
    let sync = f.bookmarks();
    let item = BookId::new("li_1");

    f.channel.set_offline(true);
    let draft = sync.create_bookmark(10.0, 70.0, &item, "Intro").await.unwrap();
    assert_eq!(draft.sync_state, BookmarkSyncState::PendingCreate);
    assert!(f.channel.remote_bookmarks().is_empty());

    let offline_view = sync.fetch_bookmarks(&item).await.unwrap();
    assert_eq!(offline_view.len(), 1);
    assert_eq!(offline_view[0].sync_state, BookmarkSyncState::PendingCreate);

    f.channel.set_offline(false);
    let view = sync.fetch_bookmarks(&item).await.unwrap();
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].sync_state, BookmarkSyncState::Synced);
    assert_eq!(f.channel.remote_bookmarks().len(), 1);
}

#[tokio::test]
async fn test_offline_drop_is_hidden_then_confirmed() {
    let f = fixture().await;
    let sync = f.bookmarks();
    let item = BookId::new("li_1");
    let created = sync.create_bookmark(5.0, 5.0, &item, "Intro").await.unwrap();

    f.channel.set_offline(true);
    sync.drop_bookmark(&created).await.unwrap();

    assert!(sync.provide_bookmarks(&item).await.unwrap().is_empty());
    let stored = f.repository.fetch_bookmarks(&item).await.unwrap();
    assert_eq!(stored[0].sync_state, BookmarkSyncState::PendingDelete);
    assert_eq!(f.channel.remote_bookmarks().len(), 1);

    f.channel.set_offline(false);
    assert!(sync.fetch_bookmarks(&item).await.unwrap().is_empty());
    assert!(f.channel.remote_bookmarks().is_empty());
    assert!(f.repository.fetch_bookmarks(&item).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_mirrors_server_list() {
    let f = fixture().await;
    let sync = f.bookmarks();
    let item = BookId::new("li_1");

    // Known locally but deleted on another device
    f.repository
        .upsert_bookmark(&remote_bookmark("li_1", "Gone", 30.0))
        .await
        .unwrap();
    f.channel
        .bookmarks
        .lock()
        .unwrap()
        .push(remote_bookmark("li_1", "New elsewhere", 90.0));

    let view = sync.fetch_bookmarks(&item).await.unwrap();
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].title, "New elsewhere");
    assert_eq!(view[0].sync_state, BookmarkSyncState::Synced);
}

#[tokio::test]
async fn test_fractional_server_bookmark_survives_fetch() {
    let f = fixture().await;
    let sync = f.bookmarks();
    let item = BookId::new("li_1");
    f.channel
        .bookmarks
        .lock()
        .unwrap()
        .push(remote_bookmark("li_1", "Server side", 42.5));

    let first = sync.fetch_bookmarks(&item).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].title, "Server side");
    assert_eq!(first[0].total_position, 42.0);

    // A second round must not treat the stored copy as deleted on the server
    let second = sync.fetch_bookmarks(&item).await.unwrap();
    assert_eq!(second.len(), 1);
    let stored = f.repository.fetch_bookmarks(&item).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].sync_state, BookmarkSyncState::Synced);

    sync.drop_bookmark(&second[0]).await.unwrap();
    assert!(f.channel.remote_bookmarks().is_empty());
    assert!(sync.fetch_bookmarks(&item).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_pull_keeps_local_view() {
    let f = fixture().await;
    let sync = f.bookmarks();
    let item = BookId::new("li_1");
    f.repository
        .upsert_bookmark(&remote_bookmark("li_1", "Kept", 30.0))
        .await
        .unwrap();

    f.channel.set_offline(true);
    let view = sync.fetch_bookmarks(&item).await.unwrap();
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].title, "Kept");
}

#[tokio::test]
async fn test_provide_orders_newest_first() {
    let f = fixture().await;
    let sync = f.bookmarks();
    let item = BookId::new("li_1");

    let mut older = remote_bookmark("li_1", "Older", 10.0);
    older.created_at = Timestamp::from_millis(1_000);
    let mut newer = remote_bookmark("li_1", "Newer", 20.0);
    newer.created_at = Timestamp::from_millis(2_000);
    f.repository.upsert_bookmark(&older).await.unwrap();
    f.repository.upsert_bookmark(&newer).await.unwrap();

    let titles: Vec<_> = sync
        .provide_bookmarks(&item)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.title)
        .collect();
    assert_eq!(titles, vec!["Newer", "Older"]);
}

// Progress

#[tokio::test]
async fn test_sync_without_item_is_idle() {
    let f = fixture().await;
    let sync = f.progress();
    let outcome = sync.sync(PlaybackProgress::new(10.0, 10.0)).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Idle);
    assert!(f.channel.sessions().is_empty());
}

#[tokio::test]
async fn test_sync_opens_session_and_mirrors_progress() {
    let f = fixture().await;
    let item = book("li_1", &[60.0, 60.0, 60.0]);
    f.store.upsert_cached_book(&item, &[], &[]).await.unwrap();

    let sync = f.progress();
    sync.start(item.clone()).await;

    let outcome = sync.sync(PlaybackProgress::new(75.0, 15.0)).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Synced);
    assert_eq!(f.channel.sessions(), vec![(BookId::new("li_1"), ChapterId::new("li_1_c1"))]);

    let cached = f.store.fetch_media_progress(&item.id).await.unwrap().unwrap();
    assert_eq!(cached.current_time, 75.0);
    assert!(!cached.is_finished);

    // Same chapter reuses the session
    sync.sync(PlaybackProgress::new(80.0, 20.0)).await.unwrap();
    assert_eq!(f.channel.sessions().len(), 1);
}

#[tokio::test]
async fn test_chapter_change_reopens_session() {
    let f = fixture().await;
    let sync = f.progress();
    sync.start(book("li_1", &[60.0, 60.0])).await;

    sync.sync(PlaybackProgress::new(10.0, 10.0)).await.unwrap();
    sync.sync(PlaybackProgress::new(70.0, 10.0)).await.unwrap();

    let chapters: Vec<_> = f.channel.sessions().into_iter().map(|(_, c)| c).collect();
    assert_eq!(chapters, vec![ChapterId::new("li_1_c0"), ChapterId::new("li_1_c1")]);
}

#[tokio::test]
async fn test_new_item_reopens_session() {
    let f = fixture().await;
    let sync = f.progress();

    sync.start(book("li_1", &[60.0])).await;
    sync.sync(PlaybackProgress::new(10.0, 10.0)).await.unwrap();
    sync.start(book("li_2", &[60.0])).await;
    sync.sync(PlaybackProgress::new(10.0, 10.0)).await.unwrap();

    let items: Vec<_> = f.channel.sessions().into_iter().map(|(i, _)| i).collect();
    assert_eq!(items, vec![BookId::new("li_1"), BookId::new("li_2")]);
}

#[tokio::test]
async fn test_expired_session_is_reopened() {
    let f = fixture().await;
    let sync = f.progress();
    sync.start(book("li_1", &[60.0])).await;
    sync.sync(PlaybackProgress::new(10.0, 10.0)).await.unwrap();

    *f.channel.forget_next_session.lock().unwrap() = true;
    let outcome = sync.sync(PlaybackProgress::new(20.0, 20.0)).await.unwrap();
    assert_eq!(outcome, SyncOutcome::SessionReopened);
    assert_eq!(f.channel.sessions().len(), 2);

    assert_eq!(sync.sync(PlaybackProgress::new(30.0, 30.0)).await.unwrap(), SyncOutcome::Synced);
    let last = f.channel.pushed.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last, ("session-2".to_string(), 30.0));
}

#[tokio::test]
async fn test_offline_progress_is_kept_locally() {
    let f = fixture().await;
    let item = book("li_1", &[60.0, 60.0]);
    f.store.upsert_cached_book(&item, &[], &[]).await.unwrap();
    let sync = f.progress();
    sync.start(item.clone()).await;

    f.channel.set_offline(true);
    let outcome = sync.sync(PlaybackProgress::new(120.0, 60.0)).await.unwrap();
    assert_eq!(outcome, SyncOutcome::LocalOnly);

    let cached = f.store.fetch_media_progress(&item.id).await.unwrap().unwrap();
    assert!(cached.is_finished);

    // A session is opened once the server is back
    f.channel.set_offline(false);
    sync.sync(PlaybackProgress::new(120.0, 60.0)).await.unwrap();
    assert_eq!(f.channel.sessions().len(), 1);
}

#[tokio::test]
async fn test_book_without_chapters_is_idle() {
    let f = fixture().await;
    let sync = f.progress();
    sync.start(book("li_1", &[])).await;
    assert_eq!(sync.sync(PlaybackProgress::new(0.0, 0.0)).await.unwrap(), SyncOutcome::Idle);
}

/// Plays for a fixed number of position reads, then pauses
struct CountingClock {
    reads: AtomicUsize,
    stop_after: usize,
}

impl PlaybackClock for CountingClock {
    fn progress(&self) -> PlaybackProgress {
        let read = self.reads.fetch_add(1, Ordering::SeqCst);
        PlaybackProgress::new(read as f64, read as f64)
    }

    fn duration(&self) -> Duration {
        Duration::from_secs(3600)
    }

    fn position(&self) -> Duration {
        Duration::from_secs(1800)
    }

    fn is_playing(&self) -> bool {
        self.reads.load(Ordering::SeqCst) < self.stop_after
    }
}

#[tokio::test]
async fn test_run_syncs_until_playback_stops() {
    let f = fixture().await;
    let sync = f.progress();
    sync.start(book("li_1", &[600.0])).await;

    let clock = CountingClock {
        reads: AtomicUsize::new(0),
        stop_after: 4,
    };
    tokio::time::timeout(Duration::from_secs(5), sync.run(&clock))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(clock.reads.load(Ordering::SeqCst), 4);
    assert_eq!(f.channel.pushed.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn test_cancel_stops_running_loop() {
    let f = fixture().await;
    let sync = Arc::new(f.progress());
    sync.start(book("li_1", &[600.0])).await;

    let clock = Arc::new(CountingClock {
        reads: AtomicUsize::new(0),
        stop_after: usize::MAX,
    });

    let handle = {
        let sync = Arc::clone(&sync);
        let clock = Arc::clone(&clock);
        tokio::spawn(async move { sync.run(clock.as_ref()).await })
    };

    tokio::time::sleep(Duration::from_millis(60)).await;
    sync.cancel();

    let finished = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(finished.is_ok());
    assert!(clock.reads.load(Ordering::SeqCst) >= 1);
}

// Conflict resolution

#[tokio::test]
async fn test_local_progress_overlays_remote_book() {
    let f = fixture().await;
    let mut local_book = book("li_1", &[600.0]);
    local_book.progress = Some(MediaProgress {
        current_time: 300.0,
        is_finished: false,
        last_update: Timestamp::from_millis(5_000),
    });
    f.store.upsert_cached_book(&local_book, &[], &[]).await.unwrap();

    let mut remote_book = book("li_1", &[600.0]);
    remote_book.progress = Some(MediaProgress {
        current_time: 100.0,
        is_finished: false,
        last_update: Timestamp::from_millis(1_000),
    });

    let merged = sync_from_local_progress(&f.store, remote_book).await.unwrap();
    assert_eq!(merged.progress.unwrap().current_time, 300.0);

    let unknown = sync_from_local_progress(&f.store, book("li_9", &[60.0])).await.unwrap();
    assert!(unknown.progress.is_none());
}

fn recent(id: &str, percentage: u8, updated: i64) -> RecentBook {
    RecentBook {
        id: BookId::new(id),
        title: format!("Book {}", id),
        author: None,
        listened_last_update: Some(Timestamp::from_millis(updated)),
        listened_percentage: Some(percentage),
    }
}

#[tokio::test]
async fn test_recent_books_prefer_newer_local_progress() {
    let f = fixture().await;
    let mut cached = book("li_1", &[400.0]);
    cached.progress = Some(MediaProgress {
        current_time: 200.0,
        is_finished: false,
        last_update: Timestamp::from_millis(9_000),
    });
    f.store.upsert_cached_book(&cached, &[], &[]).await.unwrap();

    *f.channel.recent.lock().unwrap() = vec![recent("li_1", 10, 1_000), recent("li_2", 70, 2_000)];
    f.channel.progress.lock().unwrap().insert(
        BookId::new("li_1"),
        MediaProgress {
            current_time: 40.0,
            is_finished: false,
            last_update: Timestamp::from_millis(1_000),
        },
    );

    let library = LibraryId::new("lib_1");
    let books = recent_books(f.channel.as_ref(), &f.store, &library, &settings()).await.unwrap();

    assert_eq!(books.len(), 2);
    assert_eq!(books[0].listened_percentage, Some(50));
    assert_eq!(books[0].listened_last_update, Some(Timestamp::from_millis(9_000)));
    assert_eq!(books[1].listened_percentage, Some(70));
}

#[tokio::test]
async fn test_recent_books_survive_progress_failure() {
    let f = fixture().await;
    *f.channel.recent.lock().unwrap() = vec![recent("li_2", 70, 2_000)];
    *f.channel.progress_unavailable.lock().unwrap() = true;

    let library = LibraryId::new("lib_1");
    let books = recent_books(f.channel.as_ref(), &f.store, &library, &settings()).await.unwrap();
    assert_eq!(books, vec![recent("li_2", 70, 2_000)]);
}

#[tokio::test]
async fn test_recent_books_fall_back_to_cache_offline() {
    let f = fixture().await;
    let mut cached = book("li_1", &[400.0]);
    cached.progress = Some(MediaProgress::new(100.0, false));
    f.store.upsert_cached_book(&cached, &[], &[]).await.unwrap();

    f.channel.set_offline(true);
    let library = LibraryId::new("lib_1");
    let books = recent_books(f.channel.as_ref(), &f.store, &library, &settings()).await.unwrap();

    assert_eq!(books.len(), 1);
    assert_eq!(books[0].id, BookId::new("li_1"));
}
