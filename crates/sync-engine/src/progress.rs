// crates/sync-engine/src/progress.rs
//! Periodic listening-progress synchronization
//!
//! While a book plays, its position is mirrored into the local cache and
//! pushed to the server through a playback session. A session is bound to
//! one item and one chapter; it is reopened whenever either changes or the
//! server forgets it.

use crate::channel::{guarded, MediaChannel, PlaybackSession};
use crate::error::SyncResult;
use crate::types::{DeviceId, SyncSettings};
use shelfcast_core::{resolve_chapter_index, DetailedBook, PlaybackProgress};
use shelfcast_database::CachedBookStore;
use shelfcast_resilience::RetryPolicy;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

/// Period until the next sync with the default intervals
pub fn next_interval(duration: Duration, position: Duration) -> Duration {
    SyncSettings::default().interval_for(duration, position)
}

/// Read access to the player driving the sync loop
pub trait PlaybackClock: Send + Sync {
    /// Current position in the book
    fn progress(&self) -> PlaybackProgress;

    /// Length of the media item being played
    fn duration(&self) -> Duration;

    /// Position inside the media item being played
    fn position(&self) -> Duration;

    /// False once playback is paused or has ended
    fn is_playing(&self) -> bool;
}

/// What a single [`ProgressSynchronizer::sync`] call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Another sync was in flight
    Skipped,
    /// No item has been started, or it has no chapters
    Idle,
    /// Progress reached the server
    Synced,
    /// The server had lost the session; a new one was opened
    SessionReopened,
    /// Progress was only stored on the device
    LocalOnly,
}

#[derive(Debug, Default)]
struct SessionState {
    item: Option<DetailedBook>,
    chapter_index: Option<usize>,
    session: Option<PlaybackSession>,
}

/// Pushes listening progress of the playing item
pub struct ProgressSynchronizer {
    channel: Arc<dyn MediaChannel>,
    store: Arc<CachedBookStore>,
    device_id: DeviceId,
    settings: SyncSettings,
    state: Mutex<SessionState>,
    generation: AtomicU64,
    cancelled: Notify,
    looping: AtomicBool,
}

impl ProgressSynchronizer {
    pub fn new(
        channel: Arc<dyn MediaChannel>,
        store: Arc<CachedBookStore>,
        device_id: DeviceId,
        settings: SyncSettings,
    ) -> Self {
        Self {
            channel,
            store,
            device_id,
            settings,
            state: Mutex::new(SessionState::default()),
            generation: AtomicU64::new(0),
            cancelled: Notify::new(),
            looping: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Switches to a new item and stops any running loop
    ///
    /// The session of the previous item is replaced on the next sync.
    pub async fn start(&self, item: DetailedBook) {
        self.cancel();
        log::debug!("Synchronizing progress of {}", item.id);
        self.state.lock().await.item = Some(item);
    }

    /// Stops the running loop, if any
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cancelled.notify_waiters();
    }

    /// Mirrors and pushes one progress snapshot
    pub async fn sync(&self, progress: PlaybackProgress) -> SyncResult<SyncOutcome> {
        let Ok(mut state) = self.state.try_lock() else {
            log::debug!("Progress sync already running, skipping");
            return Ok(SyncOutcome::Skipped);
        };

        let Some(item) = state.item.clone() else {
            return Ok(SyncOutcome::Idle);
        };
        let Some(chapter_index) = resolve_chapter_index(&item.chapters, progress.current_total_time) else {
            return Ok(SyncOutcome::Idle);
        };

        if let Err(e) = self.store.sync_progress(&item.id, &progress).await {
            log::warn!("Unable to cache progress of {}: {}", item.id, e);
        }

        let stale = match &state.session {
            None => true,
            Some(session) => session.item_id != item.id || state.chapter_index != Some(chapter_index),
        };
        if stale {
            state.session = self.open_session(&item, chapter_index).await;
            state.chapter_index = Some(chapter_index);
        }

        let Some(session) = state.session.clone() else {
            return Ok(SyncOutcome::LocalOnly);
        };

        let pushed = guarded(self.settings.request_timeout, &RetryPolicy::none(), || {
            self.channel.sync_progress(&session.session_id, &item.id, &progress)
        })
        .await;

        match pushed {
            Ok(()) => Ok(SyncOutcome::Synced),
            Err(e) if e.is_not_found() => {
                log::info!("Session {} expired, opening a new one", session.session_id);
                state.session = self.open_session(&item, chapter_index).await;
                Ok(SyncOutcome::SessionReopened)
            }
            Err(e) => {
                log::warn!("Unable to push progress of {}: {}", item.id, e);
                Ok(SyncOutcome::LocalOnly)
            }
        }
    }

    /// Syncs on the clock's schedule until playback stops or the loop is cancelled
    ///
    /// Only one loop runs at a time; a second call syncs once and returns.
    pub async fn run(&self, clock: &dyn PlaybackClock) -> SyncResult<()> {
        let generation = self.generation.load(Ordering::SeqCst);
        self.sync(clock.progress()).await?;

        if self.looping.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let _looping = LoopGuard(&self.looping);

        while clock.is_playing() {
            let interval = self.settings.interval_for(clock.duration(), clock.position());

            let cancelled = self.cancelled.notified();
            tokio::pin!(cancelled);
            cancelled.as_mut().enable();

            if self.generation.load(Ordering::SeqCst) != generation {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = &mut cancelled => break,
            }

            self.sync(clock.progress()).await?;
        }

        Ok(())
    }

    async fn open_session(&self, item: &DetailedBook, chapter_index: usize) -> Option<PlaybackSession> {
        let chapter = item.chapters.get(chapter_index)?;

        let opened = guarded(self.settings.request_timeout, &RetryPolicy::none(), || {
            self.channel.start_playback(&item.id, &self.device_id, &chapter.id)
        })
        .await;

        match opened {
            Ok(session) => Some(session),
            Err(e) => {
                log::warn!("Unable to open a playback session for {}: {}", item.id, e);
                None
            }
        }
    }
}

struct LoopGuard<'a>(&'a AtomicBool);

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
