use std::sync::Arc;

use snafu::ResultExt as _;
use tokio::sync::watch;
use tracing::instrument;

use super::state::{FetchOutcome, LoadGuard, LoadState, Loadable};
use super::StoreSnafu;
use crate::database::{DocumentStore, ListQuery, Record};
use crate::model::Video;
use crate::Located as _;

pub const DEFAULT_FEED_LIMIT: usize = 50;

/// A snapshot of the feed as the presentation layer sees it.
#[derive(Debug, Clone, Default)]
pub struct FeedState {
    /// Newest first.
    pub videos: Vec<Video>,
    /// Always `< videos.len()`; `None` while the feed is empty.
    pub current_index: Option<usize>,
    pub load: LoadState,
}

impl FeedState {
    pub fn current_video(&self) -> Option<&Video> {
        self.current_index.and_then(|index| self.videos.get(index))
    }

    fn clamp_cursor(&mut self) {
        self.current_index = match (self.current_index, self.videos.len()) {
            (_, 0) => None,
            (None, _) => Some(0),
            (Some(index), len) => Some(index.min(len - 1)),
        };
    }
}

impl Loadable for FeedState {
    fn load_mut(&mut self) -> &mut LoadState {
        &mut self.load
    }
}

/// Fetches the newest videos and tracks which one is on screen.
#[derive(Debug)]
pub struct FeedController<S> {
    store: S,
    limit: usize,
    state: watch::Sender<FeedState>,
}

impl<S: DocumentStore> FeedController<S> {
    pub fn new(store: S) -> Self {
        Self::with_limit(store, DEFAULT_FEED_LIMIT)
    }

    pub fn with_limit(store: S, limit: usize) -> Self {
        let (state, _) = watch::channel(FeedState::default());
        Self {
            store,
            limit,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> FeedState {
        self.state.borrow().clone()
    }

    /// Replaces the feed with the newest videos.
    ///
    /// A failure keeps the current videos and publishes the error instead. Only the most recently
    /// started fetch may publish its result.
    #[instrument(skip(self), fields(limit = self.limit))]
    pub async fn fetch_videos(&self) -> FetchOutcome {
        let guard = LoadGuard::begin(&self.state);

        let query = ListQuery::new().newest_first().limit(self.limit);
        let result = self.store.list::<Video>(query).await.context(StoreSnafu);

        match result {
            Ok(page) => {
                let count = page.records.len();
                let committed = guard.commit(|state| {
                    state.videos = page.records;
                    state.clamp_cursor();
                    state.load.succeed();
                });

                if !committed {
                    tracing::debug!("a newer fetch started, dropping {count} videos");
                    return FetchOutcome::Superseded;
                }

                tracing::info!(count, total = page.total, "fetched videos");
                FetchOutcome::Committed { count }
            }
            Err(error) => {
                let error = Arc::new(error);
                tracing::error!(%error, location = %error.location(), "could not fetch videos");

                if !guard.commit(|state| state.load.fail(error.clone())) {
                    return FetchOutcome::Superseded;
                }

                FetchOutcome::Failed(error)
            }
        }
    }

    /// Moves the cursor, clamped to the feed. Returns the new position.
    pub fn set_current_index(&self, index: usize) -> Option<usize> {
        let mut current = None;
        self.state.send_modify(|state| {
            state.current_index = Some(index);
            state.clamp_cursor();
            current = state.current_index;
        });
        current
    }

    pub fn current_video(&self) -> Option<Video> {
        self.state.borrow().current_video().cloned()
    }

    /// Replaces the copy of `video` held by the feed, if any. Returns whether it was found.
    pub fn apply(&self, video: Video) -> bool {
        self.state.send_if_modified(|state| {
            match state.videos.iter_mut().find(|held| held.id == video.id) {
                Some(held) => {
                    *held = video;
                    true
                }
                None => false,
            }
        })
    }

    pub fn contains(&self, id: &Record<Video>) -> bool {
        self.state.borrow().videos.iter().any(|video| &video.id == id)
    }
}
