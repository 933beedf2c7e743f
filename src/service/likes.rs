use std::sync::Arc;

use snafu::ResultExt as _;
use tracing::instrument;

use super::lock::KeyedMutex;
use super::{FeedController, ServiceError, StoreSnafu, UnauthenticatedSnafu};
use crate::database::{DocumentStore, ListQuery, Record};
use crate::model::{Like, Video};
use crate::session::{Actor, SessionProvider};
use crate::Located as _;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeOutcome {
    /// The like was recorded. Holds the video with its updated counter.
    Liked(Video),
    /// The user had already liked the video; nothing was written.
    AlreadyLiked,
}

/// Records likes, at most one per user and video.
#[derive(Debug)]
pub struct LikeController<S, P> {
    store: S,
    session: P,
    feed: Option<Arc<FeedController<S>>>,
    in_progress: KeyedMutex<Record<Video>>,
}

impl<S: DocumentStore, P: SessionProvider> LikeController<S, P> {
    pub fn new(store: S, session: P) -> Self {
        Self {
            store,
            session,
            feed: None,
            in_progress: KeyedMutex::new(),
        }
    }

    /// Patches liked videos into `feed` instead of leaving it stale.
    pub fn with_feed(mut self, feed: Arc<FeedController<S>>) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Likes `video` on behalf of the signed-in user.
    ///
    /// The like record and the counter are only written when the user has not liked the video
    /// yet. The counter is incremented by the store itself, so concurrent likes from different
    /// users are all counted.
    #[instrument(skip(self))]
    pub async fn like_video(&self, video: &Record<Video>) -> Result<LikeOutcome, ServiceError> {
        let result = self.try_like(video).await;

        match &result {
            Ok(LikeOutcome::Liked(updated)) => {
                tracing::info!(likes = updated.likes, "liked video");
            }
            Ok(LikeOutcome::AlreadyLiked) => {
                tracing::debug!("video was already liked");
            }
            Err(error) => {
                tracing::warn!(%error, location = %error.location(), "could not like video");
            }
        }

        result
    }

    async fn try_like(&self, video: &Record<Video>) -> Result<LikeOutcome, ServiceError> {
        let actor = self
            .session
            .current_actor()
            .await
            .context(UnauthenticatedSnafu)?;

        let _in_progress = self.in_progress.lock(video.clone()).await;

        if self.find_like(&actor, video).await?.is_some() {
            return Ok(LikeOutcome::AlreadyLiked);
        }

        let like = Like::new(actor.id.clone(), video.clone());
        if let Err(error) = self.store.create(&like).await {
            // another writer got past the duplicate check first and the unique index refused ours
            if self.find_like(&actor, video).await?.is_some() {
                tracing::debug!(%error, "like was recorded concurrently");
                return Ok(LikeOutcome::AlreadyLiked);
            }
            return Err(error).context(StoreSnafu);
        }

        let updated: Video = match self.store.increment(video, "likes", 1).await {
            Ok(updated) => updated,
            Err(error) => {
                // the like must not outlive a counter that was never bumped
                if let Err(cleanup) = self.store.delete(&like.id).await {
                    tracing::error!(error = %cleanup, like = %like.id, "could not remove orphaned like");
                }
                return Err(error).context(StoreSnafu);
            }
        };

        if let Some(feed) = &self.feed {
            feed.apply(updated.clone());
        }

        Ok(LikeOutcome::Liked(updated))
    }

    /// Whether the signed-in user has liked `video`.
    #[instrument(skip(self))]
    pub async fn has_liked(&self, video: &Record<Video>) -> Result<bool, ServiceError> {
        let actor = self
            .session
            .current_actor()
            .await
            .context(UnauthenticatedSnafu)?;

        Ok(self.find_like(&actor, video).await?.is_some())
    }

    async fn find_like(
        &self, actor: &Actor, video: &Record<Video>,
    ) -> Result<Option<Like>, ServiceError> {
        let query = ListQuery::new()
            .filter("user_id", &actor.id)
            .filter("video_id", video)
            .limit(1);

        let page = self.store.list::<Like>(query).await.context(StoreSnafu)?;
        Ok(page.records.into_iter().next())
    }
}
