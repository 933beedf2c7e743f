use std::sync::Arc;

use snafu::ResultExt as _;
use tokio::sync::watch;
use tracing::instrument;

use super::state::{FetchOutcome, LoadGuard, LoadState, Loadable};
use super::{FeedController, ServiceError, StoreSnafu, UnauthenticatedSnafu};
use crate::database::{DocumentStore, ListQuery, Record};
use crate::model::{Comment, User, Video};
use crate::session::{Actor, SessionProvider};
use crate::Located as _;

pub const DEFAULT_COMMENT_LIMIT: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct CommentsState {
    /// Newest first.
    pub comments: Vec<Comment>,
    /// Text typed but not yet submitted.
    pub draft: String,
    pub load: LoadState,
}

impl Loadable for CommentsState {
    fn load_mut(&mut self) -> &mut LoadState {
        &mut self.load
    }
}

/// Lists and adds the comments of a single video.
#[derive(Debug)]
pub struct CommentController<S, P> {
    store: S,
    session: P,
    video: Record<Video>,
    limit: usize,
    feed: Option<Arc<FeedController<S>>>,
    state: watch::Sender<CommentsState>,
}

impl<S: DocumentStore, P: SessionProvider> CommentController<S, P> {
    pub fn new(store: S, session: P, video: Record<Video>) -> Self {
        let (state, _) = watch::channel(CommentsState::default());
        Self {
            store,
            session,
            video,
            limit: DEFAULT_COMMENT_LIMIT,
            feed: None,
            state,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Patches the commented video into `feed` after every new comment.
    pub fn with_feed(mut self, feed: Arc<FeedController<S>>) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn video(&self) -> &Record<Video> {
        &self.video
    }

    pub fn subscribe(&self) -> watch::Receiver<CommentsState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> CommentsState {
        self.state.borrow().clone()
    }

    #[instrument(skip(self), fields(video = %self.video, limit = self.limit))]
    pub async fn fetch_comments(&self) -> FetchOutcome {
        let guard = LoadGuard::begin(&self.state);

        let query = ListQuery::new()
            .filter("video_id", &self.video)
            .newest_first()
            .limit(self.limit);
        let result = self.store.list::<Comment>(query).await.context(StoreSnafu);

        match result {
            Ok(page) => {
                let count = page.records.len();
                if !guard.commit(|state| {
                    state.comments = page.records;
                    state.load.succeed();
                }) {
                    return FetchOutcome::Superseded;
                }

                tracing::debug!(count, total = page.total, "fetched comments");
                FetchOutcome::Committed { count }
            }
            Err(error) => {
                let error = Arc::new(error);
                tracing::error!(%error, location = %error.location(), "could not fetch comments");

                if !guard.commit(|state| state.load.fail(error.clone())) {
                    return FetchOutcome::Superseded;
                }

                FetchOutcome::Failed(error)
            }
        }
    }

    /// Posts `text` as the signed-in user.
    ///
    /// Blank text is ignored and yields `Ok(None)`. Otherwise the comment is stored trimmed, the
    /// video's comment counter goes up by one, the draft is cleared and the list is fetched again.
    #[instrument(skip(self, text), fields(video = %self.video))]
    pub async fn add_comment(&self, text: &str) -> Result<Option<Comment>, ServiceError> {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("ignoring blank comment");
            return Ok(None);
        }

        let comment = match self.post(text).await {
            Ok(comment) => comment,
            Err(error) => {
                tracing::warn!(%error, location = %error.location(), "could not add comment");
                return Err(error);
            }
        };

        tracing::info!(comment = %comment.id, "added comment");

        self.state.send_if_modified(|state| {
            let had_draft = !state.draft.is_empty();
            state.draft.clear();
            had_draft
        });
        self.fetch_comments().await;

        Ok(Some(comment))
    }

    async fn post(&self, text: &str) -> Result<Comment, ServiceError> {
        let actor = self
            .session
            .current_actor()
            .await
            .context(UnauthenticatedSnafu)?;
        let author = self.author_name(&actor).await?;

        let comment = Comment::new(actor.id, author, self.video.clone(), text.to_owned());
        let comment = self.store.create(&comment).await.context(StoreSnafu)?;

        let updated: Video = match self.store.increment(&self.video, "comments", 1).await {
            Ok(updated) => updated,
            Err(error) => {
                if let Err(cleanup) = self.store.delete(&comment.id).await {
                    tracing::error!(error = %cleanup, comment = %comment.id, "could not remove orphaned comment");
                }
                return Err(error).context(StoreSnafu);
            }
        };

        if let Some(feed) = &self.feed {
            feed.apply(updated);
        }

        Ok(comment)
    }

    /// The name shown next to the comment: the user's profile name, or the session's display name
    /// when there is no profile.
    async fn author_name(&self, actor: &Actor) -> Result<String, ServiceError> {
        match self.store.get::<User>(&actor.id).await {
            Ok(user) => Ok(user.name),
            Err(error) if error.is_not_found() => {
                tracing::debug!(user = %actor.id, "no profile, using session display name");
                Ok(actor.display_name.clone())
            }
            Err(error) => Err(error).context(StoreSnafu),
        }
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.send_if_modified(|state| {
            if state.draft == text {
                return false;
            }
            state.draft = text;
            true
        });
    }

    /// Posts the current draft. See [CommentController::add_comment].
    pub async fn submit_draft(&self) -> Result<Option<Comment>, ServiceError> {
        let draft = self.state.borrow().draft.clone();
        self.add_comment(&draft).await
    }
}
