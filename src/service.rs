pub use comments::{CommentController, CommentsState, DEFAULT_COMMENT_LIMIT};
pub use error::{ErrorKind, ServiceError};
pub use feed::{FeedController, FeedState, DEFAULT_FEED_LIMIT};
pub use likes::{LikeController, LikeOutcome};
pub use state::{FetchOutcome, LoadState, Status};

pub(crate) use error::{StoreSnafu, UnauthenticatedSnafu};

mod comments;
mod error;
mod feed;
mod likes;
mod lock;
mod state;
