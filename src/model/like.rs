use derive_new::new;
use serde::{Deserialize, Serialize};

use super::{now, Timestamp, User, Video};
use crate::database::Record;
use crate::define_table;

/// A user's like on a video. There is at most one per (user, video).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, new)]
pub struct Like {
    #[new(default)]
    pub id: Record<Like>,
    #[new(value = "now()")]
    pub created_at: Timestamp,

    pub user_id: Record<User>,
    pub video_id: Record<Video>,
}

define_table!("likes" : Like = id);
