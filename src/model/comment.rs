use derive_new::new;
use serde::{Deserialize, Serialize};

use super::{now, Timestamp, User, Video};
use crate::database::Record;
use crate::define_table;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, new)]
pub struct Comment {
    #[new(default)]
    pub id: Record<Comment>,
    #[new(value = "now()")]
    pub created_at: Timestamp,

    pub user_id: Record<User>,
    pub author: String,
    pub video_id: Record<Video>,
    /// Never blank, stored trimmed.
    pub text: String,
}

define_table!("comments" : Comment = id);
