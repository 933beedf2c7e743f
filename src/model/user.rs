use derive_new::new;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::{now, Timestamp};
use crate::database::Record;
use crate::define_table;

/// A profile managed by the auth provider. Read-only here.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, new)]
pub struct User {
    #[new(default)]
    pub id: Record<User>,
    #[new(value = "now()")]
    pub created_at: Timestamp,

    pub username: String,
    pub name: String,
    #[new(default)]
    #[serde(default)]
    pub bio: Option<String>,
    #[new(default)]
    #[serde(default)]
    pub avatar_url: Option<String>,

    #[new(default)]
    #[serde(default)]
    pub followers_count: u64,
    #[new(default)]
    #[serde(default)]
    pub following_count: u64,
    #[new(default)]
    #[serde(default)]
    pub videos_count: u64,
}

define_table!("users" : User = id);
