use derive_new::new;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{now, Timestamp, User};
use crate::assets::{AssetError, AssetResolver, Bucket};
use crate::database::Record;
use crate::define_table;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, new)]
pub struct Video {
    #[new(default)]
    pub id: Record<Video>,
    #[new(value = "now()")]
    pub created_at: Timestamp,

    pub title: String,
    pub caption: String,
    pub author_id: Record<User>,
    /// Display name of the author when the video was published.
    pub author: String,
    pub video_file_id: String,
    pub thumbnail_file_id: String,

    #[new(default)]
    #[serde(default)]
    pub likes: u64,
    #[new(default)]
    #[serde(default)]
    pub comments: u64,
    #[new(default)]
    #[serde(default)]
    pub shares: u64,
}

define_table!("videos" : Video = id);

impl Video {
    pub fn video_url(&self, assets: &AssetResolver) -> Result<Url, AssetError> {
        assets.view(Bucket::Videos, &self.video_file_id)
    }

    pub fn thumbnail_url(&self, assets: &AssetResolver) -> Result<Url, AssetError> {
        assets.preview(Bucket::Thumbnails, &self.thumbnail_file_id)
    }
}
