use std::path::PathBuf;

use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use snafu::ResultExt as _;

use crate::assets::AssetConfig;
use crate::database::DatabaseConfig;
use crate::error::{ApplicationError, ConfigLoadSnafu};
use crate::service::{DEFAULT_COMMENT_LIMIT, DEFAULT_FEED_LIMIT};

/// Everything the binary reads from the environment.
// flattened structs hand every value over as a string, hence `DisplayFromStr` on the numbers
#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(flatten)]
    pub database: DatabaseConfig,
    #[serde(flatten)]
    pub assets: AssetConfig,

    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_feed_limit")]
    pub feed_limit: usize,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_comment_limit")]
    pub comment_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Config, ApplicationError> {
        envy::from_env::<Config>().context(ConfigLoadSnafu)
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_feed_limit() -> usize {
    DEFAULT_FEED_LIMIT
}

fn default_comment_limit() -> usize {
    DEFAULT_COMMENT_LIMIT
}
