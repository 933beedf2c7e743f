use std::time::Duration;

use dotenvy::dotenv;
use serde::Serialize;
use snafu::ResultExt as _;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use url::Url;

use reelfeed::assets::AssetResolver;
use reelfeed::config::Config;
use reelfeed::database::Database;
use reelfeed::error::{
    ApplicationError, ApplySchemaSnafu, AssetsSnafu, ConnectDatabaseSnafu, OutputSnafu,
};
use reelfeed::logger;
use reelfeed::model::{Comment, Video};
use reelfeed::service::{CommentController, FeedController, FetchOutcome};
use reelfeed::session::Session;

/// A video as printed, with its asset URLs resolved.
#[derive(Debug, Serialize)]
struct FeedEntry<'a> {
    #[serde(flatten)]
    video: &'a Video,
    video_url: Url,
    thumbnail_url: Url,
}

#[derive(Debug, Serialize)]
struct Output<'a> {
    videos: Vec<FeedEntry<'a>>,
    /// Comments of the video under the cursor.
    comments: Vec<Comment>,
}

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    dotenv().ok();

    let config = Config::from_env()?;

    let _guard = logger::init(&config)?;

    let assets = AssetResolver::from_config(&config.assets).context(AssetsSnafu)?;
    let database = connect(&config).await?;
    database.apply_schema().await.context(ApplySchemaSnafu)?;

    let feed = FeedController::with_limit(database.clone(), config.feed_limit);
    if let FetchOutcome::Failed(error) = feed.fetch_videos().await {
        tracing::warn!(%error, "printing an empty feed");
    }
    let state = feed.snapshot();

    let mut comments = Vec::new();
    if let Some(video) = state.current_video() {
        let controller =
            CommentController::new(database.clone(), Session::anonymous(), video.id.clone())
                .with_limit(config.comment_limit);
        controller.fetch_comments().await;
        comments = controller.snapshot().comments;
    }

    let mut videos = Vec::with_capacity(state.videos.len());
    for video in &state.videos {
        videos.push(FeedEntry {
            video,
            video_url: video.video_url(&assets).context(AssetsSnafu)?,
            thumbnail_url: video.thumbnail_url(&assets).context(AssetsSnafu)?,
        });
    }

    let output = Output { videos, comments };
    serde_json::to_writer_pretty(std::io::stdout().lock(), &output).context(OutputSnafu)?;
    println!();

    Ok(())
}

async fn connect(config: &Config) -> Result<Database, ApplicationError> {
    let strategy = ExponentialBackoff::from_millis(100)
        .factor(2)
        .max_delay(Duration::from_secs(5))
        .map(jitter)
        .take(5);

    Retry::start(strategy, move || async move {
        let result = Database::connect(&config.database).await;
        if let Err(error) = &result {
            tracing::warn!(%error, url = %config.database.url, "could not reach the document store");
        }
        result
    })
    .await
    .context(ConnectDatabaseSnafu)
}
