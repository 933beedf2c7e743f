use serde::{Deserialize, Serialize};
use snafu::{ensure, Location, Snafu};
use url::Url;

/// Storage buckets holding the binary assets referenced by videos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Videos,
    Thumbnails,
}

impl Bucket {
    pub fn id(self) -> &'static str {
        match self {
            Bucket::Videos => "videos",
            Bucket::Thumbnails => "thumbnails",
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AssetError {
    #[snafu(display("asset endpoint `{url}` cannot hold a path"))]
    NotABase {
        url: Url,
        #[snafu(implicit)]
        location: Location,
    },
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssetConfig {
    #[serde(rename = "asset_endpoint")]
    pub endpoint: Url,
    #[serde(rename = "asset_project")]
    pub project: String,
}

/// Builds fetchable URLs for stored assets.
///
/// `view` points at the original file and `preview` at the storage service's rendered preview,
/// both shaped as `{endpoint}/storage/buckets/{bucket}/files/{asset}/{view|preview}?project={project}`.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    endpoint: Url,
    project: String,
}

impl AssetResolver {
    pub fn new(endpoint: Url, project: impl Into<String>) -> Result<Self, AssetError> {
        ensure!(
            !endpoint.cannot_be_a_base(),
            NotABaseSnafu { url: endpoint }
        );

        Ok(Self {
            endpoint,
            project: project.into(),
        })
    }

    pub fn from_config(config: &AssetConfig) -> Result<Self, AssetError> {
        Self::new(config.endpoint.clone(), config.project.clone())
    }

    pub fn view(&self, bucket: Bucket, asset_id: &str) -> Result<Url, AssetError> {
        self.file_url(bucket, asset_id, "view")
    }

    pub fn preview(&self, bucket: Bucket, asset_id: &str) -> Result<Url, AssetError> {
        self.file_url(bucket, asset_id, "preview")
    }

    fn file_url(&self, bucket: Bucket, asset_id: &str, rendition: &str) -> Result<Url, AssetError> {
        let mut url = self.endpoint.clone();
        url.set_query(None);

        {
            let Ok(mut segments) = url.path_segments_mut() else {
                return NotABaseSnafu {
                    url: self.endpoint.clone(),
                }
                .fail();
            };

            segments.pop_if_empty().extend([
                "storage",
                "buckets",
                bucket.id(),
                "files",
                asset_id,
                rendition,
            ]);
        }

        url.query_pairs_mut().append_pair("project", &self.project);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(endpoint: &str) -> AssetResolver {
        AssetResolver::new(Url::parse(endpoint).unwrap(), "67a24702").unwrap()
    }

    #[test]
    fn view_url_points_at_the_original_file() {
        let url = resolver("https://cloud.example.io/v1")
            .view(Bucket::Videos, "clip-1")
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://cloud.example.io/v1/storage/buckets/videos/files/clip-1/view?project=67a24702"
        );
    }

    #[test]
    fn preview_url_ignores_a_trailing_slash() {
        let url = resolver("https://cloud.example.io/v1/")
            .preview(Bucket::Thumbnails, "thumb-1")
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://cloud.example.io/v1/storage/buckets/thumbnails/files/thumb-1/preview?project=67a24702"
        );
    }

    #[test]
    fn asset_ids_are_escaped_as_a_single_segment() {
        let url = resolver("https://cloud.example.io/v1")
            .view(Bucket::Videos, "../admin?x=1")
            .unwrap();

        assert_eq!(
            url.path(),
            "/v1/storage/buckets/videos/files/..%2Fadmin%3Fx=1/view"
        );
    }

    #[test]
    fn rejects_endpoints_without_a_path() {
        let endpoint = Url::parse("mailto:storage@example.io").unwrap();
        assert!(AssetResolver::new(endpoint, "project").is_err());
    }
}
