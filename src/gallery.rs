//! Photo gallery fed by a third-party image search API.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::config::GalleryConfig;
use crate::remote::RemoteError;

/// Alt text used when the photo has no description.
pub const FALLBACK_ALT: &str = "Space image";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageUrls {
    pub regular: String,
    pub small: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Photographer {
    pub name: String,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GalleryImage {
    pub id: String,
    pub urls: ImageUrls,
    #[serde(default)]
    pub alt_description: Option<String>,
    pub user: Photographer,
}

impl GalleryImage {
    #[must_use]
    pub fn alt_text(&self) -> &str {
        self.alt_description
            .as_deref()
            .filter(|alt| !alt.trim().is_empty())
            .unwrap_or(FALLBACK_ALT)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<GalleryImage>,
}

/// Source of gallery photos.
#[async_trait]
pub trait PhotoSource: Send + Sync + Debug {
    /// Fetch one page of results for `query`.
    async fn search(&self, query: &str, per_page: u32) -> Result<Vec<GalleryImage>, RemoteError>;
}

/// Search API client (`GET /search/photos`).
#[derive(Clone)]
pub struct UnsplashSource {
    http: reqwest::Client,
    base_url: Url,
    access_key: String,
}

impl Debug for UnsplashSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnsplashSource")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl UnsplashSource {
    pub fn new(config: &GalleryConfig, timeout: Duration) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_client(&config.base_url, &config.access_key, http)
    }

    pub fn with_client(
        base_url: &str,
        access_key: impl Into<String>,
        http: reqwest::Client,
    ) -> Result<Self, RemoteError> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            access_key: access_key.into(),
        })
    }
}

#[async_trait]
impl PhotoSource for UnsplashSource {
    async fn search(&self, query: &str, per_page: u32) -> Result<Vec<GalleryImage>, RemoteError> {
        let mut url = self.base_url.join("/search/photos")?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("per_page", &per_page.to_string())
            .append_pair("client_id", &self.access_key);

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.results)
    }
}

/// What the gallery section shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryState {
    /// Placeholder tiles until the fetch completes.
    Loading { tiles: u32 },
    Ready(Vec<GalleryImage>),
}

/// Fetch the gallery page, degrading to an empty grid on failure.
pub async fn load(source: &dyn PhotoSource, config: &GalleryConfig) -> GalleryState {
    match source.search(&config.query, config.per_page).await {
        Ok(images) => {
            tracing::debug!(count = images.len(), "Gallery images loaded");
            GalleryState::Ready(images)
        }
        Err(e) => {
            tracing::error!(name: "gallery.fetch.failed", error = %e, "Error fetching gallery images");
            GalleryState::Ready(Vec::new())
        }
    }
}
