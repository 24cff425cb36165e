//! Client for the WordPress REST API that feeds the front page.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::format::decode_entities;

/// Number of posts requested for the front page.
pub const BATCH_SIZE: usize = 25;

const BATCH_FIELDS: &str = "id,date,title,excerpt,link,featured_media,custom_fields.writer";
const STORY_FIELDS: &str = "id,date,title,content,link,featured_media,custom_fields.writer";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Parse(String),
    #[error("missing field: {0}")]
    MissingData(&'static str),
}

/// Media id of a post's featured image, resolved to a URL separately.
pub type ImageRef = Option<u64>;

#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub author_names: Vec<String>,
    /// Plain-text excerpt (front page) or full content (single story view)
    pub body_text: String,
    /// Raw rendered HTML of the body, kept for paragraph splitting
    pub body_html: String,
    pub image: ImageRef,
    pub published_at: Option<DateTime<Utc>>,
    pub permalink: String,
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Default, Deserialize)]
struct Rendered {
    #[serde(default, deserialize_with = "null_as_default")]
    rendered: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Writers {
    One(String),
    Many(Vec<String>),
    /// ACF sends `false` for an empty field
    Other(IgnoredAny),
}

#[derive(Debug, Default, Deserialize)]
struct CustomFields {
    #[serde(default)]
    writer: Option<Writers>,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    title: Rendered,
    #[serde(default)]
    excerpt: Option<Rendered>,
    #[serde(default)]
    content: Option<Rendered>,
    #[serde(default, deserialize_with = "null_as_default")]
    link: String,
    #[serde(default)]
    featured_media: Option<u64>,
    #[serde(default)]
    custom_fields: Option<CustomFields>,
}

#[derive(Debug, Deserialize)]
struct RawMedia {
    guid: Option<Rendered>,
}

impl From<RawPost> for Article {
    fn from(post: RawPost) -> Self {
        let body_html = post
            .content
            .filter(|c| !c.rendered.trim().is_empty())
            .or(post.excerpt)
            .map(|r| r.rendered)
            .unwrap_or_default();

        let author_names = match post.custom_fields.and_then(|f| f.writer) {
            Some(Writers::One(name)) => vec![name],
            Some(Writers::Many(names)) => names,
            Some(Writers::Other(_)) | None => Vec::new(),
        }
        .into_iter()
        .map(|name| decode_entities(name.trim()))
        .filter(|name| !name.is_empty())
        .collect();

        Article {
            id: post.id,
            title: decode_entities(&post.title.rendered).trim().to_string(),
            author_names,
            body_text: decode_entities(&body_html).trim().to_string(),
            body_html,
            image: post.featured_media.filter(|&id| id != 0),
            published_at: post.date.as_deref().and_then(parse_published),
            permalink: post.link,
        }
    }
}

/// WordPress `date` values carry no offset; they are read as UTC.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[derive(Clone)]
pub struct ContentClient {
    client: Client,
    api_base: String,
}

impl ContentClient {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("FrontPage/1.0 (Newspaper Reader)")
            .build()
            .expect("Failed to create HTTP client");

        let api_base = api_base.into().trim_end_matches('/').to_string();
        Self { client, api_base }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.api_base.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Fetch the latest posts, optionally restricted to one category.
    pub async fn fetch_batch(&self, section: Option<u64>) -> Result<Vec<Article>, FetchError> {
        let per_page = BATCH_SIZE.to_string();
        let mut query = vec![("per_page", per_page), ("_fields", BATCH_FIELDS.to_string())];
        if let Some(category) = section {
            query.push(("categories", category.to_string()));
        }

        info!("Fetching story batch (section: {:?})", section);
        let posts: Vec<serde_json::Value> = self
            .get_json(&format!("{}/posts", self.api_base), &query)
            .await?;

        // One malformed post only drops that post.
        let stories = posts
            .into_iter()
            .take(BATCH_SIZE)
            .filter_map(|value| match serde_json::from_value::<RawPost>(value) {
                Ok(post) => Some(Article::from(post)),
                Err(e) => {
                    warn!("Skipping malformed post: {}", e);
                    None
                }
            })
            .collect();
        Ok(stories)
    }

    pub async fn fetch_story(&self, id: u64) -> Result<Article, FetchError> {
        let query = [("_fields", STORY_FIELDS.to_string())];
        let post: RawPost = self
            .get_json(&format!("{}/posts/{}", self.api_base, id), &query)
            .await?;
        Ok(Article::from(post))
    }

    /// Look up the URL of a media item.
    pub async fn resolve_image(&self, media_id: u64) -> Result<String, FetchError> {
        let query = [("_fields", "guid".to_string())];
        let media: RawMedia = self
            .get_json(&format!("{}/media/{}", self.api_base, media_id), &query)
            .await?;

        media
            .guid
            .map(|g| g.rendered)
            .filter(|url| !url.is_empty())
            .ok_or(FetchError::MissingData("guid.rendered"))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;

        serde_json::from_slice(&bytes).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

/// Fetch a batch, degrading any failure to an empty list.
pub async fn load_batch(client: &ContentClient, section: Option<u64>) -> Vec<Article> {
    match client.fetch_batch(section).await {
        Ok(stories) => {
            info!("Fetched {} stories", stories.len());
            stories
        }
        Err(e) => {
            error!("Failed to fetch stories: {}", e);
            Vec::new()
        }
    }
}

/// Resolve an image, degrading any failure to an absent image.
pub async fn load_image(client: &ContentClient, media_id: u64) -> Option<String> {
    match client.resolve_image(media_id).await {
        Ok(url) => Some(url),
        Err(e) => {
            warn!("Failed to resolve image {}: {}", media_id, e);
            None
        }
    }
}

/// Fetch a single story along with its image for the single-story view.
///
/// Failures are logged and produce `None`; a missing image only drops the image.
pub async fn load_story(client: &ContentClient, id: u64) -> Option<(Article, Option<String>)> {
    let article = match client.fetch_story(id).await {
        Ok(article) => article,
        Err(e) => {
            error!("Failed to fetch story {}: {}", id, e);
            return None;
        }
    };

    let image = match article.image {
        Some(media_id) => load_image(client, media_id).await,
        None => None,
    };
    Some((article, image))
}
