//! Metadata provider boundary.
//!
//! The core only depends on the [`MetadataProvider`] trait; the HTTP
//! implementation below is the thin default. Providers map their own
//! failures to `AppError::MetadataFetch`, flagging timeouts and network
//! trouble as transient so callers can decide whether a retry makes sense.

use crate::database::MediaKind;
use crate::error::AppError;
use crate::resolver::ResolvedSource;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// What a provider knows about one episode and its owning channel.
#[derive(Debug, Clone, Default)]
pub struct EpisodeMetadata {
    pub title: String,
    pub description: Option<String>,
    pub duration: Option<f64>,
    pub thumbnail_url: Option<String>,
    pub upload_date: Option<String>,
    pub published_date: Option<String>,
    pub view_count: Option<i64>,
    pub channel_external_id: Option<String>,
    pub channel_name: Option<String>,
    pub channel_url: Option<String>,
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn fetch(&self, source: &ResolvedSource) -> Result<EpisodeMetadata, AppError>;
}

/// oEmbed response shape for video lookups.
#[derive(Debug, Deserialize)]
struct OEmbed {
    title: String,
    author_name: Option<String>,
    author_url: Option<String>,
    thumbnail_url: Option<String>,
}

pub struct HttpMetadataProvider {
    client: reqwest::Client,
}

impl HttpMetadataProvider {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::metadata(e.to_string(), false))?;
        Ok(Self { client })
    }

    fn map_request_error(e: reqwest::Error) -> AppError {
        // Timeouts and connection failures are worth retrying; anything the
        // server actually answered is not.
        let transient = e.is_timeout() || e.is_connect();
        AppError::metadata(e.to_string(), transient)
    }

    async fn fetch_video(&self, external_id: &str) -> Result<EpisodeMetadata, AppError> {
        let watch_url = format!("https://www.youtube.com/watch?v={external_id}");
        let oembed_url = format!("https://www.youtube.com/oembed?url={watch_url}&format=json");

        let resp = self
            .client
            .get(&oembed_url)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        let status = resp.status();
        if !status.is_success() {
            // 4xx means the provider reports the content gone or private.
            return Err(AppError::metadata(
                format!("provider returned {status} for {external_id}"),
                status.is_server_error(),
            ));
        }

        let body: OEmbed = resp.json().await.map_err(Self::map_request_error)?;
        Ok(EpisodeMetadata {
            title: body.title,
            thumbnail_url: body.thumbnail_url,
            channel_external_id: body.author_url.clone(),
            channel_name: body.author_name,
            channel_url: body.author_url,
            ..Default::default()
        })
    }

    /// A bare enclosure has no feed to consult; the URL is all we have.
    fn enclosure_metadata(url: &str) -> EpisodeMetadata {
        let name = url.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or(url);
        let title = name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name);
        EpisodeMetadata {
            title: title.to_string(),
            ..Default::default()
        }
    }

    async fn fetch_podcast(&self, source: &ResolvedSource) -> Result<EpisodeMetadata, AppError> {
        // Only feed references carry a channel hint. A direct audio URL
        // has nothing to fetch but the bytes themselves, so fall back to
        // URL-derived metadata instead of parsing audio as a feed.
        let feed_url = match source.channel_hint.as_deref() {
            Some(hint) => hint,
            None => return Ok(Self::enclosure_metadata(&source.external_id)),
        };

        let resp = self
            .client
            .get(feed_url)
            .send()
            .await
            .map_err(Self::map_request_error)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::metadata(
                format!("provider returned {status} for {feed_url}"),
                status.is_server_error(),
            ));
        }
        let bytes = resp.bytes().await.map_err(Self::map_request_error)?;

        let feed = feed_rs::parser::parse(bytes.as_ref())
            .map_err(|e| AppError::metadata(format!("feed parse failed: {e}"), false))?;

        let channel_name = feed.title.as_ref().map(|t| t.content.clone());
        let channel_thumb = feed.logo.as_ref().map(|l| l.uri.clone());

        // Prefer the entry whose enclosure matches the resolved id; fall
        // back to the newest entry when the source was the feed itself.
        let entry = feed
            .entries
            .iter()
            .find(|e| {
                e.media.iter().any(|m| {
                    m.content
                        .iter()
                        .any(|c| c.url.as_ref().map(|u| u.as_str()) == Some(source.external_id.as_str()))
                }) || e.links.iter().any(|l| l.href == source.external_id)
            })
            .or_else(|| feed.entries.first());

        let entry = entry.ok_or_else(|| AppError::metadata("feed has no entries", false))?;

        let duration = entry
            .media
            .iter()
            .flat_map(|m| m.duration)
            .next()
            .map(|d| d.as_secs_f64());

        Ok(EpisodeMetadata {
            title: entry
                .title
                .as_ref()
                .map(|t| t.content.clone())
                .or_else(|| channel_name.clone())
                .unwrap_or_else(|| source.external_id.clone()),
            description: entry.summary.as_ref().map(|s| s.content.clone()),
            duration,
            thumbnail_url: channel_thumb.clone(),
            published_date: entry.published.map(|d| d.to_rfc3339()),
            channel_external_id: Some(feed_url.to_string()),
            channel_name,
            channel_url: Some(feed_url.to_string()),
            ..Default::default()
        })
    }
}

#[async_trait]
impl MetadataProvider for HttpMetadataProvider {
    async fn fetch(&self, source: &ResolvedSource) -> Result<EpisodeMetadata, AppError> {
        match source.kind {
            MediaKind::Video => self.fetch_video(&source.external_id).await,
            MediaKind::Podcast => self.fetch_podcast(source).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver;

    #[tokio::test]
    async fn test_fetch_direct_audio_derives_title_from_filename() {
        let provider = HttpMetadataProvider::new(Duration::from_secs(1)).unwrap();
        let source = resolver::resolve("https://cdn.example.com/ep/042.mp3?sig=xyz").unwrap();
        let meta = provider.fetch(&source).await.unwrap();
        assert_eq!(meta.title, "042");
        assert!(meta.channel_external_id.is_none());
        assert!(meta.channel_name.is_none());
    }

    #[test]
    fn test_enclosure_metadata_keeps_extensionless_names() {
        let meta = HttpMetadataProvider::enclosure_metadata("https://cdn.example.com/ep/042.mp3");
        assert_eq!(meta.title, "042");
        let meta = HttpMetadataProvider::enclosure_metadata("https://cdn.example.com/raw/episode");
        assert_eq!(meta.title, "episode");
    }
}
