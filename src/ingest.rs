//! Episode ingestion pipeline and channel metadata sync.
//!
//! `add_episode` runs the full path: resolve the URL, dedupe against the
//! user's collection, fetch metadata (time-bounded), then channel upsert +
//! order assignment + insert + audit event as one store transaction.

use crate::database::{AuthUser, ChannelSeed, Database, Episode, MediaKind, NewEpisode};
use crate::error::AppError;
use crate::metadata::{EpisodeMetadata, MetadataProvider};
use crate::resolver::{self, ResolvedSource};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct BatchItemResult {
    pub url: String,
    pub success: bool,
    pub episode_id: Option<i64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub channel_id: i64,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub synced: usize,
    pub total: usize,
    pub failures: Vec<SyncFailure>,
}

pub struct IngestService {
    db: Arc<Database>,
    provider: Arc<dyn MetadataProvider>,
    timeout: Duration,
}

impl IngestService {
    pub fn new(db: Arc<Database>, provider: Arc<dyn MetadataProvider>, timeout: Duration) -> Self {
        Self {
            db,
            provider,
            timeout,
        }
    }

    async fn fetch_metadata(&self, source: &ResolvedSource) -> Result<EpisodeMetadata, AppError> {
        match tokio::time::timeout(self.timeout, self.provider.fetch(source)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::metadata(
                format!("provider timed out after {:?}", self.timeout),
                true,
            )),
        }
    }

    /// Ingest one episode from a raw URL.
    ///
    /// Fails fast on unrecognized URLs and duplicates before any side
    /// effect; the duplicate error carries the existing row so callers can
    /// treat a re-add as a no-op.
    pub async fn add_episode(
        &self,
        url: &str,
        user: &AuthUser,
        tag_ids: &[String],
    ) -> Result<Episode, AppError> {
        let source = resolver::resolve(url)?;

        if let Some(existing) =
            self.db
                .find_by_external_id(&user.id, source.kind, &source.external_id)?
        {
            return Err(AppError::Duplicate(Box::new(existing)));
        }

        let metadata = self.fetch_metadata(&source).await?;

        let channel = metadata.channel_external_id.as_ref().map(|external_id| ChannelSeed {
            kind: source.kind,
            external_id: external_id.clone(),
            name: metadata
                .channel_name
                .clone()
                .unwrap_or_else(|| external_id.clone()),
            description: None,
            thumbnail_url: None,
            url: metadata.channel_url.clone(),
        });

        let new = NewEpisode {
            kind: source.kind,
            external_id: source.external_id.clone(),
            title: metadata.title,
            description: metadata.description,
            duration: metadata.duration,
            thumbnail_url: metadata.thumbnail_url,
            url: url.trim().to_string(),
            upload_date: metadata.upload_date,
            published_date: metadata.published_date,
            view_count: metadata.view_count,
            channel_id: None,
            user_id: user.id.clone(),
        };

        let episode = self.db.ingest_episode(new, channel)?;
        log::info!(
            "ingested {} episode {} for {}",
            episode.kind,
            episode.id,
            user.id
        );

        if !tag_ids.is_empty() {
            self.db.update_tags(episode.id, &user.id, tag_ids)?;
        }

        Ok(episode)
    }

    /// Per-item pipeline over many URLs; one bad item never aborts the rest.
    pub async fn add_episodes_batch(&self, urls: &[String], user: &AuthUser) -> Vec<BatchItemResult> {
        let mut results = Vec::with_capacity(urls.len());
        for url in urls {
            match self.add_episode(url, user, &[]).await {
                Ok(episode) => results.push(BatchItemResult {
                    url: url.clone(),
                    success: true,
                    episode_id: Some(episode.id),
                    error: None,
                }),
                Err(e) => {
                    log::warn!("batch item {} failed: {}", url, e);
                    results.push(BatchItemResult {
                        url: url.clone(),
                        success: false,
                        episode_id: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        results
    }

    /// Re-fetch channel metadata from the given URL and overwrite the
    /// stored name/description/thumbnail. Episodes are never touched.
    pub async fn sync_channel_metadata(
        &self,
        channel_id: i64,
        user: &AuthUser,
        url: &str,
    ) -> Result<(), AppError> {
        let channel = self.db.get_channel_owned(channel_id, &user.id)?;
        let source = resolver::resolve(url)?;
        let metadata = self.fetch_metadata(&source).await?;

        let name = metadata
            .channel_name
            .or(Some(metadata.title))
            .filter(|n| !n.is_empty())
            .unwrap_or(channel.name);
        self.db.overwrite_channel_metadata(
            channel_id,
            &name,
            metadata.description.as_deref(),
            metadata.thumbnail_url.as_deref(),
        )?;
        Ok(())
    }

    /// Sync every channel the user owns, continuing past failures.
    pub async fn sync_all_channels_metadata(&self, user: &AuthUser) -> Result<SyncReport, AppError> {
        let channels = self.db.list_channels(&user.id)?;
        let total = channels.len();
        let mut synced = 0;
        let mut failures = Vec::new();

        for channel in channels {
            let url = match channel.url.clone() {
                Some(url) => url,
                None => {
                    failures.push(SyncFailure {
                        channel_id: channel.id,
                        error: "channel has no source url".into(),
                    });
                    continue;
                }
            };
            match self.sync_channel_metadata(channel.id, user, &url).await {
                Ok(()) => synced += 1,
                Err(e) => {
                    log::warn!("channel {} sync failed: {}", channel.id, e);
                    failures.push(SyncFailure {
                        channel_id: channel.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        log::info!("channel sync: {}/{} ok for {}", synced, total, user.id);
        Ok(SyncReport {
            synced,
            total,
            failures,
        })
    }
}
