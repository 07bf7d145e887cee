//! playlater — watch-later episode tracking core.
//!
//! Ingests episodes from external URLs, maintains the watch/favorite/
//! priority/archive/delete lifecycle, owns the user-defined display order,
//! and answers filtered, sorted, paginated queries over the collection.

pub mod config;
pub mod database;
pub mod error;
pub mod ingest;
pub mod metadata;
pub mod resolver;

pub use config::{Config, OrphanPolicy};
pub use database::{
    AuthUser, Channel, ChannelFilter, ChannelSeed, ChannelWithCount, Database, Episode,
    EpisodeFilter, EpisodeSort, EpisodeUpdate, LikeStatus, MediaEvent, MediaKind, NewEpisode,
    Page, Priority, SortField, Tag, WatchStatus,
};
pub use error::AppError;
pub use ingest::{BatchItemResult, IngestService, SyncFailure, SyncReport};
pub use metadata::{EpisodeMetadata, HttpMetadataProvider, MetadataProvider};
pub use resolver::{resolve, ResolvedSource};
