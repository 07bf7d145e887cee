use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Podcast,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Podcast => write!(f, "podcast"),
        }
    }
}

impl From<String> for MediaKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "podcast" => Self::Podcast,
            _ => Self::Video,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    #[default]
    Unwatched,
    Pending,
    Watched,
}

impl std::fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unwatched => write!(f, "unwatched"),
            Self::Pending => write!(f, "pending"),
            Self::Watched => write!(f, "watched"),
        }
    }
}

impl From<String> for WatchStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => Self::Pending,
            "watched" => Self::Watched,
            _ => Self::Unwatched,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LikeStatus {
    #[default]
    None,
    Like,
    Dislike,
}

impl std::fmt::Display for LikeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Like => write!(f, "like"),
            Self::Dislike => write!(f, "dislike"),
        }
    }
}

impl From<String> for LikeStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "like" => Self::Like,
            "dislike" => Self::Dislike,
            _ => Self::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        match s.as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: i64,
    pub kind: MediaKind,
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub duration: Option<f64>,
    pub thumbnail_url: Option<String>,
    pub url: String,
    pub upload_date: Option<String>,
    pub published_date: Option<String>,
    pub view_count: Option<i64>,
    pub notes: Option<String>,
    pub channel_id: Option<i64>,
    pub user_id: String,
    pub watched: bool,
    pub watch_status: WatchStatus,
    pub favorite: bool,
    pub like_status: LikeStatus,
    pub is_archived: bool,
    pub archived_at: Option<String>,
    pub is_deleted: bool,
    pub date_removed: Option<String>,
    pub priority: Priority,
    pub custom_order: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields required to insert a freshly ingested episode. Lifecycle flags
/// all start at their defaults; `custom_order` is assigned by the ordering
/// engine inside the ingest transaction.
#[derive(Debug, Clone)]
pub struct NewEpisode {
    pub kind: MediaKind,
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub duration: Option<f64>,
    pub thumbnail_url: Option<String>,
    pub url: String,
    pub upload_date: Option<String>,
    pub published_date: Option<String>,
    pub view_count: Option<i64>,
    pub channel_id: Option<i64>,
    pub user_id: String,
}

/// Partial update across the lifecycle axes. Unknown fields are rejected
/// at deserialization time so callers can never silently widen scope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EpisodeUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub watch_status: Option<WatchStatus>,
    pub favorite: Option<bool>,
    pub like_status: Option<LikeStatus>,
    pub priority: Option<Priority>,
    pub is_archived: Option<bool>,
}

impl EpisodeUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.notes.is_none()
            && self.watch_status.is_none()
            && self.favorite.is_none()
            && self.like_status.is_none()
            && self.priority.is_none()
            && self.is_archived.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub kind: MediaKind,
    pub external_id: String,
    pub name: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub url: Option<String>,
    pub custom_order: Option<i64>,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelWithCount {
    #[serde(flatten)]
    pub channel: Channel,
    /// Count of non-deleted episodes under this channel.
    pub episode_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub user_id: Option<String>,
    pub created_at: String,
    pub last_used_at: Option<String>,
}

/// Append-only audit record; rows only ever disappear when their episode
/// is hard-deleted (ON DELETE CASCADE).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaEvent {
    pub id: i64,
    pub episode_id: i64,
    pub event_type: String,
    pub title: String,
    pub kind: MediaKind,
    pub created_at: String,
}

/// Authenticated identity, validated once at the boundary and passed down
/// as-is. Core operations only need the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub is_admin: bool,
}
