//! Filtered, sorted, paginated listing over the episode collection.
//!
//! One owning-user scope is always applied. Soft-deleted and archived rows
//! are excluded unless the caller asks for them explicitly. Multi-valued
//! filters OR within their dimension; dimensions AND together. Every value
//! reaches SQLite as a bound parameter.

use super::{episode_from_row, Database, DbResult, Episode, MediaKind, WatchStatus, EPISODE_COLUMNS};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EpisodeFilter {
    pub user_id: String,
    pub kind: Option<MediaKind>,
    /// Episodes carrying any of these tags.
    #[serde(default)]
    pub tag_ids: Vec<String>,
    pub channel_id: Option<i64>,
    /// Episodes under any of these channels. Takes precedence over
    /// `channel_id` when non-empty.
    #[serde(default)]
    pub channel_ids: Vec<i64>,
    /// Free-text match over title and description.
    pub search: Option<String>,
    pub watched: Option<bool>,
    pub watch_status: Option<WatchStatus>,
    pub favorite: Option<bool>,
    pub has_notes: Option<bool>,
    /// None keeps the default view (soft-deleted rows hidden).
    pub is_deleted: Option<bool>,
    /// None keeps the default view (archived rows hidden).
    pub is_archived: Option<bool>,
}

impl EpisodeFilter {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Title,
    Duration,
    PublishedDate,
    #[default]
    CustomOrder,
    ArchivedAt,
    DateRemoved,
}

impl SortField {
    fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Title => "title",
            Self::Duration => "duration",
            Self::PublishedDate => "published_date",
            Self::CustomOrder => "custom_order",
            Self::ArchivedAt => "archived_at",
            Self::DateRemoved => "date_removed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct EpisodeSort {
    #[serde(default)]
    pub field: SortField,
    #[serde(default)]
    pub descending: bool,
}

/// Absent limit/offset means unbounded.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Escape LIKE wildcards in user input; paired with `ESCAPE '\'`.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

impl Database {
    /// Returns the matching page plus the total count before pagination.
    pub fn list_episodes(
        &self,
        filter: &EpisodeFilter,
        sort: EpisodeSort,
        page: Page,
    ) -> DbResult<(Vec<Episode>, i64)> {
        let mut conditions = vec!["user_id = ?".to_string()];
        let mut values: Vec<Value> = vec![Value::from(filter.user_id.clone())];

        if let Some(kind) = filter.kind {
            conditions.push("kind = ?".into());
            values.push(Value::from(kind.to_string()));
        }

        match filter.is_deleted {
            Some(deleted) => {
                conditions.push("is_deleted = ?".into());
                values.push(Value::from(deleted as i64));
            }
            None => conditions.push("is_deleted = 0".into()),
        }
        match filter.is_archived {
            Some(archived) => {
                conditions.push("is_archived = ?".into());
                values.push(Value::from(archived as i64));
            }
            None => conditions.push("is_archived = 0".into()),
        }

        if let Some(watched) = filter.watched {
            conditions.push("watched = ?".into());
            values.push(Value::from(watched as i64));
        }
        if let Some(status) = filter.watch_status {
            conditions.push("watch_status = ?".into());
            values.push(Value::from(status.to_string()));
        }
        if let Some(favorite) = filter.favorite {
            conditions.push("favorite = ?".into());
            values.push(Value::from(favorite as i64));
        }
        if let Some(has_notes) = filter.has_notes {
            if has_notes {
                conditions.push("(notes IS NOT NULL AND TRIM(notes) != '')".into());
            } else {
                conditions.push("(notes IS NULL OR TRIM(notes) = '')".into());
            }
        }

        if let Some(term) = filter.search.as_deref().filter(|t| !t.trim().is_empty()) {
            conditions.push("(title LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\')".into());
            let pattern = format!("%{}%", escape_like(term.trim()));
            values.push(Value::from(pattern.clone()));
            values.push(Value::from(pattern));
        }

        if !filter.channel_ids.is_empty() {
            conditions.push(format!(
                "channel_id IN ({})",
                placeholders(filter.channel_ids.len())
            ));
            values.extend(filter.channel_ids.iter().map(|id| Value::from(*id)));
        } else if let Some(channel_id) = filter.channel_id {
            conditions.push("channel_id = ?".into());
            values.push(Value::from(channel_id));
        }

        if !filter.tag_ids.is_empty() {
            conditions.push(format!(
                "id IN (SELECT episode_id FROM episode_tags WHERE tag_id IN ({}))",
                placeholders(filter.tag_ids.len())
            ));
            values.extend(filter.tag_ids.iter().map(|id| Value::from(id.clone())));
        }

        let where_clause = conditions.join(" AND ");
        let direction = if sort.descending { "DESC" } else { "ASC" };

        let conn = self.conn.lock().unwrap();

        let count_sql = format!("SELECT COUNT(*) FROM episodes WHERE {where_clause}");
        let total: i64 = conn.query_row(
            &count_sql,
            rusqlite::params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        // created_at DESC is the documented tie-break for colliding order
        // values; it also stabilizes every other sort field.
        let sql = format!(
            "SELECT {EPISODE_COLUMNS} FROM episodes WHERE {where_clause}
             ORDER BY {} {}, created_at DESC
             LIMIT ? OFFSET ?",
            sort.field.column(),
            direction
        );
        values.push(Value::from(page.limit.unwrap_or(-1)));
        values.push(Value::from(page.offset.unwrap_or(0)));

        let mut stmt = conn.prepare(&sql)?;
        let episodes = stmt
            .query_map(rusqlite::params_from_iter(values.iter()), episode_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((episodes, total))
    }
}
