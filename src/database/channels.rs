//! Channel records and the derived episode counts.

use super::{Channel, ChannelWithCount, Database, DbResult, MediaKind};
use crate::config::OrphanPolicy;
use crate::error::AppError;
use rusqlite::{params, OptionalExtension, Row, Transaction};
use serde::Deserialize;

/// Channel identity as seen during ingestion, before a row exists.
#[derive(Debug, Clone)]
pub struct ChannelSeed {
    pub kind: MediaKind,
    pub external_id: String,
    pub name: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelFilter {
    pub user_id: Option<String>,
    pub channel_id: Option<i64>,
}

const CHANNEL_COLUMNS: &str = "id, kind, external_id, name, description, thumbnail_url, url, \
     custom_order, user_id, created_at, updated_at";

fn channel_from_row(row: &Row) -> rusqlite::Result<Channel> {
    Ok(Channel {
        id: row.get(0)?,
        kind: row.get::<_, String>(1)?.into(),
        external_id: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        thumbnail_url: row.get(5)?,
        url: row.get(6)?,
        custom_order: row.get(7)?,
        user_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Create the channel if this external reference is new for the user;
/// otherwise reuse the existing row without touching its user-visible name
/// or thumbnail. Explicit sync is the only path that overwrites those.
pub(crate) fn upsert_channel_tx(
    tx: &Transaction,
    user_id: &str,
    seed: &ChannelSeed,
) -> DbResult<i64> {
    let existing: Option<i64> = tx
        .query_row(
            "SELECT id FROM channels WHERE user_id = ? AND kind = ? AND external_id = ?",
            params![user_id, seed.kind.to_string(), seed.external_id],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let now = super::now_rfc3339();
    tx.execute(
        "INSERT INTO channels (kind, external_id, name, description, thumbnail_url, url,
                               user_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            seed.kind.to_string(),
            seed.external_id,
            seed.name,
            seed.description,
            seed.thumbnail_url,
            seed.url,
            user_id,
            now,
            now,
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

impl Database {
    pub fn get_channel(&self, id: i64) -> DbResult<Option<Channel>> {
        let conn = self.conn.lock().unwrap();
        let channel = conn
            .query_row(
                &format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE id = ?"),
                params![id],
                channel_from_row,
            )
            .optional()?;
        Ok(channel)
    }

    pub fn get_channel_owned(&self, id: i64, user_id: &str) -> DbResult<Channel> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE id = ? AND user_id = ?"),
            params![id, user_id],
            channel_from_row,
        )
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("channel {id}")))
    }

    pub fn list_channels(&self, user_id: &str) -> DbResult<Vec<Channel>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels WHERE user_id = ? ORDER BY name ASC"
        ))?;
        let channels = stmt
            .query_map(params![user_id], channel_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(channels)
    }

    /// Channels joined with their live count of non-deleted episodes. The
    /// count is always derived, never stored.
    pub fn get_channels_with_episode_count(
        &self,
        filter: &ChannelFilter,
    ) -> DbResult<Vec<ChannelWithCount>> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut values: Vec<rusqlite::types::Value> = Vec::new();
        if let Some(user_id) = &filter.user_id {
            conditions.push("c.user_id = ?");
            values.push(rusqlite::types::Value::from(user_id.clone()));
        }
        if let Some(channel_id) = filter.channel_id {
            conditions.push("c.id = ?");
            values.push(rusqlite::types::Value::from(channel_id));
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT c.id, c.kind, c.external_id, c.name, c.description, c.thumbnail_url, c.url,
                    c.custom_order, c.user_id, c.created_at, c.updated_at,
                    COUNT(e.id) AS episode_count
             FROM channels c
             LEFT JOIN episodes e ON e.channel_id = c.id AND e.is_deleted = 0
             {where_clause}
             GROUP BY c.id
             ORDER BY c.name ASC"
        );

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(values.iter()), |row| {
                Ok(ChannelWithCount {
                    channel: channel_from_row(row)?,
                    episode_count: row.get(11)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Overwrite channel metadata from a fresh provider fetch. Episodes are
    /// untouched; only explicit sync calls land here.
    pub fn overwrite_channel_metadata(
        &self,
        channel_id: i64,
        name: &str,
        description: Option<&str>,
        thumbnail_url: Option<&str>,
    ) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE channels SET name = ?, description = ?, thumbnail_url = ?, updated_at = ?
             WHERE id = ?",
            params![name, description, thumbnail_url, super::now_rfc3339(), channel_id],
        )?;
        if rows == 0 {
            return Err(AppError::NotFound(format!("channel {channel_id}")));
        }
        Ok(())
    }

    /// Remove a channel, applying the configured policy to its episodes.
    pub fn delete_channel(&self, id: i64, user_id: &str, policy: OrphanPolicy) -> DbResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let owned: Option<i64> = tx
            .query_row(
                "SELECT id FROM channels WHERE id = ? AND user_id = ?",
                params![id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            return Err(AppError::NotFound(format!("channel {id}")));
        }

        match policy {
            OrphanPolicy::CascadeDelete => {
                tx.execute("DELETE FROM episodes WHERE channel_id = ?", params![id])?;
            }
            OrphanPolicy::NullifyEpisodes => {
                // ON DELETE SET NULL on the foreign key handles it.
            }
        }
        tx.execute("DELETE FROM channels WHERE id = ?", params![id])?;
        tx.commit()?;
        Ok(())
    }
}
