pub mod channels;
pub mod models;
pub mod ordering;
pub mod query;
pub mod tags;


use crate::error::AppError;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub use channels::{ChannelFilter, ChannelSeed};
pub use models::*;
pub use query::{EpisodeFilter, EpisodeSort, Page, SortField};

pub type DbResult<T> = Result<T, AppError>;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

pub(crate) const EPISODE_COLUMNS: &str = "id, kind, external_id, title, description, duration, \
     thumbnail_url, url, upload_date, published_date, view_count, notes, channel_id, user_id, \
     watched, watch_status, favorite, like_status, is_archived, archived_at, is_deleted, \
     date_removed, priority, custom_order, created_at, updated_at";

pub(crate) fn episode_from_row(row: &Row) -> rusqlite::Result<Episode> {
    Ok(Episode {
        id: row.get(0)?,
        kind: row.get::<_, String>(1)?.into(),
        external_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        duration: row.get(5)?,
        thumbnail_url: row.get(6)?,
        url: row.get(7)?,
        upload_date: row.get(8)?,
        published_date: row.get(9)?,
        view_count: row.get(10)?,
        notes: row.get(11)?,
        channel_id: row.get(12)?,
        user_id: row.get(13)?,
        watched: row.get::<_, i32>(14)? == 1,
        watch_status: row.get::<_, String>(15)?.into(),
        favorite: row.get::<_, i32>(16)? == 1,
        like_status: row.get::<_, String>(17)?.into(),
        is_archived: row.get::<_, i32>(18)? == 1,
        archived_at: row.get(19)?,
        is_deleted: row.get::<_, i32>(20)? == 1,
        date_removed: row.get(21)?,
        priority: row.get::<_, String>(22)?.into(),
        custom_order: row.get(23)?,
        created_at: row.get(24)?,
        updated_at: row.get(25)?,
    })
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl Database {
    pub fn new(db_path: &Path) -> DbResult<Self> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// In-memory database, used by tests and throwaway tooling.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> DbResult<Self> {
        // Enable WAL mode for concurrent reads
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
            PRAGMA cache_size=10000;
            PRAGMA temp_store=MEMORY;
        ",
        )?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS channels (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                external_id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                thumbnail_url TEXT,
                url TEXT,
                custom_order INTEGER,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(user_id, kind, external_id)
            );

            CREATE TABLE IF NOT EXISTS episodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                external_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                duration REAL,
                thumbnail_url TEXT,
                url TEXT NOT NULL,
                upload_date TEXT,
                published_date TEXT,
                view_count INTEGER,
                notes TEXT,
                channel_id INTEGER REFERENCES channels(id) ON DELETE SET NULL,
                user_id TEXT NOT NULL,
                watched INTEGER NOT NULL DEFAULT 0,
                watch_status TEXT NOT NULL DEFAULT 'unwatched',
                favorite INTEGER NOT NULL DEFAULT 0,
                like_status TEXT NOT NULL DEFAULT 'none',
                is_archived INTEGER NOT NULL DEFAULT 0,
                archived_at TEXT,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                date_removed TEXT,
                priority TEXT NOT NULL DEFAULT 'none',
                custom_order INTEGER,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(user_id, kind, external_id)
            );

            CREATE INDEX IF NOT EXISTS idx_episodes_user_active
                ON episodes(user_id, is_deleted, is_archived);
            CREATE INDEX IF NOT EXISTS idx_episodes_user_order
                ON episodes(user_id, custom_order);
            CREATE INDEX IF NOT EXISTS idx_episodes_channel
                ON episodes(channel_id);

            CREATE TABLE IF NOT EXISTS tags (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                color TEXT,
                user_id TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                last_used_at TEXT,
                UNIQUE(user_id, name)
            );

            CREATE TABLE IF NOT EXISTS episode_tags (
                episode_id INTEGER NOT NULL REFERENCES episodes(id) ON DELETE CASCADE,
                tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(episode_id, tag_id)
            );

            CREATE INDEX IF NOT EXISTS idx_episode_tags_tag ON episode_tags(tag_id);

            CREATE TABLE IF NOT EXISTS media_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                episode_id INTEGER NOT NULL REFERENCES episodes(id) ON DELETE CASCADE,
                event_type TEXT NOT NULL,
                title TEXT NOT NULL,
                kind TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_media_events_episode ON media_events(episode_id);
        "#,
        )?;
        Ok(())
    }

    // =========================================================================
    // Episode reads
    // =========================================================================

    pub fn get_episode(&self, id: i64) -> DbResult<Option<Episode>> {
        let conn = self.conn.lock().unwrap();
        let episode = conn
            .query_row(
                &format!("SELECT {EPISODE_COLUMNS} FROM episodes WHERE id = ?"),
                params![id],
                episode_from_row,
            )
            .optional()?;
        Ok(episode)
    }

    /// Like [`get_episode`](Self::get_episode) but scoped to an owner.
    /// Rows belonging to someone else are reported as absent.
    pub fn get_episode_owned(&self, id: i64, user_id: &str) -> DbResult<Episode> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {EPISODE_COLUMNS} FROM episodes WHERE id = ? AND user_id = ?"),
            params![id, user_id],
            episode_from_row,
        )
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("episode {id}")))
    }

    pub fn find_by_external_id(
        &self,
        user_id: &str,
        kind: MediaKind,
        external_id: &str,
    ) -> DbResult<Option<Episode>> {
        let conn = self.conn.lock().unwrap();
        let episode = conn
            .query_row(
                &format!(
                    "SELECT {EPISODE_COLUMNS} FROM episodes \
                     WHERE user_id = ? AND kind = ? AND external_id = ?"
                ),
                params![user_id, kind.to_string(), external_id],
                episode_from_row,
            )
            .optional()?;
        Ok(episode)
    }

    pub fn get_media_events(&self, episode_id: i64) -> DbResult<Vec<MediaEvent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, episode_id, event_type, title, kind, created_at
             FROM media_events WHERE episode_id = ? ORDER BY id ASC",
        )?;
        let events = stmt
            .query_map(params![episode_id], |row| {
                Ok(MediaEvent {
                    id: row.get(0)?,
                    episode_id: row.get(1)?,
                    event_type: row.get(2)?,
                    title: row.get(3)?,
                    kind: row.get::<_, String>(4)?.into(),
                    created_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    // =========================================================================
    // Ingestion write path
    // =========================================================================

    /// Channel upsert, order assignment, episode insert and the "added"
    /// audit event as one atomic unit. Any failure rolls the lot back.
    pub fn ingest_episode(
        &self,
        mut new: NewEpisode,
        channel: Option<ChannelSeed>,
    ) -> DbResult<Episode> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        if let Some(seed) = channel {
            new.channel_id = Some(channels::upsert_channel_tx(&tx, &new.user_id, &seed)?);
        }
        let order = ordering::next_custom_order_tx(&tx, &new.user_id)?;
        // A concurrent ingest can win the race between the caller's
        // duplicate pre-check and this insert; surface the constraint hit
        // as the same idempotency signal, carrying the winning row.
        let episode = match insert_episode_tx(&tx, &new, order) {
            Ok(episode) => episode,
            Err(AppError::Database(msg)) if msg.contains("UNIQUE constraint failed: episodes") => {
                drop(tx);
                let existing = conn.query_row(
                    &format!(
                        "SELECT {EPISODE_COLUMNS} FROM episodes \
                         WHERE user_id = ? AND kind = ? AND external_id = ?"
                    ),
                    params![new.user_id, new.kind.to_string(), new.external_id],
                    episode_from_row,
                )?;
                return Err(AppError::Duplicate(Box::new(existing)));
            }
            Err(e) => return Err(e),
        };
        record_event_tx(&tx, episode.id, "added", &episode.title, episode.kind)?;

        tx.commit()?;
        Ok(episode)
    }

    // =========================================================================
    // Episode lifecycle
    // =========================================================================

    /// Apply a partial update across the lifecycle axes. `watched` is
    /// derived from `watch_status`; `archived_at` tracks `is_archived`.
    pub fn update_episode(
        &self,
        id: i64,
        user_id: &str,
        update: &EpisodeUpdate,
    ) -> DbResult<Episode> {
        if update.is_empty() {
            return Err(AppError::Validation("no fields to update".into()));
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let before = tx
            .query_row(
                &format!("SELECT {EPISODE_COLUMNS} FROM episodes WHERE id = ? AND user_id = ?"),
                params![id, user_id],
                episode_from_row,
            )
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("episode {id}")))?;

        let now = now_rfc3339();
        let mut sets: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(title) = &update.title {
            sets.push("title = ?".into());
            values.push(Box::new(title.clone()));
        }
        if let Some(description) = &update.description {
            sets.push("description = ?".into());
            values.push(Box::new(description.clone()));
        }
        if let Some(notes) = &update.notes {
            sets.push("notes = ?".into());
            values.push(Box::new(notes.clone()));
        }
        if let Some(status) = update.watch_status {
            sets.push("watch_status = ?".into());
            values.push(Box::new(status.to_string()));
            sets.push("watched = ?".into());
            values.push(Box::new(status == WatchStatus::Watched));
        }
        if let Some(favorite) = update.favorite {
            sets.push("favorite = ?".into());
            values.push(Box::new(favorite));
        }
        if let Some(like) = update.like_status {
            sets.push("like_status = ?".into());
            values.push(Box::new(like.to_string()));
        }
        if let Some(priority) = update.priority {
            sets.push("priority = ?".into());
            values.push(Box::new(priority.to_string()));
        }
        if let Some(archived) = update.is_archived {
            sets.push("is_archived = ?".into());
            values.push(Box::new(archived));
            sets.push("archived_at = ?".into());
            values.push(Box::new(if archived { Some(now.clone()) } else { None }));
        }

        sets.push("updated_at = ?".into());
        values.push(Box::new(now));
        values.push(Box::new(id));
        values.push(Box::new(user_id.to_string()));

        let sql = format!(
            "UPDATE episodes SET {} WHERE id = ? AND user_id = ?",
            sets.join(", ")
        );
        tx.execute(&sql, rusqlite::params_from_iter(values.iter()))?;

        if let Some(archived) = update.is_archived {
            if archived != before.is_archived {
                let event = if archived { "archived" } else { "unarchived" };
                record_event_tx(&tx, id, event, &before.title, before.kind)?;
            }
        }

        let after = tx.query_row(
            &format!("SELECT {EPISODE_COLUMNS} FROM episodes WHERE id = ?"),
            params![id],
            episode_from_row,
        )?;
        tx.commit()?;
        Ok(after)
    }

    /// Soft-delete: hide the row but keep it restorable.
    pub fn soft_delete_episode(&self, id: i64, user_id: &str) -> DbResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let episode = tx
            .query_row(
                &format!("SELECT {EPISODE_COLUMNS} FROM episodes WHERE id = ? AND user_id = ?"),
                params![id, user_id],
                episode_from_row,
            )
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("episode {id}")))?;

        let now = now_rfc3339();
        tx.execute(
            "UPDATE episodes SET is_deleted = 1, date_removed = ?, updated_at = ? WHERE id = ?",
            params![now, now, id],
        )?;
        record_event_tx(&tx, id, "soft_deleted", &episode.title, episode.kind)?;
        tx.commit()?;
        Ok(())
    }

    pub fn restore_episode(&self, id: i64, user_id: &str) -> DbResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let episode = tx
            .query_row(
                &format!("SELECT {EPISODE_COLUMNS} FROM episodes WHERE id = ? AND user_id = ?"),
                params![id, user_id],
                episode_from_row,
            )
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("episode {id}")))?;

        let now = now_rfc3339();
        tx.execute(
            "UPDATE episodes SET is_deleted = 0, date_removed = NULL, updated_at = ? WHERE id = ?",
            params![now, id],
        )?;
        record_event_tx(&tx, id, "restored", &episode.title, episode.kind)?;
        tx.commit()?;
        Ok(())
    }

    /// Irreversible removal. Tag links and audit events go with the row
    /// via ON DELETE CASCADE.
    pub fn hard_delete_episode(&self, id: i64, user_id: &str) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "DELETE FROM episodes WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        if rows == 0 {
            return Err(AppError::NotFound(format!("episode {id}")));
        }
        Ok(())
    }

    // =========================================================================
    // Bulk lifecycle operations — one transaction per call
    // =========================================================================

    /// Archive every fully-watched, not-yet-archived episode.
    pub fn bulk_archive_watched(&self, user_id: &str) -> DbResult<usize> {
        let conn = self.conn.lock().unwrap();
        let now = now_rfc3339();
        let count = conn.execute(
            "UPDATE episodes SET is_archived = 1, archived_at = ?, updated_at = ?
             WHERE user_id = ? AND watch_status = 'watched'
               AND is_archived = 0 AND is_deleted = 0",
            params![now, now, user_id],
        )?;
        if count > 0 {
            log::info!("archived {} watched episodes for {}", count, user_id);
        }
        Ok(count)
    }

    pub fn bulk_unarchive_all(&self, user_id: &str) -> DbResult<usize> {
        let conn = self.conn.lock().unwrap();
        let now = now_rfc3339();
        let count = conn.execute(
            "UPDATE episodes SET is_archived = 0, archived_at = NULL, updated_at = ?
             WHERE user_id = ? AND is_archived = 1",
            params![now, user_id],
        )?;
        Ok(count)
    }

    /// Soft-delete every episode carrying the given tag.
    pub fn soft_delete_episodes_by_tag(&self, tag_id: &str, user_id: &str) -> DbResult<usize> {
        let conn = self.conn.lock().unwrap();
        let now = now_rfc3339();
        let count = conn.execute(
            "UPDATE episodes SET is_deleted = 1, date_removed = ?, updated_at = ?
             WHERE user_id = ? AND is_deleted = 0
               AND id IN (SELECT episode_id FROM episode_tags WHERE tag_id = ?)",
            params![now, now, user_id, tag_id],
        )?;
        if count > 0 {
            log::info!("soft-deleted {} episodes tagged {}", count, tag_id);
        }
        Ok(count)
    }

    pub fn restore_all_episodes(&self, user_id: &str) -> DbResult<usize> {
        let conn = self.conn.lock().unwrap();
        let now = now_rfc3339();
        let count = conn.execute(
            "UPDATE episodes SET is_deleted = 0, date_removed = NULL, updated_at = ?
             WHERE user_id = ? AND is_deleted = 1",
            params![now, user_id],
        )?;
        Ok(count)
    }

    /// Permanently remove everything currently in the trash.
    pub fn hard_delete_all_episodes(&self, user_id: &str) -> DbResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute(
            "DELETE FROM episodes WHERE user_id = ? AND is_deleted = 1",
            params![user_id],
        )?;
        if count > 0 {
            log::info!("hard-deleted {} episodes for {}", count, user_id);
        }
        Ok(count)
    }

    /// Set the watch state for every episode under a channel.
    pub fn bulk_update_watch_status(
        &self,
        channel_id: i64,
        user_id: &str,
        watched: bool,
    ) -> DbResult<usize> {
        let conn = self.conn.lock().unwrap();
        let status = if watched {
            WatchStatus::Watched
        } else {
            WatchStatus::Unwatched
        };
        let now = now_rfc3339();
        let count = conn.execute(
            "UPDATE episodes SET watch_status = ?, watched = ?, updated_at = ?
             WHERE channel_id = ? AND user_id = ?",
            params![status.to_string(), watched, now, channel_id, user_id],
        )?;
        Ok(count)
    }
}

// =============================================================================
// Transaction-scoped helpers shared across the write paths
// =============================================================================

pub(crate) fn insert_episode_tx(
    tx: &Transaction,
    new: &NewEpisode,
    custom_order: i64,
) -> DbResult<Episode> {
    let now = now_rfc3339();
    tx.execute(
        "INSERT INTO episodes (kind, external_id, title, description, duration, thumbnail_url,
                               url, upload_date, published_date, view_count, channel_id, user_id,
                               custom_order, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            new.kind.to_string(),
            new.external_id,
            new.title,
            new.description,
            new.duration,
            new.thumbnail_url,
            new.url,
            new.upload_date,
            new.published_date,
            new.view_count,
            new.channel_id,
            new.user_id,
            custom_order,
            now,
            now,
        ],
    )?;
    let id = tx.last_insert_rowid();
    let episode = tx.query_row(
        &format!("SELECT {EPISODE_COLUMNS} FROM episodes WHERE id = ?"),
        params![id],
        episode_from_row,
    )?;
    Ok(episode)
}

pub(crate) fn record_event_tx(
    tx: &Transaction,
    episode_id: i64,
    event_type: &str,
    title: &str,
    kind: MediaKind,
) -> DbResult<()> {
    tx.execute(
        "INSERT INTO media_events (episode_id, event_type, title, kind, created_at)
         VALUES (?, ?, ?, ?, ?)",
        params![episode_id, event_type, title, kind.to_string(), now_rfc3339()],
    )?;
    Ok(())
}
