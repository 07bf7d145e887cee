//! Tag records and their many-to-many linkage to episodes.

use super::{Database, DbResult, Tag};
use crate::error::AppError;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

fn tag_from_row(row: &Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        user_id: row.get(3)?,
        created_at: row.get(4)?,
        last_used_at: row.get(5)?,
    })
}

const TAG_COLUMNS: &str = "id, name, color, user_id, created_at, last_used_at";

impl Database {
    /// Exact, case-sensitive name lookup within the user's scope (or the
    /// unscoped namespace when no user applies); creates on miss.
    pub fn find_or_create_tag(&self, name: &str, user_id: Option<&str>) -> DbResult<Tag> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("tag name is empty".into()));
        }

        let conn = self.conn.lock().unwrap();

        // SQLite UNIQUE treats NULLs as distinct, so the NULL-user scope
        // needs its own lookup arm.
        let existing = match user_id {
            Some(uid) => conn
                .query_row(
                    &format!("SELECT {TAG_COLUMNS} FROM tags WHERE name = ? AND user_id = ?"),
                    params![name, uid],
                    tag_from_row,
                )
                .optional()?,
            None => conn
                .query_row(
                    &format!("SELECT {TAG_COLUMNS} FROM tags WHERE name = ? AND user_id IS NULL"),
                    params![name],
                    tag_from_row,
                )
                .optional()?,
        };
        if let Some(tag) = existing {
            return Ok(tag);
        }

        let id = Uuid::new_v4().to_string();
        let now = super::now_rfc3339();
        conn.execute(
            "INSERT INTO tags (id, name, user_id, created_at) VALUES (?, ?, ?, ?)",
            params![id, name, user_id, now],
        )?;
        Ok(Tag {
            id,
            name: name.to_string(),
            color: None,
            user_id: user_id.map(str::to_string),
            created_at: now,
            last_used_at: None,
        })
    }

    pub fn list_tags(&self, user_id: &str) -> DbResult<Vec<Tag>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TAG_COLUMNS} FROM tags WHERE user_id = ? ORDER BY name ASC"
        ))?;
        let tags = stmt
            .query_map(params![user_id], tag_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    pub fn delete_tag(&self, id: &str, user_id: &str) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "DELETE FROM tags WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        if rows == 0 {
            return Err(AppError::NotFound(format!("tag {id}")));
        }
        Ok(())
    }

    pub fn get_episode_tags(&self, episode_id: i64) -> DbResult<Vec<Tag>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name, t.color, t.user_id, t.created_at, t.last_used_at
             FROM tags t
             JOIN episode_tags et ON et.tag_id = t.id
             WHERE et.episode_id = ?
             ORDER BY t.name ASC",
        )?;
        let tags = stmt
            .query_map(params![episode_id], tag_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    /// Replace the episode's tag set. Stale links go, new links come, and
    /// every tag in the new set gets its `last_used_at` bumped — one
    /// transaction.
    pub fn update_tags(&self, episode_id: i64, user_id: &str, tag_ids: &[String]) -> DbResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let owned: Option<i64> = tx
            .query_row(
                "SELECT id FROM episodes WHERE id = ? AND user_id = ?",
                params![episode_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            return Err(AppError::NotFound(format!("episode {episode_id}")));
        }

        // A repeated id in the input is one membership, not two inserts.
        let mut desired: Vec<&str> = Vec::new();
        for id in tag_ids {
            if !desired.contains(&id.as_str()) {
                desired.push(id.as_str());
            }
        }

        let current: Vec<String> = {
            let mut stmt =
                tx.prepare("SELECT tag_id FROM episode_tags WHERE episode_id = ?")?;
            let ids = stmt
                .query_map(params![episode_id], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };

        let now = super::now_rfc3339();
        for stale in current.iter().filter(|id| !desired.contains(&id.as_str())) {
            tx.execute(
                "DELETE FROM episode_tags WHERE episode_id = ? AND tag_id = ?",
                params![episode_id, stale],
            )?;
        }
        for added in desired.iter().filter(|id| !current.iter().any(|c| c.as_str() == **id)) {
            let rows = tx.execute(
                "INSERT OR IGNORE INTO episode_tags (episode_id, tag_id, created_at)
                 SELECT ?, id, ? FROM tags WHERE id = ?",
                params![episode_id, now, added],
            )?;
            if rows == 0 {
                return Err(AppError::NotFound(format!("tag {added}")));
            }
        }
        for tag_id in &desired {
            tx.execute(
                "UPDATE tags SET last_used_at = ? WHERE id = ?",
                params![now, tag_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}
