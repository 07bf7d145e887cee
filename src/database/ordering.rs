//! Ordering engine for the user-defined display sequence.
//!
//! `custom_order` is scoped to a user's active set (not deleted, not
//! archived); archived and deleted rows keep their last value but never
//! participate in min/max. Readers always tie-break equal order values by
//! `created_at DESC`, so transient duplicates stay harmless.

use super::{Database, DbResult};
use crate::error::AppError;
use rusqlite::{params, Transaction};

/// Next append position for a user's active set: max + 1, or 0 when empty.
pub(crate) fn next_custom_order_tx(tx: &Transaction, user_id: &str) -> DbResult<i64> {
    let next: i64 = tx.query_row(
        "SELECT COALESCE(MAX(custom_order) + 1, 0) FROM episodes
         WHERE user_id = ? AND is_deleted = 0 AND is_archived = 0",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(next)
}

impl Database {
    /// Place an episode before everything else (min - 1, or 0 when the
    /// active set is empty).
    pub fn move_to_beginning(&self, id: i64, user_id: &str) -> DbResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let first: i64 = tx.query_row(
            "SELECT COALESCE(MIN(custom_order) - 1, 0) FROM episodes
             WHERE user_id = ? AND is_deleted = 0 AND is_archived = 0",
            params![user_id],
            |row| row.get(0),
        )?;
        let rows = tx.execute(
            "UPDATE episodes SET custom_order = ?, updated_at = ? WHERE id = ? AND user_id = ?",
            params![first, super::now_rfc3339(), id, user_id],
        )?;
        if rows == 0 {
            return Err(AppError::NotFound(format!("episode {id}")));
        }
        tx.commit()?;
        Ok(())
    }

    /// Place an episode after everything else. Equivalent to a fresh append.
    pub fn move_to_end(&self, id: i64, user_id: &str) -> DbResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let last = next_custom_order_tx(&tx, user_id)?;
        let rows = tx.execute(
            "UPDATE episodes SET custom_order = ?, updated_at = ? WHERE id = ? AND user_id = ?",
            params![last, super::now_rfc3339(), id, user_id],
        )?;
        if rows == 0 {
            return Err(AppError::NotFound(format!("episode {id}")));
        }
        tx.commit()?;
        Ok(())
    }

    /// Rewrite the sequence for the given ids: each gets its index as its
    /// order value. All-or-nothing: an id the user does not own aborts the
    /// whole call with no assignments kept.
    pub fn reorder_episodes(&self, user_id: &str, ordered_ids: &[i64]) -> DbResult<()> {
        if ordered_ids.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = super::now_rfc3339();

        for (index, id) in ordered_ids.iter().enumerate() {
            let rows = tx.execute(
                "UPDATE episodes SET custom_order = ?, updated_at = ?
                 WHERE id = ? AND user_id = ?",
                params![index as i64, now, id, user_id],
            )?;
            if rows == 0 {
                // Implicit rollback when tx drops without commit.
                return Err(AppError::NotFound(format!("episode {id}")));
            }
        }

        tx.commit()?;
        log::info!("reordered {} episodes for {}", ordered_ids.len(), user_id);
        Ok(())
    }
}
