//! CRUD operations for outline documents.

use brainflow_shared::{Item, Outline, OutlineSummary};
use rusqlite::params;

use crate::database::{from_sql_json, from_sql_time, not_found, to_sql_time, Database};
use crate::error::{Result, StoreError};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new outline document.
    pub fn create_outline(&self, outline: &Outline) -> Result<()> {
        let items = serde_json::to_string(&outline.items)?;
        self.conn().execute(
            "INSERT INTO outlines (id, user_id, title, items, item_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                outline.id,
                outline.user_id,
                outline.title,
                items,
                outline.items.len() as i64,
                to_sql_time(&outline.created_at),
                to_sql_time(&outline.updated_at),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a whole outline document by id.
    pub fn get_outline(&self, id: &str) -> Result<Outline> {
        self.conn()
            .query_row(
                "SELECT id, title, user_id, items, item_count, created_at, updated_at
                 FROM outlines
                 WHERE id = ?1",
                params![id],
                row_to_outline,
            )
            .map_err(not_found)
    }

    /// List a user's outlines without their items, most recently updated first.
    pub fn list_outlines_for_user(&self, user_id: &str) -> Result<Vec<OutlineSummary>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, title, user_id, item_count, created_at, updated_at
             FROM outlines
             WHERE user_id = ?1
             ORDER BY updated_at DESC",
        )?;

        let rows = stmt.query_map(params![user_id], row_to_summary)?;

        let mut outlines = Vec::new();
        for row in rows {
            outlines.push(row?);
        }
        Ok(outlines)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Overwrite an existing document (title, items, counts, timestamps).
    pub fn replace_outline(&self, outline: &Outline) -> Result<()> {
        let items = serde_json::to_string(&outline.items)?;
        let affected = self.conn().execute(
            "UPDATE outlines
             SET title = ?2, items = ?3, item_count = ?4, updated_at = ?5
             WHERE id = ?1 AND user_id = ?6",
            params![
                outline.id,
                outline.title,
                items,
                outline.items.len() as i64,
                to_sql_time(&outline.updated_at),
                outline.user_id,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete an outline owned by `user_id`.  Returns `true` if a row was deleted.
    pub fn delete_outline(&self, id: &str, user_id: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM outlines WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_outline(row: &rusqlite::Row<'_>) -> rusqlite::Result<Outline> {
    let items_raw: String = row.get(3)?;
    let created_raw: String = row.get(5)?;
    let updated_raw: String = row.get(6)?;

    let items: Vec<Item> = from_sql_json(3, &items_raw)?;

    Ok(Outline {
        id: row.get(0)?,
        title: row.get(1)?,
        user_id: row.get(2)?,
        item_count: items.len(),
        items,
        created_at: from_sql_time(5, &created_raw)?,
        updated_at: from_sql_time(6, &updated_raw)?,
    })
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<OutlineSummary> {
    let count: i64 = row.get(3)?;
    let created_raw: String = row.get(4)?;
    let updated_raw: String = row.get(5)?;

    Ok(OutlineSummary {
        id: row.get(0)?,
        title: row.get(1)?,
        user_id: row.get(2)?,
        item_count: count.max(0) as usize,
        created_at: from_sql_time(4, &created_raw)?,
        updated_at: from_sql_time(5, &updated_raw)?,
    })
}
