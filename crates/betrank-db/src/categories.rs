use anyhow::Result;
use betrank_types::models::MoveDirection;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use tracing::info;

use crate::Database;
use crate::models::CategoryRow;
use crate::sites::{NameColumn, rename_in_sites};

const CATEGORY_COLUMNS: &str = "id, name, description, position, created_by, created_at";

impl Database {
    pub fn list_categories(&self) -> Result<Vec<CategoryRow>> {
        self.with_conn(list_categories)
    }

    pub fn get_category(&self, id: &str) -> Result<Option<CategoryRow>> {
        self.with_conn(|conn| query_category(conn, id))
    }

    /// New categories go to the end of the list.
    pub fn insert_category(&self, id: &str, name: &str, description: &str, created_by: Option<&str>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO ranking_categories (id, name, description, position, created_by)
                 VALUES (?1, ?2, ?3, (SELECT COALESCE(MAX(position) + 1, 0) FROM ranking_categories), ?4)",
                params![id, name, description, created_by],
            )?;
            Ok(())
        })
    }

    /// Update a category. A rename is carried into every site tagged with the
    /// old name and into the denormalized name on its rankings.
    pub fn update_category(&self, id: &str, name: &str, description: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let Some(current) = query_category(&tx, id)? else {
                return Ok(false);
            };

            tx.execute(
                "UPDATE ranking_categories SET name = ?2, description = ?3 WHERE id = ?1",
                params![id, name, description],
            )?;

            if current.name != name {
                let touched = rename_in_sites(&tx, NameColumn::Categories, &current.name, Some(name))?;
                tx.execute(
                    "UPDATE daily_rankings SET category_name = ?2 WHERE category_id = ?1",
                    params![id, name],
                )?;
                info!("Category '{}' renamed to '{}' ({} sites updated)", current.name, name, touched);
            }

            tx.commit()?;
            Ok(true)
        })
    }

    /// Delete a category, untagging its sites. Rankings cascade.
    pub fn delete_category(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let Some(current) = query_category(&tx, id)? else {
                return Ok(false);
            };

            rename_in_sites(&tx, NameColumn::Categories, &current.name, None)?;
            tx.execute("DELETE FROM ranking_categories WHERE id = ?1", [id])?;

            tx.commit()?;
            info!("Category '{}' deleted", current.name);
            Ok(true)
        })
    }

    /// Swap positions with the neighbouring category. Returns false when the
    /// category does not exist or is already at that end of the list.
    pub fn move_category(&self, id: &str, direction: MoveDirection) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let ordered = list_categories(&tx)?;
            let Some(idx) = ordered.iter().position(|c| c.id == id) else {
                return Ok(false);
            };
            let neighbour = match direction {
                MoveDirection::Up => idx.checked_sub(1),
                MoveDirection::Down => Some(idx + 1).filter(|n| *n < ordered.len()),
            };
            let Some(n) = neighbour else {
                return Ok(false);
            };

            // Rewrite both positions from list order so gaps or ties left by
            // deletes cannot make the swap a no-op.
            let (a, b) = (&ordered[idx], &ordered[n]);
            tx.execute(
                "UPDATE ranking_categories SET position = ?2 WHERE id = ?1",
                params![a.id, n as i64],
            )?;
            tx.execute(
                "UPDATE ranking_categories SET position = ?2 WHERE id = ?1",
                params![b.id, idx as i64],
            )?;
            for (i, other) in ordered.iter().enumerate() {
                if i != idx && i != n && other.position != i as i64 {
                    tx.execute(
                        "UPDATE ranking_categories SET position = ?2 WHERE id = ?1",
                        params![other.id, i as i64],
                    )?;
                }
            }

            tx.commit()?;
            Ok(true)
        })
    }
}

pub(crate) fn list_categories(conn: &Connection) -> Result<Vec<CategoryRow>> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM ranking_categories ORDER BY position, created_at, name");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], category_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn query_category(conn: &Connection, id: &str) -> Result<Option<CategoryRow>> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM ranking_categories WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], category_from_row).optional()?)
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<CategoryRow> {
    Ok(CategoryRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        position: row.get(3)?,
        created_by: row.get(4)?,
        created_at: row.get(5)?,
    })
}
