use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};

use crate::Database;
use crate::models::LabelRow;
use crate::sites::{NameColumn, rename_in_sites};

impl Database {
    pub fn list_labels(&self) -> Result<Vec<LabelRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, color, created_by, created_at FROM site_labels ORDER BY name COLLATE NOCASE",
            )?;
            let rows = stmt
                .query_map([], label_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_label(&self, id: &str) -> Result<Option<LabelRow>> {
        self.with_conn(|conn| query_label(conn, id))
    }

    pub fn insert_label(&self, id: &str, name: &str, color: &str, created_by: Option<&str>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO site_labels (id, name, color, created_by) VALUES (?1, ?2, ?3, ?4)",
                params![id, name, color, created_by],
            )?;
            Ok(())
        })
    }

    /// Labels attach to sites by name, so a rename rewrites the sites too.
    pub fn update_label(&self, id: &str, name: &str, color: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let Some(current) = query_label(&tx, id)? else {
                return Ok(false);
            };

            tx.execute(
                "UPDATE site_labels SET name = ?2, color = ?3 WHERE id = ?1",
                params![id, name, color],
            )?;
            if current.name != name {
                rename_in_sites(&tx, NameColumn::Labels, &current.name, Some(name))?;
            }

            tx.commit()?;
            Ok(true)
        })
    }

    pub fn delete_label(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let Some(current) = query_label(&tx, id)? else {
                return Ok(false);
            };

            rename_in_sites(&tx, NameColumn::Labels, &current.name, None)?;
            tx.execute("DELETE FROM site_labels WHERE id = ?1", [id])?;

            tx.commit()?;
            Ok(true)
        })
    }
}

fn query_label(conn: &Connection, id: &str) -> Result<Option<LabelRow>> {
    Ok(conn
        .query_row(
            "SELECT id, name, color, created_by, created_at FROM site_labels WHERE id = ?1",
            [id],
            label_from_row,
        )
        .optional()?)
}

fn label_from_row(row: &Row<'_>) -> rusqlite::Result<LabelRow> {
    Ok(LabelRow {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        created_by: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::models::SiteFields;
    use crate::test_support::{db, site_fields};

    #[test]
    fn label_rename_and_delete_follow_sites() {
        let db = db();
        db.insert_label("l1", "Hot", "#ff0000", None).unwrap();
        let fields = SiteFields {
            labels: vec!["Hot".into(), "New".into()],
            ..site_fields("Ace", &[])
        };
        db.insert_site("s1", &fields, None).unwrap();

        assert!(db.update_label("l1", "Trending", "#00ff00").unwrap());
        assert_eq!(db.get_site("s1").unwrap().unwrap().labels, vec!["Trending", "New"]);
        assert_eq!(db.get_label("l1").unwrap().unwrap().color, "#00ff00");

        assert!(db.delete_label("l1").unwrap());
        assert_eq!(db.get_site("s1").unwrap().unwrap().labels, vec!["New"]);
        assert!(db.list_labels().unwrap().is_empty());
    }
}
