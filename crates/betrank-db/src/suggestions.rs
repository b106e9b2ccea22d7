use anyhow::Result;
use betrank_types::models::SuggestionStatus;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use tracing::info;
use uuid::Uuid;

use crate::Database;
use crate::models::SuggestionRow;

const SUGGESTION_COLUMNS: &str = "id, name, url, description, suggested_by, status, created_at";

/// What approving a suggestion did.
#[derive(Debug, PartialEq, Eq)]
pub enum Approval {
    /// A new site was created with this id.
    Created(String),
    /// A site with the same name already existed.
    AlreadyListed(String),
}

impl Database {
    pub fn insert_suggestion(
        &self,
        id: &str,
        name: &str,
        url: &str,
        description: &str,
        suggested_by: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO site_suggestions (id, name, url, description, suggested_by)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, name, url, description, suggested_by],
            )?;
            Ok(())
        })
    }

    pub fn list_suggestions(&self, status: Option<SuggestionStatus>) -> Result<Vec<SuggestionRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {SUGGESTION_COLUMNS} FROM site_suggestions
                 WHERE ?1 IS NULL OR status = ?1
                 ORDER BY created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([status.map(SuggestionStatus::as_str)], suggestion_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_suggestion(&self, id: &str) -> Result<Option<SuggestionRow>> {
        self.with_conn(|conn| query_suggestion(conn, id))
    }

    pub fn set_suggestion_status(&self, id: &str, status: SuggestionStatus) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE site_suggestions SET status = ?2 WHERE id = ?1",
                params![id, status.as_str()],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_suggestion(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM site_suggestions WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// Mark a suggestion approved and list the site unless one with that name
    /// exists. Returns None for an unknown suggestion.
    pub fn approve_suggestion(&self, id: &str, approved_by: Option<&str>) -> Result<Option<Approval>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let Some(suggestion) = query_suggestion(&tx, id)? else {
                return Ok(None);
            };

            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM betting_sites WHERE name = ?1",
                    [&suggestion.name],
                    |row| row.get(0),
                )
                .optional()?;

            let approval = match existing {
                Some(site_id) => Approval::AlreadyListed(site_id),
                None => {
                    let site_id = Uuid::new_v4().to_string();
                    tx.execute(
                        "INSERT INTO betting_sites (id, name, url, description, created_by)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![site_id, suggestion.name, suggestion.url, suggestion.description, approved_by],
                    )?;
                    Approval::Created(site_id)
                }
            };

            tx.execute(
                "UPDATE site_suggestions SET status = ?2 WHERE id = ?1",
                params![id, SuggestionStatus::Approved.as_str()],
            )?;
            tx.commit()?;

            info!("Suggestion '{}' approved: {:?}", suggestion.name, approval);
            Ok(Some(approval))
        })
    }
}

fn query_suggestion(conn: &Connection, id: &str) -> Result<Option<SuggestionRow>> {
    let sql = format!("SELECT {SUGGESTION_COLUMNS} FROM site_suggestions WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], suggestion_from_row).optional()?)
}

fn suggestion_from_row(row: &Row<'_>) -> rusqlite::Result<SuggestionRow> {
    Ok(SuggestionRow {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        description: row.get(3)?,
        suggested_by: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{add_site, db};

    #[test]
    fn approval_creates_site_once() {
        let db = db();
        db.insert_suggestion("s1", "Ace", "https://ace.example", "good", None).unwrap();
        db.insert_suggestion("s2", "Ace", "https://ace.example", "again", None).unwrap();

        let first = db.approve_suggestion("s1", None).unwrap().unwrap();
        let Approval::Created(site_id) = first else {
            panic!("expected a new site, got {first:?}");
        };
        assert_eq!(db.get_site(&site_id).unwrap().unwrap().description, "good");

        let second = db.approve_suggestion("s2", None).unwrap().unwrap();
        assert_eq!(second, Approval::AlreadyListed(site_id));
        assert_eq!(db.list_sites().unwrap().len(), 1);

        assert!(db.approve_suggestion("missing", None).unwrap().is_none());
    }

    #[test]
    fn filters_by_status() {
        let db = db();
        add_site(&db, "Existing", &[]);
        db.insert_suggestion("s1", "One", "https://one.example", "", None).unwrap();
        db.insert_suggestion("s2", "Two", "https://two.example", "", None).unwrap();
        assert!(db.set_suggestion_status("s2", SuggestionStatus::Rejected).unwrap());

        let pending = db.list_suggestions(Some(SuggestionStatus::Pending)).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "s1");
        assert_eq!(db.list_suggestions(None).unwrap().len(), 2);

        assert!(db.delete_suggestion("s1").unwrap());
        assert!(db.get_suggestion("s1").unwrap().is_none());
    }
}
