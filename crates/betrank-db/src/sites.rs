use anyhow::Result;
use betrank_core::csv::SiteRecord;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{SiteFields, SiteRow};
use crate::{Database, decode_names, encode_names};

const SITE_COLUMNS: &str =
    "id, name, url, description, logo_url, categories, labels, commission, ltv, created_by, created_at";

/// Outcome of a CSV import.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    pub errors: Vec<String>,
}

/// The JSON name-array columns on `betting_sites`.
#[derive(Debug, Clone, Copy)]
pub(crate) enum NameColumn {
    Categories,
    Labels,
}

impl NameColumn {
    fn as_str(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Labels => "labels",
        }
    }
}

impl Database {
    pub fn list_sites(&self) -> Result<Vec<SiteRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {SITE_COLUMNS} FROM betting_sites ORDER BY name COLLATE NOCASE");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], site_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_site(&self, id: &str) -> Result<Option<SiteRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {SITE_COLUMNS} FROM betting_sites WHERE id = ?1");
            Ok(conn.query_row(&sql, [id], site_from_row).optional()?)
        })
    }

    pub fn find_site_by_name(&self, name: &str) -> Result<Option<SiteRow>> {
        self.with_conn(|conn| query_site_by_name(conn, name))
    }

    pub fn insert_site(&self, id: &str, fields: &SiteFields, created_by: Option<&str>) -> Result<()> {
        self.with_conn(|conn| insert_site(conn, id, fields, created_by))
    }

    pub fn update_site(&self, id: &str, fields: &SiteFields) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE betting_sites
                 SET name = ?2, url = ?3, description = ?4, logo_url = ?5,
                     categories = ?6, labels = ?7, commission = ?8, ltv = ?9
                 WHERE id = ?1",
                params![
                    id,
                    fields.name,
                    fields.url,
                    fields.description,
                    fields.logo_url,
                    encode_names(&fields.categories)?,
                    encode_names(&fields.labels)?,
                    fields.commission,
                    fields.ltv,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_site(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM betting_sites WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// Upsert CSV records by exact site name. Existing sites keep their logo
    /// and labels. Row failures are collected, the rest of the file still
    /// goes in.
    pub fn import_sites(&self, records: &[(usize, SiteRecord)], created_by: Option<&str>) -> Result<ImportReport> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut report = ImportReport::default();

            for (line_no, record) in records {
                match upsert_record(&tx, record, created_by) {
                    Ok(true) => report.created += 1,
                    Ok(false) => report.updated += 1,
                    Err(e) => {
                        warn!("Import row {} ('{}') failed: {}", line_no, record.name, e);
                        report.errors.push(format!("Row {line_no}: {e}"));
                    }
                }
            }

            tx.commit()?;
            info!(
                "Imported sites: {} created, {} updated, {} errors",
                report.created,
                report.updated,
                report.errors.len()
            );
            Ok(report)
        })
    }
}

/// Returns true when a new site was created.
fn upsert_record(conn: &Connection, record: &SiteRecord, created_by: Option<&str>) -> Result<bool> {
    match query_site_by_name(conn, &record.name)? {
        Some(existing) => {
            conn.execute(
                "UPDATE betting_sites
                 SET url = ?2, description = ?3, categories = ?4, commission = ?5, ltv = ?6
                 WHERE id = ?1",
                params![
                    existing.id,
                    record.url,
                    record.description,
                    encode_names(&record.categories)?,
                    record.commission,
                    record.ltv,
                ],
            )?;
            Ok(false)
        }
        None => {
            let fields = SiteFields {
                name: record.name.clone(),
                url: record.url.clone(),
                description: record.description.clone(),
                logo_url: None,
                categories: record.categories.clone(),
                labels: Vec::new(),
                commission: record.commission,
                ltv: record.ltv,
            };
            insert_site(conn, &Uuid::new_v4().to_string(), &fields, created_by)?;
            Ok(true)
        }
    }
}

fn insert_site(conn: &Connection, id: &str, fields: &SiteFields, created_by: Option<&str>) -> Result<()> {
    conn.execute(
        "INSERT INTO betting_sites
            (id, name, url, description, logo_url, categories, labels, commission, ltv, created_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            id,
            fields.name,
            fields.url,
            fields.description,
            fields.logo_url,
            encode_names(&fields.categories)?,
            encode_names(&fields.labels)?,
            fields.commission,
            fields.ltv,
            created_by,
        ],
    )?;
    Ok(())
}

fn query_site_by_name(conn: &Connection, name: &str) -> Result<Option<SiteRow>> {
    let sql = format!("SELECT {SITE_COLUMNS} FROM betting_sites WHERE name = ?1");
    Ok(conn.query_row(&sql, [name], site_from_row).optional()?)
}

/// Sites whose category array contains `category_name`.
pub(crate) fn sites_in_category(conn: &Connection, category_name: &str) -> Result<Vec<SiteRow>> {
    let sql = format!(
        "SELECT {SITE_COLUMNS} FROM betting_sites
         WHERE EXISTS (SELECT 1 FROM json_each(betting_sites.categories) WHERE value = ?1)"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([category_name], site_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Replace `from` with `to` (or drop it when `to` is None) in one of the
/// name arrays of every site carrying it. Order is kept and duplicates
/// collapse. Returns the number of sites touched.
pub(crate) fn rename_in_sites(conn: &Connection, column: NameColumn, from: &str, to: Option<&str>) -> Result<usize> {
    let col = column.as_str();
    let affected: Vec<(String, String)> = {
        let sql = format!(
            "SELECT id, {col} FROM betting_sites
             WHERE EXISTS (SELECT 1 FROM json_each(betting_sites.{col}) WHERE value = ?1)"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([from], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };

    let update = format!("UPDATE betting_sites SET {col} = ?2 WHERE id = ?1");
    for (id, raw) in &affected {
        let mut names: Vec<String> = Vec::new();
        for name in decode_names(raw) {
            let name = if name == from {
                match to {
                    Some(to) => to.to_string(),
                    None => continue,
                }
            } else {
                name
            };
            if !names.contains(&name) {
                names.push(name);
            }
        }
        conn.execute(&update, params![id, encode_names(&names)?])?;
    }

    Ok(affected.len())
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<SiteRow> {
    Ok(SiteRow {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        description: row.get(3)?,
        logo_url: row.get(4)?,
        categories: decode_names(&row.get::<_, String>(5)?),
        labels: decode_names(&row.get::<_, String>(6)?),
        commission: row.get(7)?,
        ltv: row.get(8)?,
        created_by: row.get(9)?,
        created_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{add_site, db, site_fields};

    fn record(name: &str, categories: &[&str]) -> SiteRecord {
        SiteRecord {
            name: name.into(),
            url: format!("https://{}.example", name.to_lowercase()),
            description: format!("{name}, reviewed"),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            commission: Some(30.0),
            ltv: Some(120.5),
        }
    }

    #[test]
    fn crud_roundtrip() {
        let db = db();
        let id = add_site(&db, "Ace", &["Poker"]);

        let site = db.get_site(&id).unwrap().unwrap();
        assert_eq!(site.categories, vec!["Poker"]);

        let mut fields = site_fields("Ace Poker", &["Poker", "Casino"]);
        fields.labels = vec!["Hot".into()];
        assert!(db.update_site(&id, &fields).unwrap());

        let site = db.find_site_by_name("Ace Poker").unwrap().unwrap();
        assert_eq!(site.id, id);
        assert_eq!(site.labels, vec!["Hot"]);

        assert!(db.delete_site(&id).unwrap());
        assert!(!db.delete_site(&id).unwrap());
        assert!(db.list_sites().unwrap().is_empty());
    }

    #[test]
    fn category_membership_is_exact() {
        let db = db();
        add_site(&db, "Ace", &["Poker"]);
        add_site(&db, "Bet", &["Poker Pro", "Casino"]);
        add_site(&db, "Cue", &["Casino", "Poker"]);

        let names: Vec<String> = db
            .with_conn(|conn| sites_in_category(conn, "Poker"))
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();

        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Ace".to_string()));
        assert!(names.contains(&"Cue".to_string()));
    }

    #[test]
    fn rename_collapses_duplicates_and_drop_removes() {
        let db = db();
        let a = add_site(&db, "Ace", &["Poker", "Cards"]);
        let b = add_site(&db, "Bet", &["Casino"]);

        let touched = db
            .with_conn(|conn| rename_in_sites(conn, NameColumn::Categories, "Poker", Some("Cards")))
            .unwrap();
        assert_eq!(touched, 1);
        assert_eq!(db.get_site(&a).unwrap().unwrap().categories, vec!["Cards"]);

        db.with_conn(|conn| rename_in_sites(conn, NameColumn::Categories, "Casino", None))
            .unwrap();
        assert!(db.get_site(&b).unwrap().unwrap().categories.is_empty());
    }

    #[test]
    fn import_upserts_by_name() {
        let db = db();
        let existing = add_site(&db, "Ace", &[]);
        db.with_conn(|conn| {
            conn.execute("UPDATE betting_sites SET labels = '[\"Hot\"]' WHERE id = ?1", [&existing])?;
            Ok(())
        })
        .unwrap();

        let records = vec![(2, record("Ace", &["Poker"])), (3, record("Bet", &["Casino"]))];
        let report = db.import_sites(&records, None).unwrap();
        assert_eq!(report, ImportReport { created: 1, updated: 1, errors: vec![] });

        let ace = db.get_site(&existing).unwrap().unwrap();
        assert_eq!(ace.categories, vec!["Poker"]);
        assert_eq!(ace.labels, vec!["Hot"]);
        assert_eq!(ace.commission, Some(30.0));

        // Same file again only updates.
        let report = db.import_sites(&records, None).unwrap();
        assert_eq!((report.created, report.updated), (0, 2));
        assert_eq!(db.list_sites().unwrap().len(), 2);
    }
}
