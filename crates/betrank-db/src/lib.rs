pub mod categories;
pub mod labels;
pub mod migrations;
pub mod models;
pub mod online;
pub mod profiles;
pub mod rankings;
pub mod shares;
pub mod sites;
pub mod suggestions;
pub mod time;
pub mod votes;

use anyhow::Result;
use rusqlite::{Connection, ErrorCode};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Fresh private database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Mutable access, needed to open transactions.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&mut conn)
    }
}

/// True when the error is a UNIQUE or PRIMARY KEY violation.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::ConstraintViolation
                && matches!(
                    e.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
    )
}

/// Encode a name list for the JSON array columns on `betting_sites`.
pub(crate) fn encode_names(names: &[String]) -> Result<String> {
    Ok(serde_json::to_string(names)?)
}

pub(crate) fn decode_names(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!("Corrupt name array '{}': {}", raw, e);
        Vec::new()
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::Database;
    use crate::models::SiteFields;

    pub fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    pub fn site_fields(name: &str, categories: &[&str]) -> SiteFields {
        SiteFields {
            name: name.to_string(),
            url: format!("https://{}.example", name.to_lowercase()),
            description: String::new(),
            logo_url: None,
            categories: categories.iter().map(|c| c.to_string()).collect(),
            labels: Vec::new(),
            commission: None,
            ltv: None,
        }
    }

    /// Insert a site and return its id.
    pub fn add_site(db: &Database, name: &str, categories: &[&str]) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        db.insert_site(&id, &site_fields(name, categories), None).unwrap();
        id
    }

    pub fn add_category(db: &Database, name: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        db.insert_category(&id, name, "", None).unwrap();
        id
    }
}
