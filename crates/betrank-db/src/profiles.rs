use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::Database;
use crate::models::ProfileRow;

const PROFILE_COLUMNS: &str = "id, username, password, role, created_at";

impl Database {
    pub fn create_profile(&self, id: &str, username: &str, password_hash: &str, role: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, username, password, role) VALUES (?1, ?2, ?3, ?4)",
                (id, username, password_hash, role),
            )?;
            Ok(())
        })
    }

    pub fn get_profile_by_username(&self, username: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, "username", username))
    }

    pub fn get_profile_by_id(&self, id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, "id", id))
    }

    pub fn update_password(&self, id: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE profiles SET password = ?2 WHERE id = ?1",
                (id, password_hash),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_role(&self, id: &str, role: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("UPDATE profiles SET role = ?2 WHERE id = ?1", (id, role))?;
            Ok(changed > 0)
        })
    }
}

fn query_profile(conn: &Connection, column: &str, value: &str) -> Result<Option<ProfileRow>> {
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE {column} = ?1");
    let row = conn.query_row(&sql, [value], profile_from_row).optional()?;
    Ok(row)
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        role: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::test_support::db;

    #[test]
    fn create_lookup_and_promote() {
        let db = db();
        db.create_profile("u1", "alice", "hash", "user").unwrap();

        let by_name = db.get_profile_by_username("alice").unwrap().unwrap();
        assert_eq!(by_name.id, "u1");
        assert_eq!(by_name.role, "user");

        assert!(db.set_role("u1", "admin").unwrap());
        assert_eq!(db.get_profile_by_id("u1").unwrap().unwrap().role, "admin");
        assert!(db.get_profile_by_id("missing").unwrap().is_none());
    }

    #[test]
    fn usernames_are_unique() {
        let db = db();
        db.create_profile("u1", "alice", "hash", "user").unwrap();

        let err = db.create_profile("u2", "alice", "hash", "user").unwrap_err();
        assert!(crate::is_unique_violation(&err));
    }
}
