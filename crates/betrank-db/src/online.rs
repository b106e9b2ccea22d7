use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::Database;
use crate::time::format_ts;

impl Database {
    /// Record that a browser session is still open.
    pub fn touch_online_user(&self, session_id: &str, user_id: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO online_users (session_id, user_id, last_seen) VALUES (?1, ?2, ?3)
                 ON CONFLICT(session_id) DO UPDATE SET
                     user_id = COALESCE(excluded.user_id, online_users.user_id),
                     last_seen = excluded.last_seen",
                params![session_id, user_id, format_ts(now)],
            )?;
            Ok(())
        })
    }

    /// Sessions seen at or after `since`.
    pub fn count_online_users(&self, since: DateTime<Utc>) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM online_users WHERE last_seen >= ?1",
                [format_ts(since)],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
    }

    pub fn prune_online_users(&self, before: DateTime<Utc>) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM online_users WHERE last_seen < ?1", [format_ts(before)])?;
            Ok(removed)
        })
    }
}
