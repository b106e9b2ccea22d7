use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{OptionalExtension, params};

use crate::Database;
use crate::models::{RankingRow, RankingSnapshot, SharedRankingRow};
use crate::rankings::ranked_sites;
use crate::time::format_ts;

impl Database {
    /// Create a share link for a ranking. Returns None for an unknown ranking.
    pub fn create_share(
        &self,
        id: &str,
        ranking_id: &str,
        shared_by: Option<&str>,
        token: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Option<SharedRankingRow>> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM daily_rankings WHERE id = ?1)",
                [ranking_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(None);
            }

            let row = SharedRankingRow {
                id: id.to_string(),
                ranking_id: ranking_id.to_string(),
                shared_by: shared_by.map(str::to_string),
                token: token.to_string(),
                shared_at: format_ts(now),
                expires_at: format_ts(now + ttl),
            };
            conn.execute(
                "INSERT INTO shared_rankings (id, ranking_id, shared_by, token, shared_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![row.id, row.ranking_id, row.shared_by, row.token, row.shared_at, row.expires_at],
            )?;
            Ok(Some(row))
        })
    }

    /// The ranking behind a share token, if the link has not expired.
    pub fn resolve_share(&self, token: &str, now: DateTime<Utc>) -> Result<Option<RankingSnapshot>> {
        self.with_conn(|conn| {
            let ranking = conn
                .query_row(
                    "SELECT r.id, r.category_id, r.category_name, r.generated_at, r.expires_at
                     FROM shared_rankings s
                     JOIN daily_rankings r ON r.id = s.ranking_id
                     WHERE s.token = ?1 AND s.expires_at > ?2",
                    params![token, format_ts(now)],
                    |row| {
                        Ok(RankingRow {
                            id: row.get(0)?,
                            category_id: row.get(1)?,
                            category_name: row.get(2)?,
                            generated_at: row.get(3)?,
                            expires_at: row.get(4)?,
                        })
                    },
                )
                .optional()?;

            let Some(ranking) = ranking else {
                return Ok(None);
            };
            let entries = ranked_sites(conn, &ranking.id)?;
            Ok(Some(RankingSnapshot { ranking, entries }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{add_category, add_site, at, db};
    use betrank_core::generation::GenerationParams;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn share_resolves_until_expiry() {
        let db = db();
        let cat = add_category(&db, "Poker");
        add_site(&db, "Ace", &["Poker"]);
        let mut rng = StdRng::seed_from_u64(1);
        let ranking = db
            .generate_daily_ranking(&cat, &GenerationParams::new(3, 1, 9).unwrap(), at(2024, 6, 1, 0), &mut rng)
            .unwrap()
            .unwrap();

        let share = db
            .create_share("s1", &ranking, None, "tok", at(2024, 6, 1, 0), Duration::hours(48))
            .unwrap()
            .unwrap();
        assert_eq!(share.expires_at, "2024-06-03 00:00:00");

        let snap = db.resolve_share("tok", at(2024, 6, 2, 23)).unwrap().unwrap();
        assert_eq!(snap.ranking.id, ranking);
        assert_eq!(snap.entries.len(), 1);

        assert!(db.resolve_share("tok", at(2024, 6, 3, 0)).unwrap().is_none());
        assert!(db.resolve_share("other", at(2024, 6, 1, 1)).unwrap().is_none());
    }

    #[test]
    fn sharing_unknown_ranking_returns_none() {
        let db = db();
        let share = db
            .create_share("s1", "missing", None, "tok", at(2024, 6, 1, 0), Duration::hours(1))
            .unwrap();
        assert!(share.is_none());
    }
}
