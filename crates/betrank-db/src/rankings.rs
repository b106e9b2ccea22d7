use anyhow::Result;
use betrank_core::generation::{GenerationParams, seed_ranking};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::Database;
use crate::categories::{list_categories, query_category};
use crate::models::{RankedSiteRow, RankingConfigRow, RankingRow, RankingSnapshot};
use crate::sites::sites_in_category;
use crate::time::format_ts;

/// How long a generated ranking is advertised as current.
pub const RANKING_LIFETIME_HOURS: i64 = 24;

const RANKING_COLUMNS: &str = "id, category_id, category_name, generated_at, expires_at";

/// Outcome of regenerating every category.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// `(category_id, ranking_id)`
    pub generated: Vec<(String, String)>,
    /// `(category_id, reason)`
    pub failed: Vec<(String, String)>,
}

impl Database {
    /// Generate a new ranking snapshot for a category.
    ///
    /// Returns None when the category does not exist. Earlier rankings of the
    /// category are left untouched; readers pick the newest.
    pub fn generate_daily_ranking<R: Rng + ?Sized>(
        &self,
        category_id: &str,
        params: &GenerationParams,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Option<String>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let Some(category) = query_category(&tx, category_id)? else {
                debug!("Ranking requested for unknown category {}", category_id);
                return Ok(None);
            };

            let eligible = sites_in_category(&tx, &category.name)?;
            let eligible_count = eligible.len();
            let seeded = seed_ranking(eligible, params, rng);

            let ranking_id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO daily_rankings (id, category_id, category_name, generated_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    ranking_id,
                    category.id,
                    category.name,
                    format_ts(now),
                    format_ts(now + Duration::hours(RANKING_LIFETIME_HOURS)),
                ],
            )?;

            {
                let mut insert = tx.prepare(
                    "INSERT INTO ranked_sites
                        (ranking_id, site_id, site_name, site_url, site_logo_url, site_description, votes, position)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for entry in &seeded {
                    let site = &entry.item;
                    insert.execute(params![
                        ranking_id,
                        site.id,
                        site.name,
                        site.url,
                        site.logo_url,
                        site.description,
                        entry.votes,
                        entry.position,
                    ])?;
                }
            }

            tx.commit()?;
            info!(
                "Generated ranking {} for '{}': {} of {} eligible sites",
                ranking_id,
                category.name,
                seeded.len(),
                eligible_count
            );
            Ok(Some(ranking_id))
        })
    }

    /// Regenerate every category, each with its stored config or `defaults`.
    /// A failing category is logged and skipped; the others still run.
    pub fn regenerate_all_rankings<R: Rng + ?Sized>(
        &self,
        defaults: &GenerationParams,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<BatchReport> {
        let categories = self.with_conn(list_categories)?;
        let mut report = BatchReport::default();

        for category in categories {
            let outcome = match self.generation_params(&category.id, defaults) {
                Ok(params) => self.generate_daily_ranking(&category.id, &params, now, &mut *rng),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(Some(ranking_id)) => report.generated.push((category.id, ranking_id)),
                // Deleted between listing and generating.
                Ok(None) => report.failed.push((category.id, "category not found".into())),
                Err(e) => {
                    warn!("Ranking generation failed for '{}': {}", category.name, e);
                    report.failed.push((category.id, e.to_string()));
                }
            }
        }

        info!(
            "Batch ranking run: {} generated, {} failed",
            report.generated.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Stored parameters for a category, falling back to `defaults`.
    pub fn generation_params(&self, category_id: &str, defaults: &GenerationParams) -> Result<GenerationParams> {
        match self.get_ranking_config(category_id)? {
            Some(cfg) => Ok(GenerationParams::new(cfg.site_count, cfg.min_votes, cfg.max_votes)?),
            None => Ok(*defaults),
        }
    }

    pub fn get_ranking(&self, id: &str) -> Result<Option<RankingSnapshot>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {RANKING_COLUMNS} FROM daily_rankings WHERE id = ?1");
            let ranking = conn.query_row(&sql, [id], ranking_from_row).optional()?;
            ranking.map(|r| snapshot(conn, r)).transpose()
        })
    }

    pub fn latest_ranking_for_category(&self, category_id: &str) -> Result<Option<RankingSnapshot>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {RANKING_COLUMNS} FROM daily_rankings
                 WHERE category_id = ?1
                 ORDER BY generated_at DESC, rowid DESC
                 LIMIT 1"
            );
            let ranking = conn.query_row(&sql, [category_id], ranking_from_row).optional()?;
            ranking.map(|r| snapshot(conn, r)).transpose()
        })
    }

    /// Newest ranking of each category, in category order.
    pub fn list_latest_rankings(&self) -> Result<Vec<RankingSnapshot>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.category_id, r.category_name, r.generated_at, r.expires_at
                 FROM daily_rankings r
                 JOIN ranking_categories c ON c.id = r.category_id
                 WHERE r.rowid = (
                     SELECT r2.rowid FROM daily_rankings r2
                     WHERE r2.category_id = r.category_id
                     ORDER BY r2.generated_at DESC, r2.rowid DESC
                     LIMIT 1
                 )
                 ORDER BY c.position",
            )?;
            let rankings = stmt
                .query_map([], ranking_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rankings.into_iter().map(|r| snapshot(conn, r)).collect()
        })
    }

    pub fn get_ranking_config(&self, category_id: &str) -> Result<Option<RankingConfigRow>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT category_id, site_count, min_votes, max_votes, updated_at
                     FROM ranking_configs WHERE category_id = ?1",
                    [category_id],
                    |row| {
                        Ok(RankingConfigRow {
                            category_id: row.get(0)?,
                            site_count: row.get(1)?,
                            min_votes: row.get(2)?,
                            max_votes: row.get(3)?,
                            updated_at: row.get(4)?,
                        })
                    },
                )
                .optional()?)
        })
    }

    pub fn upsert_ranking_config(&self, category_id: &str, params: &GenerationParams) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO ranking_configs (category_id, site_count, min_votes, max_votes)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(category_id) DO UPDATE SET
                     site_count = excluded.site_count,
                     min_votes = excluded.min_votes,
                     max_votes = excluded.max_votes,
                     updated_at = datetime('now')",
                params![
                    category_id,
                    params.site_count(),
                    params.votes().min(),
                    params.votes().max(),
                ],
            )?;
            Ok(())
        })
    }
}

fn snapshot(conn: &Connection, ranking: RankingRow) -> Result<RankingSnapshot> {
    let entries = ranked_sites(conn, &ranking.id)?;
    Ok(RankingSnapshot { ranking, entries })
}

/// Entries by current votes; positions are renumbered to the standing.
pub(crate) fn ranked_sites(conn: &Connection, ranking_id: &str) -> Result<Vec<RankedSiteRow>> {
    let mut stmt = conn.prepare(
        "SELECT site_id, site_name, site_url, site_logo_url, site_description, votes, position
         FROM ranked_sites
         WHERE ranking_id = ?1
         ORDER BY votes DESC, position ASC",
    )?;
    let rows = stmt
        .query_map([ranking_id], |row| {
            Ok(RankedSiteRow {
                site_id: row.get(0)?,
                site_name: row.get(1)?,
                site_url: row.get(2)?,
                site_logo_url: row.get(3)?,
                site_description: row.get(4)?,
                votes: row.get(5)?,
                position: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(idx, mut row)| {
            row.position = idx as i64 + 1;
            row
        })
        .collect())
}

fn ranking_from_row(row: &Row<'_>) -> rusqlite::Result<RankingRow> {
    Ok(RankingRow {
        id: row.get(0)?,
        category_id: row.get(1)?,
        category_name: row.get(2)?,
        generated_at: row.get(3)?,
        expires_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{add_category, add_site, at, db};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn poker_with_four_sites_yields_four_entries() {
        let db = db();
        let poker = add_category(&db, "Poker");
        for name in ["Ace", "Bet", "Cue", "Dealer"] {
            add_site(&db, name, &["Poker"]);
        }
        add_site(&db, "Elsewhere", &["Casino"]);

        let params = GenerationParams::new(10, 0, 100).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let id = db
            .generate_daily_ranking(&poker, &params, at(2024, 6, 1, 12), &mut rng)
            .unwrap()
            .unwrap();

        let snap = db.get_ranking(&id).unwrap().unwrap();
        assert_eq!(snap.ranking.category_name, "Poker");
        assert_eq!(snap.ranking.generated_at, "2024-06-01 12:00:00");
        assert_eq!(snap.ranking.expires_at, "2024-06-02 12:00:00");
        assert_eq!(snap.entries.len(), 4);
        assert!(snap.entries.iter().all(|e| (0..=100).contains(&e.votes)));
        assert!(snap.entries.iter().all(|e| e.site_name != "Elsewhere"));
        assert_eq!(
            snap.entries.iter().map(|e| e.position).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn never_exceeds_site_count() {
        let db = db();
        let cat = add_category(&db, "Casino");
        for i in 0..12 {
            add_site(&db, &format!("Site{i}"), &["Casino"]);
        }

        let params = GenerationParams::new(5, 10, 20).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let id = db
            .generate_daily_ranking(&cat, &params, at(2024, 6, 1, 0), &mut rng)
            .unwrap()
            .unwrap();

        let snap = db.get_ranking(&id).unwrap().unwrap();
        assert_eq!(snap.entries.len(), 5);
        assert!(snap.entries.iter().all(|e| (10..=20).contains(&e.votes)));
    }

    #[test]
    fn unknown_category_is_a_noop() {
        let db = db();
        let params = GenerationParams::new(5, 0, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(2);

        let result = db
            .generate_daily_ranking("missing", &params, at(2024, 6, 1, 0), &mut rng)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn newer_generation_supersedes_but_keeps_history() {
        let db = db();
        let cat = add_category(&db, "Poker");
        add_site(&db, "Ace", &["Poker"]);
        let params = GenerationParams::new(5, 0, 10).unwrap();
        let mut rng = StdRng::seed_from_u64(4);

        let first = db
            .generate_daily_ranking(&cat, &params, at(2024, 6, 1, 0), &mut rng)
            .unwrap()
            .unwrap();
        let second = db
            .generate_daily_ranking(&cat, &params, at(2024, 6, 2, 0), &mut rng)
            .unwrap()
            .unwrap();

        let latest = db.latest_ranking_for_category(&cat).unwrap().unwrap();
        assert_eq!(latest.ranking.id, second);
        assert!(db.get_ranking(&first).unwrap().is_some());

        let all = db.list_latest_rankings().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].ranking.id, second);
    }

    #[test]
    fn batch_uses_configs_and_continues_past_failures() {
        let db = db();
        let poker = add_category(&db, "Poker");
        let casino = add_category(&db, "Casino");
        for i in 0..6 {
            add_site(&db, &format!("P{i}"), &["Poker"]);
            add_site(&db, &format!("C{i}"), &["Casino"]);
        }
        db.upsert_ranking_config(&poker, &GenerationParams::new(2, 5, 5).unwrap())
            .unwrap();
        // A config row that no longer validates fails only its own category.
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO ranking_configs (category_id, site_count, min_votes, max_votes) VALUES (?1, 3, 9, 1)",
                [&casino],
            )?;
            Ok(())
        })
        .unwrap();

        let defaults = GenerationParams::new(4, 0, 100).unwrap();
        let mut rng = StdRng::seed_from_u64(8);
        let report = db
            .regenerate_all_rankings(&defaults, at(2024, 6, 1, 0), &mut rng)
            .unwrap();

        assert_eq!(report.generated.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, casino);

        let snap = db.latest_ranking_for_category(&poker).unwrap().unwrap();
        assert_eq!(snap.entries.len(), 2);
        assert!(snap.entries.iter().all(|e| e.votes == 5));
    }

    #[test]
    fn config_upsert_overwrites() {
        let db = db();
        let cat = add_category(&db, "Poker");
        let defaults = GenerationParams::new(10, 0, 100).unwrap();

        assert_eq!(db.generation_params(&cat, &defaults).unwrap(), defaults);

        db.upsert_ranking_config(&cat, &GenerationParams::new(3, 1, 2).unwrap()).unwrap();
        db.upsert_ranking_config(&cat, &GenerationParams::new(7, 50, 60).unwrap()).unwrap();

        let cfg = db.get_ranking_config(&cat).unwrap().unwrap();
        assert_eq!((cfg.site_count, cfg.min_votes, cfg.max_votes), (7, 50, 60));
    }
}
