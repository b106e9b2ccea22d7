use anyhow::Result;
use betrank_core::voting::{VoteRejection, VoteTally, day_bounds, remaining_votes};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::debug;

use crate::Database;
use crate::time::format_ts;

/// Result of a vote attempt that reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded { votes: i64, remaining: u32 },
    Rejected(VoteRejection),
}

/// Who cast a vote and from where.
#[derive(Debug, Clone, Copy)]
pub struct Voter<'a> {
    pub user_id: &'a str,
    pub ip: Option<&'a str>,
}

impl Database {
    /// Record a vote and bump the site's counter.
    ///
    /// Existence checks, the per-day rules, the insert and the increment share
    /// one immediate transaction, so two concurrent votes from the same user
    /// cannot both pass the checks.
    pub fn register_vote(
        &self,
        vote_id: &str,
        ranking_id: &str,
        site_id: &str,
        voter: Voter<'_>,
        now: DateTime<Utc>,
    ) -> Result<VoteOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let category_id: Option<String> = tx
                .query_row(
                    "SELECT category_id FROM daily_rankings WHERE id = ?1",
                    [ranking_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(category_id) = category_id else {
                return Ok(VoteOutcome::Rejected(VoteRejection::RankingNotFound));
            };

            let listed: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM ranked_sites WHERE ranking_id = ?1 AND site_id = ?2)",
                [ranking_id, site_id],
                |row| row.get(0),
            )?;
            if !listed {
                return Ok(VoteOutcome::Rejected(VoteRejection::SiteNotInRanking));
            }

            let (start, end) = day_bounds(now);
            let (start, end) = (format_ts(start), format_ts(end));

            let already_voted_site: bool = tx.query_row(
                "SELECT EXISTS(
                     SELECT 1 FROM votes v
                     JOIN daily_rankings r ON r.id = v.ranking_id
                     WHERE v.user_id = ?1 AND v.site_id = ?2 AND r.category_id = ?3
                       AND v.voted_at >= ?4 AND v.voted_at < ?5
                 )",
                params![voter.user_id, site_id, category_id, start, end],
                |row| row.get(0),
            )?;
            let tally = VoteTally {
                votes_today: count_votes(&tx, voter.user_id, ranking_id, &start, &end)?,
                already_voted_site,
            };

            if let Err(rejection) = tally.check() {
                debug!("Vote by {} on {} rejected: {}", voter.user_id, ranking_id, rejection);
                return Ok(VoteOutcome::Rejected(rejection));
            }

            tx.execute(
                "INSERT INTO votes (id, user_id, ranking_id, site_id, voted_at, ip)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![vote_id, voter.user_id, ranking_id, site_id, format_ts(now), voter.ip],
            )?;
            increment_site_votes(&tx, ranking_id, site_id)?;

            let votes: i64 = tx.query_row(
                "SELECT votes FROM ranked_sites WHERE ranking_id = ?1 AND site_id = ?2",
                [ranking_id, site_id],
                |row| row.get(0),
            )?;

            tx.commit()?;
            Ok(VoteOutcome::Recorded {
                votes,
                remaining: remaining_votes(tally.votes_today + 1),
            })
        })
    }

    /// Add one vote to a ranked site. Returns false if the pair is unknown.
    pub fn increment_site_votes(&self, ranking_id: &str, site_id: &str) -> Result<bool> {
        self.with_conn(|conn| increment_site_votes(conn, ranking_id, site_id))
    }

    /// Votes the user may still cast on this ranking today.
    pub fn votes_remaining(&self, ranking_id: &str, user_id: &str, now: DateTime<Utc>) -> Result<u32> {
        self.with_conn(|conn| {
            let (start, end) = day_bounds(now);
            let used = count_votes(conn, user_id, ranking_id, &format_ts(start), &format_ts(end))?;
            Ok(remaining_votes(used))
        })
    }
}

fn increment_site_votes(conn: &Connection, ranking_id: &str, site_id: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE ranked_sites SET votes = votes + 1 WHERE ranking_id = ?1 AND site_id = ?2",
        [ranking_id, site_id],
    )?;
    Ok(changed > 0)
}

fn count_votes(conn: &Connection, user_id: &str, ranking_id: &str, start: &str, end: &str) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM votes
         WHERE user_id = ?1 AND ranking_id = ?2 AND voted_at >= ?3 AND voted_at < ?4",
        [user_id, ranking_id, start, end],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{add_category, add_site, at, db};
    use betrank_core::generation::GenerationParams;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct Fixture {
        db: Database,
        category: String,
        ranking: String,
        sites: Vec<String>,
    }

    fn fixture() -> Fixture {
        let db = db();
        db.create_profile("u1", "alice", "hash", "user").unwrap();
        db.create_profile("u2", "bob", "hash", "user").unwrap();
        let category = add_category(&db, "Poker");
        let sites = ["Ace", "Bet", "Cue", "Dealer", "Eight"]
            .iter()
            .map(|n| add_site(&db, n, &["Poker"]))
            .collect();
        let ranking = generate(&db, &category);
        Fixture { db, category, ranking, sites }
    }

    fn generate(db: &Database, category: &str) -> String {
        let params = GenerationParams::new(10, 0, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        db.generate_daily_ranking(category, &params, at(2024, 6, 1, 0), &mut rng)
            .unwrap()
            .unwrap()
    }

    fn vote(f: &Fixture, user: &str, site: usize, now: DateTime<Utc>) -> VoteOutcome {
        vote_on(f, &f.ranking, user, site, now)
    }

    fn vote_on(f: &Fixture, ranking: &str, user: &str, site: usize, now: DateTime<Utc>) -> VoteOutcome {
        let voter = Voter { user_id: user, ip: Some("127.0.0.1") };
        f.db.register_vote(&uuid::Uuid::new_v4().to_string(), ranking, &f.sites[site], voter, now)
            .unwrap()
    }

    #[test]
    fn three_votes_per_day_then_reset() {
        let f = fixture();
        let day = at(2024, 6, 1, 9);

        assert_eq!(vote(&f, "u1", 0, day), VoteOutcome::Recorded { votes: 1, remaining: 2 });
        assert_eq!(vote(&f, "u1", 1, day), VoteOutcome::Recorded { votes: 1, remaining: 1 });
        assert_eq!(vote(&f, "u1", 2, day), VoteOutcome::Recorded { votes: 1, remaining: 0 });
        assert_eq!(vote(&f, "u1", 3, day), VoteOutcome::Rejected(VoteRejection::LimitReached));

        let next_day = at(2024, 6, 2, 9);
        assert_eq!(vote(&f, "u1", 0, next_day), VoteOutcome::Recorded { votes: 2, remaining: 2 });
    }

    #[test]
    fn same_site_twice_in_a_day_is_rejected() {
        let f = fixture();
        let day = at(2024, 6, 1, 9);

        assert!(matches!(vote(&f, "u1", 0, day), VoteOutcome::Recorded { .. }));
        assert_eq!(vote(&f, "u1", 0, at(2024, 6, 1, 23)), VoteOutcome::Rejected(VoteRejection::AlreadyVotedToday));

        // Another user is unaffected.
        assert_eq!(vote(&f, "u2", 0, day), VoteOutcome::Recorded { votes: 2, remaining: 2 });
    }

    #[test]
    fn duplicate_check_spans_rankings_of_the_category() {
        let f = fixture();
        let day = at(2024, 6, 1, 9);
        let newer = generate(&f.db, &f.category);

        assert!(matches!(vote(&f, "u1", 0, day), VoteOutcome::Recorded { .. }));
        assert_eq!(
            vote_on(&f, &newer, "u1", 0, day),
            VoteOutcome::Rejected(VoteRejection::AlreadyVotedToday)
        );
        assert!(matches!(vote_on(&f, &newer, "u1", 1, day), VoteOutcome::Recorded { .. }));
    }

    #[test]
    fn unknown_ranking_or_site_is_rejected() {
        let f = fixture();
        let voter = Voter { user_id: "u1", ip: None };
        let now = at(2024, 6, 1, 9);

        let outcome = f.db.register_vote("v1", "nope", &f.sites[0], voter, now).unwrap();
        assert_eq!(outcome, VoteOutcome::Rejected(VoteRejection::RankingNotFound));

        let outcome = f.db.register_vote("v2", &f.ranking, "nope", voter, now).unwrap();
        assert_eq!(outcome, VoteOutcome::Rejected(VoteRejection::SiteNotInRanking));
    }

    #[test]
    fn remaining_counts_down_and_increment_is_monotonic() {
        let f = fixture();
        let day = at(2024, 6, 1, 9);

        assert_eq!(f.db.votes_remaining(&f.ranking, "u1", day).unwrap(), 3);
        vote(&f, "u1", 0, day);
        assert_eq!(f.db.votes_remaining(&f.ranking, "u1", day).unwrap(), 2);

        assert!(f.db.increment_site_votes(&f.ranking, &f.sites[0]).unwrap());
        assert!(!f.db.increment_site_votes(&f.ranking, "nope").unwrap());

        let snap = f.db.get_ranking(&f.ranking).unwrap().unwrap();
        assert_eq!(snap.entries[0].site_id, f.sites[0]);
        assert_eq!(snap.entries[0].votes, 2);
    }
}
