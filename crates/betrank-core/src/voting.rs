use chrono::{DateTime, Days, NaiveTime, Utc};
use thiserror::Error;

/// Daily vote allowance per user per ranking.
pub const MAX_VOTES_PER_RANKING_PER_DAY: u32 = 3;

/// Why a vote was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VoteRejection {
    #[error("Ranking not found")]
    RankingNotFound,

    #[error("Site is not part of this ranking")]
    SiteNotInRanking,

    #[error("You already voted for this site today")]
    AlreadyVotedToday,

    #[error("Daily vote limit reached for this ranking")]
    LimitReached,
}

/// What the store already knows about a user's votes for the current day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTally {
    /// Votes the user cast on this ranking today.
    pub votes_today: u32,
    /// Whether the user voted for the same site in the same category today.
    pub already_voted_site: bool,
}

impl VoteTally {
    pub fn check(&self) -> Result<(), VoteRejection> {
        if self.already_voted_site {
            return Err(VoteRejection::AlreadyVotedToday);
        }
        if self.votes_today >= MAX_VOTES_PER_RANKING_PER_DAY {
            return Err(VoteRejection::LimitReached);
        }
        Ok(())
    }

    /// Remaining allowance after the tallied votes.
    pub fn remaining(&self) -> u32 {
        remaining_votes(self.votes_today)
    }
}

pub fn remaining_votes(votes_today: u32) -> u32 {
    MAX_VOTES_PER_RANKING_PER_DAY.saturating_sub(votes_today)
}

/// Half-open `[start, end)` bounds of the UTC calendar day containing `now`.
pub fn day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let end = start
        .checked_add_days(Days::new(1))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn allows_votes_under_the_cap() {
        for votes_today in 0..MAX_VOTES_PER_RANKING_PER_DAY {
            let tally = VoteTally { votes_today, already_voted_site: false };
            assert_eq!(tally.check(), Ok(()));
        }
    }

    #[test]
    fn rejects_fourth_vote() {
        let tally = VoteTally { votes_today: 3, already_voted_site: false };
        assert_eq!(tally.check(), Err(VoteRejection::LimitReached));
        assert_eq!(tally.remaining(), 0);
    }

    #[test]
    fn duplicate_site_wins_over_limit() {
        let tally = VoteTally { votes_today: 3, already_voted_site: true };
        assert_eq!(tally.check(), Err(VoteRejection::AlreadyVotedToday));
    }

    #[test]
    fn day_bounds_cover_the_calendar_day() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 59).unwrap();
        let (start, end) = day_bounds(now);

        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap());
        assert!(start <= now && now < end);
    }
}
