use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

/// Upper bound on sites in a single ranking.
pub const MAX_SITE_COUNT: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("site_count must be at least 1")]
    ZeroSiteCount,

    #[error("site_count {requested} exceeds the maximum of {max}")]
    TooManySites { requested: i64, max: u32 },

    #[error("vote counts cannot be negative")]
    NegativeVotes,

    #[error("min_votes ({min}) is greater than max_votes ({max})")]
    InvertedRange { min: i64, max: i64 },
}

/// Inclusive bound used when seeding vote counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteRange {
    min: u32,
    max: u32,
}

impl VoteRange {
    pub fn new(min: i64, max: i64) -> Result<Self, GenerationError> {
        if min < 0 || max < 0 {
            return Err(GenerationError::NegativeVotes);
        }
        if min > max {
            return Err(GenerationError::InvertedRange { min, max });
        }
        let clamp = |v: i64| u32::try_from(v).unwrap_or(u32::MAX);
        Ok(Self {
            min: clamp(min),
            max: clamp(max),
        })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn contains(&self, votes: u32) -> bool {
        (self.min..=self.max).contains(&votes)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.random_range(self.min..=self.max)
    }
}

/// Validated parameters for one ranking generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationParams {
    site_count: u32,
    votes: VoteRange,
}

impl GenerationParams {
    pub fn new(site_count: i64, min_votes: i64, max_votes: i64) -> Result<Self, GenerationError> {
        if site_count < 1 {
            return Err(GenerationError::ZeroSiteCount);
        }
        if site_count > i64::from(MAX_SITE_COUNT) {
            return Err(GenerationError::TooManySites {
                requested: site_count,
                max: MAX_SITE_COUNT,
            });
        }
        Ok(Self {
            site_count: site_count as u32,
            votes: VoteRange::new(min_votes, max_votes)?,
        })
    }

    pub fn site_count(&self) -> u32 {
        self.site_count
    }

    pub fn votes(&self) -> VoteRange {
        self.votes
    }
}

impl Default for GenerationParams {
    /// Ten sites seeded with 0..=100 votes.
    fn default() -> Self {
        Self {
            site_count: 10,
            votes: VoteRange { min: 0, max: 100 },
        }
    }
}

/// One entry of a freshly generated ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seeded<T> {
    pub item: T,
    pub votes: u32,
    /// 1-based, ordered by votes descending.
    pub position: u32,
}

/// Pick up to `site_count` of the eligible sites at random and seed each with
/// a vote count from the configured range.
///
/// Shuffle-then-slice: every eligible site has the same chance of being
/// picked, regardless of how it did in earlier rankings. If fewer sites are
/// eligible than requested, all of them are used.
pub fn seed_ranking<T, R>(mut eligible: Vec<T>, params: &GenerationParams, rng: &mut R) -> Vec<Seeded<T>>
where
    R: Rng + ?Sized,
{
    eligible.shuffle(rng);
    eligible.truncate(params.site_count as usize);

    let mut seeded: Vec<(T, u32)> = eligible
        .into_iter()
        .map(|item| {
            let votes = params.votes.sample(rng);
            (item, votes)
        })
        .collect();

    // Stable sort keeps shuffle order among ties.
    seeded.sort_by(|a, b| b.1.cmp(&a.1));

    seeded
        .into_iter()
        .enumerate()
        .map(|(idx, (item, votes))| Seeded {
            item,
            votes,
            position: idx as u32 + 1,
        })
        .collect()
}
