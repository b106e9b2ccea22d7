use rand::Rng;

/// Bounds for the cosmetic offset added to the displayed online count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrganicRange {
    pub min: u32,
    pub max: u32,
}

impl OrganicRange {
    /// Swaps inverted bounds rather than failing.
    pub fn new(min: u32, max: u32) -> Self {
        if min <= max { Self { min, max } } else { Self { min: max, max: min } }
    }
}

pub fn generate_organic_value<R: Rng + ?Sized>(range: OrganicRange, rng: &mut R) -> u32 {
    rng.random_range(range.min..=range.max)
}

/// Count shown to visitors: live sessions plus the organic offset.
pub fn displayed_online_count(active_sessions: u64, organic: u32) -> u64 {
    active_sessions.saturating_add(u64::from(organic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn organic_value_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(5);
        let range = OrganicRange::new(40, 10);
        assert_eq!(range, OrganicRange { min: 10, max: 40 });

        for _ in 0..100 {
            let v = generate_organic_value(range, &mut rng);
            assert!((10..=40).contains(&v));
        }
    }

    #[test]
    fn default_range_adds_nothing() {
        let mut rng = StdRng::seed_from_u64(5);
        let organic = generate_organic_value(OrganicRange::default(), &mut rng);
        assert_eq!(displayed_online_count(7, organic), 7);
    }
}
