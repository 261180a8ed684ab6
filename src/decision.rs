use rand::Rng;

/// Outcome of sampling one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub keep: bool,
    /// Rate actually applied, at least 1. Kept records stand in for this many originals.
    pub rate: u32,
}

// Keeps one in `rate` records on average. Rates below 1 are treated as 1.
pub fn decide<R: Rng>(rate: u32, rng: &mut R) -> Decision {
    let rate = rate.max(1);
    Decision {
        keep: rng.random_range(0..rate) == 0,
        rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn rate_one_always_keeps() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!((0..1000).all(|_| decide(1, &mut rng).keep));
    }

    #[test]
    fn zero_rate_is_clamped() {
        let mut rng = StdRng::seed_from_u64(2);
        let decision = decide(0, &mut rng);
        assert_eq!(decision, Decision { keep: true, rate: 1 });
    }

    #[test]
    fn keep_fraction_tracks_rate() {
        let mut rng = StdRng::seed_from_u64(3);
        let trials = 100_000;
        for rate in [2u32, 10, 50] {
            let kept = (0..trials).filter(|_| decide(rate, &mut rng).keep).count();
            let expected = trials as f64 / rate as f64;
            // at least 5 binomial standard deviations
            let tolerance = 5.0 * expected.sqrt();
            assert!(
                (kept as f64 - expected).abs() < tolerance,
                "rate {rate}: kept {kept}, expected {expected}"
            );
        }
    }
}
