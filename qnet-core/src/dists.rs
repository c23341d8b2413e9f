//! Distributions used by network models: inter-arrival times, job sizes and
//! weighted class selection.
//!
//! Every sampler owns a seeded [`StdRng`], so a model built from the same
//! seeds draws the same sequence of values on every run.

use std::time::Duration;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Exp, Normal};

use crate::error::SimError;
use crate::time::duration_from_secs_f64;

/// Trait for generating arrival patterns.
pub trait ArrivalPattern {
    /// Time until the next arrival.
    fn next_arrival_time(&mut self) -> Duration;
}

/// Poisson arrival process: exponentially distributed inter-arrival times.
#[derive(Debug, Clone)]
pub struct PoissonArrivals {
    mean_interarrival: f64,
    rng: StdRng,
    exp_dist: Exp<f64>,
}

impl PoissonArrivals {
    /// Create a Poisson process whose inter-arrival times have the given
    /// mean, in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] unless the mean is finite and
    /// strictly positive.
    pub fn new(mean_interarrival: f64, seed: u64) -> Result<Self, SimError> {
        if !mean_interarrival.is_finite() || mean_interarrival <= 0.0 {
            return Err(SimError::Configuration(format!(
                "mean inter-arrival time must be positive, got {mean_interarrival}"
            )));
        }
        let exp_dist = Exp::new(1.0 / mean_interarrival)
            .map_err(|e| SimError::Configuration(format!("invalid arrival rate: {e}")))?;

        Ok(Self {
            mean_interarrival,
            rng: StdRng::seed_from_u64(seed),
            exp_dist,
        })
    }

    /// Mean inter-arrival time in seconds.
    pub fn mean_interarrival(&self) -> f64 {
        self.mean_interarrival
    }

    /// Arrivals per second.
    pub fn rate(&self) -> f64 {
        1.0 / self.mean_interarrival
    }
}

impl ArrivalPattern for PoissonArrivals {
    fn next_arrival_time(&mut self) -> Duration {
        let seconds: f64 = self.rng.sample(self.exp_dist);
        // Exp samples are finite and non-negative; an out-of-range value can
        // only come from an absurd mean, which saturates.
        duration_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    }
}

/// Absolute value of a normal draw, `|N(mean, std_dev)|`.
///
/// Job sizes are drawn this way: the mean varies per call (each user class
/// has its own), the spread is shared.
#[derive(Debug, Clone)]
pub struct FoldedNormal {
    std_dev: f64,
    rng: StdRng,
}

impl FoldedNormal {
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] if `std_dev` is negative or not
    /// finite.
    pub fn new(std_dev: f64, seed: u64) -> Result<Self, SimError> {
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(SimError::Configuration(format!(
                "standard deviation must be finite and non-negative, got {std_dev}"
            )));
        }
        Ok(Self {
            std_dev,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// Draw one value around `mean`. The result is never negative.
    pub fn sample(&mut self, mean: f64) -> Result<f64, SimError> {
        if !mean.is_finite() {
            return Err(SimError::Configuration(format!("mean must be finite, got {mean}")));
        }
        let normal = Normal::new(mean, self.std_dev)
            .map_err(|e| SimError::Configuration(format!("invalid normal mean {mean}: {e}")))?;
        Ok(normal.sample(&mut self.rng).abs())
    }
}

/// Picks one of a fixed set of items with the given probabilities.
#[derive(Debug, Clone)]
pub struct WeightedChoice<T> {
    items: Vec<T>,
    index: WeightedIndex<f64>,
    rng: StdRng,
}

impl<T: Clone> WeightedChoice<T> {
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] if there are no items, a weight is
    /// negative or not finite, or all weights are zero.
    pub fn new(choices: impl IntoIterator<Item = (T, f64)>, seed: u64) -> Result<Self, SimError> {
        let (items, weights): (Vec<T>, Vec<f64>) = choices.into_iter().unzip();
        if let Some(bad) = weights.iter().find(|w| !w.is_finite()) {
            return Err(SimError::Configuration(format!("weight must be finite, got {bad}")));
        }
        let index = WeightedIndex::new(&weights)
            .map_err(|e| SimError::Configuration(format!("invalid weights: {e}")))?;
        Ok(Self {
            items,
            index,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn choose(&mut self) -> T {
        self.items[self.index.sample(&mut self.rng)].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poisson_arrivals_creation() {
        let pattern = PoissonArrivals::new(0.5, 1).unwrap();
        assert_eq!(pattern.mean_interarrival(), 0.5);
        assert_eq!(pattern.rate(), 2.0);
    }

    #[test]
    fn test_poisson_arrivals_invalid_mean() {
        assert!(matches!(
            PoissonArrivals::new(0.0, 1),
            Err(SimError::Configuration(_))
        ));
        assert!(PoissonArrivals::new(-1.0, 1).is_err());
        assert!(PoissonArrivals::new(f64::NAN, 1).is_err());
    }

    #[test]
    fn test_poisson_arrivals_mean_is_close() {
        let mut pattern = PoissonArrivals::new(0.1, 7).unwrap();
        let n = 20_000;
        let total: f64 = (0..n)
            .map(|_| pattern.next_arrival_time().as_secs_f64())
            .sum();
        let mean = total / n as f64;
        assert!((mean - 0.1).abs() < 0.01, "sample mean {mean}");
    }

    #[test]
    fn test_poisson_arrivals_are_seeded() {
        let mut a = PoissonArrivals::new(1.0, 99).unwrap();
        let mut b = PoissonArrivals::new(1.0, 99).unwrap();
        for _ in 0..50 {
            assert_eq!(a.next_arrival_time(), b.next_arrival_time());
        }
    }

    #[test]
    fn test_folded_normal_is_non_negative() {
        let mut dist = FoldedNormal::new(1.0, 3).unwrap();
        for _ in 0..1_000 {
            // Mean at zero folds half of the mass over.
            assert!(dist.sample(0.0).unwrap() >= 0.0);
        }
    }

    #[test]
    fn test_folded_normal_zero_spread_returns_mean() {
        let mut dist = FoldedNormal::new(0.0, 3).unwrap();
        assert_eq!(dist.sample(12.5).unwrap(), 12.5);
        assert_eq!(dist.sample(-4.0).unwrap(), 4.0);
    }

    #[test]
    fn test_folded_normal_rejects_bad_parameters() {
        assert!(FoldedNormal::new(-1.0, 0).is_err());
        assert!(FoldedNormal::new(f64::INFINITY, 0).is_err());
        let mut dist = FoldedNormal::new(1.0, 0).unwrap();
        assert!(dist.sample(f64::NAN).is_err());
    }

    #[test]
    fn test_weighted_choice_frequencies() {
        let mut choice = WeightedChoice::new([("a", 0.5), ("b", 0.3), ("c", 0.2)], 11).unwrap();
        let n = 20_000;
        let mut counts = [0usize; 3];
        for _ in 0..n {
            match choice.choose() {
                "a" => counts[0] += 1,
                "b" => counts[1] += 1,
                _ => counts[2] += 1,
            }
        }
        let freq = |c: usize| c as f64 / n as f64;
        assert!((freq(counts[0]) - 0.5).abs() < 0.02);
        assert!((freq(counts[1]) - 0.3).abs() < 0.02);
        assert!((freq(counts[2]) - 0.2).abs() < 0.02);
    }

    #[test]
    fn test_weighted_choice_zero_weight_never_chosen() {
        let mut choice = WeightedChoice::new([(1u8, 0.0), (2u8, 1.0)], 5).unwrap();
        for _ in 0..100 {
            assert_eq!(choice.choose(), 2);
        }
    }

    #[test]
    fn test_weighted_choice_rejects_bad_weights() {
        assert!(WeightedChoice::<u8>::new([], 0).is_err());
        assert!(WeightedChoice::new([(1u8, 0.0), (2u8, 0.0)], 0).is_err());
        assert!(WeightedChoice::new([(1u8, -0.5), (2u8, 1.0)], 0).is_err());
        assert!(WeightedChoice::new([(1u8, f64::NAN)], 0).is_err());
    }
}
