//! Crossover strategies
//!
//! Cut-point crossover over tick genomes. Cut indices are drawn uniformly
//! from `[1, L - 1]`, so no cut produces an empty segment.

use rand::Rng;

use crate::error::{ConfigurationError, OperatorError, OperatorResult};
use crate::genome::tick_genome::TickGenome;
use crate::operators::traits::CrossoverStrategy;

fn check_rate(rate: f64) -> Result<f64, ConfigurationError> {
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigurationError::InvalidRate {
            name: "crossover rate",
            value: rate,
        })
    }
}

fn check_lengths(parent1: &TickGenome, parent2: &TickGenome) -> OperatorResult<()> {
    if parent1.len() != parent2.len() {
        return Err(OperatorError::CrossoverFailed(format!(
            "Parent lengths do not match ({} vs {})",
            parent1.len(),
            parent2.len()
        )));
    }
    Ok(())
}

/// Swap the tails of two genomes at `cut`
pub fn single_point_at(
    parent1: &TickGenome,
    parent2: &TickGenome,
    cut: usize,
) -> (TickGenome, TickGenome) {
    let (a, b) = (parent1.ticks(), parent2.ticks());
    let child1 = a[..cut].iter().chain(&b[cut..]).copied().collect();
    let child2 = b[..cut].iter().chain(&a[cut..]).copied().collect();
    (child1, child2)
}

/// Swap the segment `[first, second)` between two genomes
pub fn two_point_at(
    parent1: &TickGenome,
    parent2: &TickGenome,
    first: usize,
    second: usize,
) -> (TickGenome, TickGenome) {
    let mut child1 = parent1.clone();
    let mut child2 = parent2.clone();
    child1.ticks_mut()[first..second].copy_from_slice(&parent2.ticks()[first..second]);
    child2.ticks_mut()[first..second].copy_from_slice(&parent1.ticks()[first..second]);
    (child1, child2)
}

/// Single-point crossover
///
/// One cut index; the tails after it are swapped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SinglePointCrossover {
    rate: f64,
}

impl SinglePointCrossover {
    /// Create a single-point crossover applied with probability `rate`
    pub fn new(rate: f64) -> Result<Self, ConfigurationError> {
        Ok(Self {
            rate: check_rate(rate)?,
        })
    }

    /// Draw a cut index in `[1, len - 1]`
    pub fn cut_point<R: Rng>(len: usize, rng: &mut R) -> Option<usize> {
        (len >= 2).then(|| rng.gen_range(1..len))
    }
}

impl CrossoverStrategy for SinglePointCrossover {
    fn crossover<R: Rng>(
        &self,
        parent1: &TickGenome,
        parent2: &TickGenome,
        rng: &mut R,
    ) -> OperatorResult<(TickGenome, TickGenome)> {
        check_lengths(parent1, parent2)?;
        if rng.gen::<f64>() >= self.rate {
            return Ok((parent1.clone(), parent2.clone()));
        }
        match Self::cut_point(parent1.len(), rng) {
            Some(cut) => Ok(single_point_at(parent1, parent2, cut)),
            None => Ok((parent1.clone(), parent2.clone())),
        }
    }

    fn crossover_probability(&self) -> f64 {
        self.rate
    }
}

/// Two-point crossover
///
/// Two distinct cut indices `i < j`; the middle segment `[i, j)` is swapped.
/// Genomes with fewer than three genes have a single usable cut and fall
/// back to single-point behaviour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TwoPointCrossover {
    rate: f64,
}

impl TwoPointCrossover {
    /// Create a two-point crossover applied with probability `rate`
    pub fn new(rate: f64) -> Result<Self, ConfigurationError> {
        Ok(Self {
            rate: check_rate(rate)?,
        })
    }

    /// Draw two distinct cut indices `i < j` in `[1, len - 1]`
    pub fn cut_points<R: Rng>(len: usize, rng: &mut R) -> Option<(usize, usize)> {
        if len < 3 {
            return None;
        }
        let first = rng.gen_range(1..len);
        let mut second = rng.gen_range(1..len - 1);
        if second >= first {
            second += 1;
        }
        Some((first.min(second), first.max(second)))
    }
}

impl CrossoverStrategy for TwoPointCrossover {
    fn crossover<R: Rng>(
        &self,
        parent1: &TickGenome,
        parent2: &TickGenome,
        rng: &mut R,
    ) -> OperatorResult<(TickGenome, TickGenome)> {
        check_lengths(parent1, parent2)?;
        if rng.gen::<f64>() >= self.rate {
            return Ok((parent1.clone(), parent2.clone()));
        }
        if let Some((first, second)) = Self::cut_points(parent1.len(), rng) {
            return Ok(two_point_at(parent1, parent2, first, second));
        }
        match SinglePointCrossover::cut_point(parent1.len(), rng) {
            Some(cut) => Ok(single_point_at(parent1, parent2, cut)),
            None => Ok((parent1.clone(), parent2.clone())),
        }
    }

    fn crossover_probability(&self) -> f64 {
        self.rate
    }
}

/// Closed set of crossover strategies
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Crossover {
    /// Tail swap at one cut
    SinglePoint(SinglePointCrossover),
    /// Middle-segment swap between two cuts
    TwoPoint(TwoPointCrossover),
}

impl Default for Crossover {
    fn default() -> Self {
        Self::SinglePoint(SinglePointCrossover { rate: 0.9 })
    }
}

impl CrossoverStrategy for Crossover {
    fn crossover<R: Rng>(
        &self,
        parent1: &TickGenome,
        parent2: &TickGenome,
        rng: &mut R,
    ) -> OperatorResult<(TickGenome, TickGenome)> {
        match self {
            Self::SinglePoint(c) => c.crossover(parent1, parent2, rng),
            Self::TwoPoint(c) => c.crossover(parent1, parent2, rng),
        }
    }

    fn crossover_probability(&self) -> f64 {
        match self {
            Self::SinglePoint(c) => c.crossover_probability(),
            Self::TwoPoint(c) => c.crossover_probability(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn parents(len: usize) -> (TickGenome, TickGenome) {
        (
            TickGenome::new(vec![1; len]),
            TickGenome::new(vec![0; len]),
        )
    }

    #[test]
    fn test_invalid_rate() {
        assert_eq!(
            SinglePointCrossover::new(1.1),
            Err(ConfigurationError::InvalidRate {
                name: "crossover rate",
                value: 1.1
            })
        );
        assert!(TwoPointCrossover::new(-0.5).is_err());
        assert!(TwoPointCrossover::new(f64::NAN).is_err());
    }

    #[test]
    fn test_single_point_at() {
        let a = TickGenome::new(vec![1, 2, 3, 4]);
        let b = TickGenome::new(vec![5, 6, 7, 8]);
        let (c1, c2) = single_point_at(&a, &b, 1);
        assert_eq!(c1.ticks(), &[1, 6, 7, 8]);
        assert_eq!(c2.ticks(), &[5, 2, 3, 4]);
    }

    #[test]
    fn test_two_point_at() {
        let a = TickGenome::new(vec![1, 2, 3, 4, 5]);
        let b = TickGenome::new(vec![6, 7, 8, 9, 10]);
        let (c1, c2) = two_point_at(&a, &b, 1, 3);
        assert_eq!(c1.ticks(), &[1, 7, 8, 4, 5]);
        assert_eq!(c2.ticks(), &[6, 2, 3, 9, 10]);
    }

    #[test]
    fn test_single_point_cut_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for len in 2..12 {
            for _ in 0..50 {
                let cut = SinglePointCrossover::cut_point(len, &mut rng).unwrap();
                assert!((1..len).contains(&cut));
            }
        }
        assert_eq!(SinglePointCrossover::cut_point(1, &mut rng), None);
    }

    #[test]
    fn test_two_point_cuts_distinct_and_ordered() {
        let mut rng = StdRng::seed_from_u64(2);
        for len in 3..12 {
            for _ in 0..50 {
                let (i, j) = TwoPointCrossover::cut_points(len, &mut rng).unwrap();
                assert!(i < j);
                assert!(i >= 1 && j <= len - 1);
            }
        }
        assert_eq!(TwoPointCrossover::cut_points(2, &mut rng), None);
    }

    #[test]
    fn test_two_point_cuts_cover_all_pairs() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.insert(TwoPointCrossover::cut_points(5, &mut rng).unwrap());
        }
        // Indices 1..=4 give six unordered pairs
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn test_rate_zero_copies_parents() {
        let mut rng = StdRng::seed_from_u64(3);
        let (a, b) = parents(6);
        let crossover = Crossover::TwoPoint(TwoPointCrossover::new(0.0).unwrap());
        let (c1, c2) = crossover.crossover(&a, &b, &mut rng).unwrap();
        assert_eq!(c1, a);
        assert_eq!(c2, b);
    }

    #[test]
    fn test_rate_one_always_recombines() {
        let mut rng = StdRng::seed_from_u64(4);
        let (a, b) = parents(6);
        let crossover = Crossover::SinglePoint(SinglePointCrossover::new(1.0).unwrap());
        for _ in 0..20 {
            let (c1, c2) = crossover.crossover(&a, &b, &mut rng).unwrap();
            assert_ne!(c1, a);
            // Complementary children
            for i in 0..6 {
                assert_ne!(c1[i], c2[i]);
            }
        }
    }

    #[test]
    fn test_short_genomes_unchanged() {
        let mut rng = StdRng::seed_from_u64(0);
        let (a, b) = parents(1);
        let crossover = Crossover::TwoPoint(TwoPointCrossover::new(1.0).unwrap());
        let (c1, c2) = crossover.crossover(&a, &b, &mut rng).unwrap();
        assert_eq!((c1, c2), (a, b));
    }

    #[test]
    fn test_two_point_length_two_falls_back() {
        let mut rng = StdRng::seed_from_u64(0);
        let a = TickGenome::new(vec![1, 2]);
        let b = TickGenome::new(vec![3, 4]);
        let crossover = TwoPointCrossover::new(1.0).unwrap();
        let (c1, c2) = crossover.crossover(&a, &b, &mut rng).unwrap();
        assert_eq!(c1.ticks(), &[1, 4]);
        assert_eq!(c2.ticks(), &[3, 2]);
    }

    #[test]
    fn test_length_mismatch() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = Crossover::default().crossover(
            &TickGenome::new(vec![1, 2]),
            &TickGenome::new(vec![1]),
            &mut rng,
        );
        assert!(matches!(result, Err(OperatorError::CrossoverFailed(_))));
    }
}
