//! Pairing strategies
//!
//! Distance-weighted mate choice. Every unordered pair of candidates is
//! weighted by its normalized genetic distance `dn = d / d_max`:
//!
//! ```text
//! weight = EPSILON + f * dn + (1 - f) * (1 - dn)
//! ```
//!
//! An inbreeding factor `f` of 0 favours close relatives, 1 favours distant
//! ones. `EPSILON` keeps every pair possible so the bias is soft.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

use crate::error::{ConfigurationError, OperatorError, OperatorResult};
use crate::genome::tick_genome::DistanceMetric;
use crate::operators::traits::PairingStrategy;
use crate::population::individual::Individual;

/// Floor weight given to every pair
pub const PAIR_WEIGHT_EPSILON: f64 = 0.05;

/// Inbreeding-controlled pairing over genetic distance
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistancePairing {
    inbreeding_factor: f64,
    metric: DistanceMetric,
}

impl DistancePairing {
    /// Create a pairing strategy
    pub fn new(inbreeding_factor: f64, metric: DistanceMetric) -> Result<Self, ConfigurationError> {
        if !(0.0..=1.0).contains(&inbreeding_factor) {
            return Err(ConfigurationError::InvalidInbreedingFactor(inbreeding_factor));
        }
        Ok(Self {
            inbreeding_factor,
            metric,
        })
    }

    /// Create from the host's numeric distance selector
    pub fn from_selector(inbreeding_factor: f64, selector: u8) -> Result<Self, ConfigurationError> {
        Self::new(inbreeding_factor, DistanceMetric::from_selector(selector)?)
    }

    /// Inbreeding factor in `[0, 1]`
    pub fn inbreeding_factor(&self) -> f64 {
        self.inbreeding_factor
    }

    /// Distance function
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Selection weight of each pair given its raw distance
    pub fn pair_weights(&self, distances: &[f64]) -> Vec<f64> {
        let max = distances.iter().copied().fold(0.0_f64, f64::max);
        let f = self.inbreeding_factor;
        distances
            .iter()
            .map(|&d| {
                let dn = if max > 0.0 { d / max } else { 0.0 };
                PAIR_WEIGHT_EPSILON + f * dn + (1.0 - f) * (1.0 - dn)
            })
            .collect()
    }

    /// Precompute the weighted pair table for one generation's candidates
    pub fn prepare(&self, candidates: &[&Individual]) -> OperatorResult<PairTable> {
        if candidates.is_empty() {
            return Err(OperatorError::PairingFailed(
                "no candidates to pair".to_string(),
            ));
        }
        if candidates.len() == 1 {
            return Ok(PairTable::single());
        }

        let n = candidates.len();
        let mut pairs = Vec::with_capacity(n * (n - 1) / 2);
        let mut distances = Vec::with_capacity(pairs.capacity());
        for i in 0..n {
            for j in (i + 1)..n {
                pairs.push((i, j));
                distances.push(
                    self.metric
                        .distance(candidates[i].genome(), candidates[j].genome()),
                );
            }
        }

        let weights = self.pair_weights(&distances);
        let index = WeightedIndex::new(&weights)
            .map_err(|e| OperatorError::PairingFailed(e.to_string()))?;
        Ok(PairTable {
            pairs,
            index: Some(index),
        })
    }
}

impl Default for DistancePairing {
    fn default() -> Self {
        Self {
            inbreeding_factor: 0.5,
            metric: DistanceMetric::Euclidean,
        }
    }
}

/// Weighted table of candidate pairs
#[derive(Clone, Debug)]
pub struct PairTable {
    pairs: Vec<(usize, usize)>,
    index: Option<WeightedIndex<f64>>,
}

impl PairTable {
    fn single() -> Self {
        Self {
            pairs: vec![(0, 0)],
            index: None,
        }
    }

    /// Number of distinct pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the table has no pairs
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Draw a pair of candidate indices
    pub fn sample<R: Rng>(&self, rng: &mut R) -> (usize, usize) {
        match &self.index {
            Some(index) => self.pairs[index.sample(rng)],
            // A lone candidate mates with itself
            None => self.pairs[0],
        }
    }
}

/// Draw an index into `distances` using the weighting of `pairing`
pub fn select_pair_index<R: Rng>(
    pairing: &DistancePairing,
    distances: &[f64],
    rng: &mut R,
) -> OperatorResult<usize> {
    let weights = pairing.pair_weights(distances);
    let index =
        WeightedIndex::new(&weights).map_err(|e| OperatorError::PairingFailed(e.to_string()))?;
    Ok(index.sample(rng))
}

/// Closed set of pairing strategies
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Pairing {
    /// Distance-weighted inbreeding control
    Distance(DistancePairing),
}

impl Pairing {
    /// Precompute the pair table for a breeding pool
    pub fn prepare(&self, candidates: &[&Individual]) -> OperatorResult<PairTable> {
        match self {
            Self::Distance(pairing) => pairing.prepare(candidates),
        }
    }
}

impl Default for Pairing {
    fn default() -> Self {
        Self::Distance(DistancePairing::default())
    }
}

impl PairingStrategy for DistancePairing {
    fn select_parents<R: Rng>(
        &self,
        candidates: &[&Individual],
        rng: &mut R,
    ) -> OperatorResult<(usize, usize)> {
        Ok(self.prepare(candidates)?.sample(rng))
    }
}

impl PairingStrategy for Pairing {
    fn select_parents<R: Rng>(
        &self,
        candidates: &[&Individual],
        rng: &mut R,
    ) -> OperatorResult<(usize, usize)> {
        match self {
            Self::Distance(pairing) => pairing.select_parents(candidates, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::tick_genome::TickGenome;
    use crate::population::individual::IndividualId;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn individuals(genomes: &[Vec<i64>]) -> Vec<Individual> {
        genomes
            .iter()
            .enumerate()
            .map(|(i, g)| {
                Individual::with_fitness(IndividualId(i as u64), TickGenome::new(g.clone()), 0, 1.0)
            })
            .collect()
    }

    #[test]
    fn test_invalid_inbreeding_factor() {
        assert_eq!(
            DistancePairing::new(1.5, DistanceMetric::Euclidean),
            Err(ConfigurationError::InvalidInbreedingFactor(1.5))
        );
        assert!(DistancePairing::new(-0.1, DistanceMetric::Manhattan).is_err());
        assert!(DistancePairing::new(0.0, DistanceMetric::Manhattan).is_ok());
        assert!(DistancePairing::new(1.0, DistanceMetric::Manhattan).is_ok());
    }

    #[test]
    fn test_unknown_selector() {
        assert_eq!(
            DistancePairing::from_selector(0.5, 2),
            Err(ConfigurationError::UnknownDistanceMetric(2))
        );
    }

    #[test]
    fn test_weights_favour_close_pairs_when_inbreeding() {
        let pairing = DistancePairing::new(0.0, DistanceMetric::Euclidean).unwrap();
        let weights = pairing.pair_weights(&[1.0, 9.0]);
        assert!(weights[0] > weights[1]);
        assert!(weights[1] > 0.0);
    }

    #[test]
    fn test_weights_favour_distant_pairs_when_outbreeding() {
        let pairing = DistancePairing::new(1.0, DistanceMetric::Euclidean).unwrap();
        let weights = pairing.pair_weights(&[1.0, 9.0]);
        assert!(weights[1] > weights[0]);
    }

    #[test]
    fn test_close_pair_selected_more_often() {
        let pairing = DistancePairing::new(0.0, DistanceMetric::Euclidean).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0usize; 2];
        for _ in 0..2000 {
            counts[select_pair_index(&pairing, &[1.0, 9.0], &mut rng).unwrap()] += 1;
        }
        assert!(counts[0] > counts[1]);
        // The distant pair still gets picked occasionally
        assert!(counts[1] > 0);
    }

    #[test]
    fn test_identical_genomes_pair_uniformly() {
        let pairing = DistancePairing::new(1.0, DistanceMetric::Euclidean).unwrap();
        let weights = pairing.pair_weights(&[0.0, 0.0, 0.0]);
        assert!(weights.iter().all(|&w| (w - weights[0]).abs() < 1e-12));
    }

    #[test]
    fn test_select_parents_distinct_indices() {
        let pop = individuals(&[vec![0, 0], vec![5, 5], vec![9, 9]]);
        let candidates: Vec<&Individual> = pop.iter().collect();
        let pairing = Pairing::default();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let (a, b) = pairing.select_parents(&candidates, &mut rng).unwrap();
            assert!(a < b);
            assert!(b < candidates.len());
        }
    }

    #[test]
    fn test_single_candidate_pairs_with_itself() {
        let pop = individuals(&[vec![1]]);
        let candidates: Vec<&Individual> = pop.iter().collect();
        let mut rng = StdRng::seed_from_u64(0);
        let table = Pairing::default().prepare(&candidates).unwrap();
        assert_eq!(table.sample(&mut rng), (0, 0));
    }

    #[test]
    fn test_empty_candidates_fail() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            Pairing::default().select_parents(&[], &mut rng),
            Err(OperatorError::PairingFailed(_))
        ));
    }

    #[test]
    fn test_pair_table_size() {
        let pop = individuals(&[vec![0], vec![1], vec![2], vec![3]]);
        let candidates: Vec<&Individual> = pop.iter().collect();
        let table = DistancePairing::default().prepare(&candidates).unwrap();
        assert_eq!(table.len(), 6);
    }
}
