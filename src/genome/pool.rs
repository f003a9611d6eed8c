//! Gene pool
//!
//! The ordered set of genes defining one run's search space. Genome position
//! `i` always refers to `genes[i]`.

use std::collections::HashSet;

use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::gene::{Gene, Tick};
use super::tick_genome::TickGenome;
use crate::error::{ConfigurationError, EncodingError};

/// Ordered collection of genes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenePool {
    genes: Vec<Gene>,
}

impl GenePool {
    /// Create a gene pool, rejecting empty pools and duplicate identifiers
    pub fn new(genes: Vec<Gene>) -> Result<Self, ConfigurationError> {
        if genes.is_empty() {
            return Err(ConfigurationError::EmptyGenePool);
        }
        let mut seen = HashSet::new();
        for gene in &genes {
            if !seen.insert(gene.id.as_str()) {
                return Err(ConfigurationError::DuplicateGene(gene.id.clone()));
            }
        }
        Ok(Self { genes })
    }

    /// Number of genes
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Whether the pool is empty
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Genes in genome order
    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    /// Gene at a genome position
    pub fn get(&self, index: usize) -> Option<&Gene> {
        self.genes.get(index)
    }

    /// Gene identifiers in genome order
    pub fn ids(&self) -> Vec<&str> {
        self.genes.iter().map(|g| g.id.as_str()).collect()
    }

    /// Check that the host's identifier list matches this pool exactly
    pub fn check_ids(&self, ids: &[String]) -> Result<(), ConfigurationError> {
        if ids.len() != self.genes.len() {
            return Err(ConfigurationError::GenePoolMismatch(format!(
                "host exposes {} genes, pool has {}",
                ids.len(),
                self.genes.len()
            )));
        }
        for (position, (gene, id)) in self.genes.iter().zip(ids).enumerate() {
            if gene.id != *id {
                return Err(ConfigurationError::GenePoolMismatch(format!(
                    "position {position}: expected '{}', host has '{id}'",
                    gene.id
                )));
            }
        }
        Ok(())
    }

    /// Tick count of every gene, recomputed from current bounds
    pub fn total_ticks(&self) -> Result<Vec<Tick>, EncodingError> {
        self.genes.iter().map(Gene::total_ticks).collect()
    }

    /// Check a genome against the pool
    pub fn validate(&self, genome: &TickGenome) -> Result<(), EncodingError> {
        self.decode_genome(genome).map(|_| ())
    }

    /// Decode every tick to its actual value
    pub fn decode_genome(&self, genome: &TickGenome) -> Result<Vec<Decimal>, EncodingError> {
        if genome.len() != self.genes.len() {
            return Err(EncodingError::LengthMismatch {
                expected: self.genes.len(),
                actual: genome.len(),
            });
        }
        self.genes
            .iter()
            .zip(genome.ticks())
            .map(|(gene, &tick)| gene.decode(tick))
            .collect()
    }

    /// Decode every tick to a host-friendly float
    pub fn decode_genome_f64(&self, genome: &TickGenome) -> Result<Vec<f64>, EncodingError> {
        Ok(self
            .decode_genome(genome)?
            .into_iter()
            .map(|v| v.to_f64().unwrap_or(f64::NAN))
            .collect())
    }

    /// Encode actual values to the nearest ticks
    pub fn encode_values(&self, values: &[Decimal]) -> Result<TickGenome, EncodingError> {
        if values.len() != self.genes.len() {
            return Err(EncodingError::LengthMismatch {
                expected: self.genes.len(),
                actual: values.len(),
            });
        }
        self.genes
            .iter()
            .zip(values)
            .map(|(gene, &value)| gene.encode(value))
            .collect()
    }

    /// Current tick of every gene as a genome
    pub fn current_genome(&self) -> TickGenome {
        self.genes.iter().map(|g| g.tick).collect()
    }

    /// Move every gene to the genome's ticks
    pub fn apply(&mut self, genome: &TickGenome) -> Result<(), EncodingError> {
        self.validate(genome)?;
        for (gene, &tick) in self.genes.iter_mut().zip(genome.ticks()) {
            gene.tick = tick;
        }
        Ok(())
    }

    /// Draw a genome uniformly over every gene's tick range
    pub fn random_genome<R: Rng>(&self, rng: &mut R) -> Result<TickGenome, EncodingError> {
        self.genes
            .iter()
            .map(|gene| gene.total_ticks().map(|total| rng.gen_range(0..=total)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn test_pool() -> GenePool {
        GenePool::new(vec![
            Gene::new("width", dec("0"), dec("10"), 0).unwrap(),
            Gene::new("angle", dec("-1"), dec("1"), 2).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_pool_rejects_empty_and_duplicates() {
        assert_eq!(
            GenePool::new(vec![]),
            Err(ConfigurationError::EmptyGenePool)
        );
        let g = Gene::new("a", dec("0"), dec("1"), 0).unwrap();
        assert_eq!(
            GenePool::new(vec![g.clone(), g]),
            Err(ConfigurationError::DuplicateGene("a".to_string()))
        );
    }

    #[test]
    fn test_total_ticks() {
        assert_eq!(test_pool().total_ticks().unwrap(), vec![10, 200]);
    }

    #[test]
    fn test_decode_and_encode_genome() {
        let pool = test_pool();
        let genome = TickGenome::new(vec![3, 150]);
        let values = pool.decode_genome(&genome).unwrap();
        assert_eq!(values, vec![dec("3"), dec("0.5")]);
        assert_eq!(pool.encode_values(&values).unwrap(), genome);
        assert_eq!(pool.decode_genome_f64(&genome).unwrap(), vec![3.0, 0.5]);
    }

    #[test]
    fn test_decode_length_mismatch() {
        let pool = test_pool();
        assert!(matches!(
            pool.decode_genome(&TickGenome::new(vec![1])),
            Err(EncodingError::LengthMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_random_genome_within_ranges() {
        let pool = test_pool();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let genome = pool.random_genome(&mut rng).unwrap();
            assert!(pool.validate(&genome).is_ok());
        }
    }

    #[test]
    fn test_check_ids() {
        let pool = test_pool();
        assert!(pool
            .check_ids(&["width".to_string(), "angle".to_string()])
            .is_ok());
        assert!(pool
            .check_ids(&["angle".to_string(), "width".to_string()])
            .is_err());
        assert!(pool.check_ids(&["width".to_string()]).is_err());
    }

    #[test]
    fn test_apply_sets_current_ticks() {
        let mut pool = test_pool();
        pool.apply(&TickGenome::new(vec![4, 20])).unwrap();
        assert_eq!(pool.current_genome(), TickGenome::new(vec![4, 20]));
        assert!(pool.apply(&TickGenome::new(vec![11, 20])).is_err());
        assert_eq!(pool.current_genome(), TickGenome::new(vec![4, 20]));
    }
}
