//! Run history
//!
//! The observer is the durable record of a run: one population per completed
//! generation, in generation order, plus the statistics computed when each
//! generation was appended. Completed generations are held behind `Arc` and
//! never mutated again, so snapshots are cheap clones that are safe to read
//! while the orchestrator keeps appending.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::diagnostics::GenerationStats;
use crate::error::{EncodingError, EvoResult, EvolutionError, SnapshotError};
use crate::fitness::traits::Objective;
use crate::genome::gene::Tick;
use crate::genome::pool::GenePool;
use crate::population::individual::Individual;
use crate::population::population::Population;

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Append-only history of a run
#[derive(Clone, Debug, Default)]
pub struct Observer {
    generations: Vec<Arc<Population>>,
    stats: Vec<GenerationStats>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotDocument {
    version: u32,
    generations: Vec<Arc<Population>>,
    stats: Vec<GenerationStats>,
}

impl Observer {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all history; marks the start of a new run
    pub fn reset(&mut self) {
        self.generations.clear();
        self.stats.clear();
    }

    /// Append a completed generation
    ///
    /// The population must carry the next generation number and every
    /// individual must be evaluated. On error nothing is appended.
    pub fn append(&mut self, population: Population, stats: GenerationStats) -> EvoResult<()> {
        let expected = self.generations.len();
        if population.generation() != expected || stats.generation != expected {
            return Err(EvolutionError::HistoryOrder {
                expected,
                found: population.generation(),
            });
        }
        if population.is_empty() {
            return Err(EvolutionError::EmptyPopulation);
        }
        let unevaluated = population.len() - population.count_evaluated();
        if unevaluated > 0 {
            return Err(EvolutionError::IncompleteGeneration {
                generation: expected,
                unevaluated,
            });
        }

        self.generations.push(Arc::new(population));
        self.stats.push(stats);
        Ok(())
    }

    /// Number of recorded generations
    pub fn len(&self) -> usize {
        self.generations.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    /// All recorded generations, oldest first
    pub fn generations(&self) -> &[Arc<Population>] {
        &self.generations
    }

    /// A recorded generation
    pub fn generation(&self, generation: usize) -> Option<&Arc<Population>> {
        self.generations.get(generation)
    }

    /// The most recent generation
    pub fn latest(&self) -> Option<&Arc<Population>> {
        self.generations.last()
    }

    /// Statistics per recorded generation
    pub fn stats(&self) -> &[GenerationStats] {
        &self.stats
    }

    /// Statistics of the most recent generation
    pub fn latest_stats(&self) -> Option<&GenerationStats> {
        self.stats.last()
    }

    /// Best fitness of each recorded generation
    pub fn best_fitness_history(&self) -> Vec<f64> {
        self.stats.iter().map(|s| s.best_fitness).collect()
    }

    /// Mean fitness of each recorded generation
    pub fn mean_fitness_history(&self) -> Vec<f64> {
        self.stats.iter().map(|s| s.mean_fitness).collect()
    }

    /// Normalized diversity of each recorded generation
    pub fn diversity_history(&self) -> Vec<f64> {
        self.stats.iter().map(|s| s.diversity).collect()
    }

    /// Improvement in best fitness across the trailing `window` generations
    ///
    /// Positive when the best fitness moved in the objective's direction,
    /// negative when it regressed. `None` until `window` generations are
    /// recorded.
    pub fn convergence_delta(&self, window: usize, objective: Objective) -> Option<f64> {
        if window == 0 || self.stats.len() < window {
            return None;
        }
        let trailing = &self.stats[self.stats.len() - window..];
        let first = trailing.first()?.best_fitness;
        let last = trailing.last()?.best_fitness;
        let delta = match objective {
            Objective::Maximize => last - first,
            Objective::Minimize => first - last,
        };
        // Two all-degraded generations give inf - inf
        Some(if delta.is_nan() { 0.0 } else { delta })
    }

    /// Total evaluations recorded across all generations
    pub fn total_evaluations(&self) -> usize {
        self.stats.last().map(|s| s.evaluations).unwrap_or(0)
    }

    /// Best individual across the whole history
    pub fn best_individual(&self, objective: Objective) -> Option<&Individual> {
        self.generations
            .iter()
            .filter_map(|p| p.best(objective))
            .filter(|i| !i.is_degraded())
            .min_by(|a, b| {
                objective.compare(a.fitness_or_worst(objective), b.fitness_or_worst(objective))
            })
    }

    /// Raw tick vectors of a recorded generation
    pub fn genome_vectors(&self, generation: usize) -> Option<Vec<Vec<Tick>>> {
        self.generation(generation).map(|p| p.genome_vectors())
    }

    /// Decoded parameter values of a recorded generation
    pub fn decoded_genomes(
        &self,
        generation: usize,
        pool: &GenePool,
    ) -> Option<Result<Vec<Vec<Decimal>>, EncodingError>> {
        self.generation(generation).map(|p| {
            p.iter()
                .map(|i| pool.decode_genome(i.genome()))
                .collect::<Result<Vec<_>, _>>()
        })
    }

    /// Cheap read-only copy of the current history
    pub fn snapshot(&self) -> Observer {
        self.clone()
    }

    /// Serialize the history to JSON
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        let document = SnapshotDocument {
            version: SNAPSHOT_VERSION,
            generations: self.generations.clone(),
            stats: self.stats.clone(),
        };
        serde_json::to_string(&document).map_err(|e| SnapshotError::Serialization(e.to_string()))
    }

    /// Restore a history from JSON
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let document: SnapshotDocument =
            serde_json::from_str(json).map_err(|e| SnapshotError::Serialization(e.to_string()))?;
        Self::from_document(document)
    }

    /// Save the history to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let document = SnapshotDocument {
            version: SNAPSHOT_VERSION,
            generations: self.generations.clone(),
            stats: self.stats.clone(),
        };
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &document)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))
    }

    /// Load a history from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let reader = BufReader::new(File::open(path)?);
        let document: SnapshotDocument = serde_json::from_reader(reader)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;
        Self::from_document(document)
    }

    fn from_document(document: SnapshotDocument) -> Result<Self, SnapshotError> {
        if document.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: document.version,
            });
        }
        Ok(Self {
            generations: document.generations,
            stats: document.stats,
        })
    }
}
