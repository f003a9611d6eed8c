//! Population type
//!
//! This module provides the Population container type: every individual
//! belonging to one generation.

use std::collections::HashSet;

use rand::Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{EncodingError, EvaluationError};
use crate::fitness::traits::{FitnessEvaluator, Objective};
use crate::genome::gene::Tick;
use crate::genome::pool::GenePool;
use crate::genome::tick_genome::{DistanceMetric, TickGenome};
use crate::population::individual::{IdSequence, Individual, IndividualId};

/// Outcome of evaluating a population
#[derive(Clone, Debug, Default)]
pub struct EvaluationSummary {
    /// Individuals evaluated in this pass
    pub evaluated: usize,
    /// Individuals that received the sentinel fitness, with the cause
    pub degraded: Vec<(IndividualId, EvaluationError)>,
}

/// A population of individuals
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Population {
    /// The individuals in this population
    individuals: Vec<Individual>,
    /// Generation number
    generation: usize,
}

impl Population {
    /// Create an empty population for a generation
    pub fn new(generation: usize) -> Self {
        Self {
            individuals: Vec::new(),
            generation,
        }
    }

    /// Create a population with the given capacity
    pub fn with_capacity(generation: usize, capacity: usize) -> Self {
        Self {
            individuals: Vec::with_capacity(capacity),
            generation,
        }
    }

    /// Create a population from a vector of individuals
    pub fn from_individuals(generation: usize, individuals: Vec<Individual>) -> Self {
        Self {
            individuals,
            generation,
        }
    }

    /// Create a random population over the gene pool
    pub fn random<R: Rng>(
        size: usize,
        pool: &GenePool,
        generation: usize,
        ids: &mut IdSequence,
        rng: &mut R,
    ) -> Result<Self, EncodingError> {
        let individuals = (0..size)
            .map(|_| {
                pool.random_genome(rng)
                    .map(|genome| Individual::new(ids.next_id(), genome, generation))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_individuals(generation, individuals))
    }

    /// Get the generation number
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Get the population size
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    /// Check if the population is empty
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Get an individual by index
    pub fn get(&self, index: usize) -> Option<&Individual> {
        self.individuals.get(index)
    }

    /// Add an individual to the population
    pub fn push(&mut self, individual: Individual) {
        self.individuals.push(individual);
    }

    /// Get an iterator over the individuals
    pub fn iter(&self) -> impl Iterator<Item = &Individual> {
        self.individuals.iter()
    }

    /// Get the underlying slice of individuals
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    /// Take the individuals out of this population
    pub fn into_individuals(self) -> Vec<Individual> {
        self.individuals
    }

    /// Get the best evaluated individual
    pub fn best(&self, objective: Objective) -> Option<&Individual> {
        self.individuals
            .iter()
            .filter(|i| i.is_evaluated())
            .min_by(|a, b| {
                objective.compare(a.fitness_or_worst(objective), b.fitness_or_worst(objective))
            })
    }

    /// Get the worst evaluated individual
    pub fn worst(&self, objective: Objective) -> Option<&Individual> {
        self.individuals
            .iter()
            .filter(|i| i.is_evaluated())
            .max_by(|a, b| {
                objective.compare(a.fitness_or_worst(objective), b.fitness_or_worst(objective))
            })
    }

    /// Individuals sorted best first; unevaluated individuals sort last
    pub fn ranked(&self, objective: Objective) -> Vec<&Individual> {
        let mut ranked: Vec<&Individual> = self.individuals.iter().collect();
        ranked.sort_by(|a, b| {
            objective.compare(a.fitness_or_worst(objective), b.fitness_or_worst(objective))
        });
        ranked
    }

    /// Check if all individuals have been evaluated
    pub fn all_evaluated(&self) -> bool {
        self.individuals.iter().all(|i| i.is_evaluated())
    }

    /// Count the number of evaluated individuals
    pub fn count_evaluated(&self) -> usize {
        self.individuals.iter().filter(|i| i.is_evaluated()).count()
    }

    /// Count the individuals holding the sentinel fitness
    pub fn count_degraded(&self) -> usize {
        self.individuals.iter().filter(|i| i.is_degraded()).count()
    }

    /// Fitness values of evaluated, non-degraded individuals
    pub fn fitness_values(&self) -> Vec<f64> {
        self.individuals
            .iter()
            .filter(|i| !i.is_degraded())
            .filter_map(|i| i.fitness())
            .collect()
    }

    /// Compute mean fitness, ignoring degraded individuals
    pub fn mean_fitness(&self) -> Option<f64> {
        let values = self.fitness_values();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }

    /// Average pairwise distance between genomes
    pub fn diversity(&self, metric: DistanceMetric) -> f64 {
        if self.len() < 2 {
            return 0.0;
        }

        let mut total_distance = 0.0;
        let mut count = 0usize;
        for i in 0..self.len() {
            for j in (i + 1)..self.len() {
                total_distance +=
                    metric.distance(self.individuals[i].genome(), self.individuals[j].genome());
                count += 1;
            }
        }
        total_distance / count as f64
    }

    /// Average pairwise Euclidean distance scaled by the search-space diagonal
    ///
    /// Returns a value in `[0, 1]`: zero when every genome is identical.
    pub fn normalized_diversity(&self, total_ticks: &[Tick]) -> f64 {
        let diagonal = total_ticks
            .iter()
            .map(|&t| (t as f64) * (t as f64))
            .sum::<f64>()
            .sqrt();
        if diagonal == 0.0 {
            return 0.0;
        }
        (self.diversity(DistanceMetric::Euclidean) / diagonal).clamp(0.0, 1.0)
    }

    /// Number of distinct genomes by exact tick-vector equality
    pub fn distinct_genomes(&self) -> usize {
        self.individuals
            .iter()
            .map(Individual::genome)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Raw tick vectors, for external clustering
    pub fn genome_vectors(&self) -> Vec<Vec<Tick>> {
        self.individuals
            .iter()
            .map(|i| i.genome().ticks().to_vec())
            .collect()
    }

    /// Evaluate all unevaluated individuals (sequential)
    ///
    /// Failed evaluations degrade the affected individual to the sentinel
    /// fitness. A superseded run or a codec failure aborts the pass with
    /// [`EvaluationError::Superseded`] or [`EvaluationError::Encoding`].
    pub fn evaluate<E>(
        &mut self,
        evaluator: &E,
        objective: Objective,
    ) -> Result<EvaluationSummary, EvaluationError>
    where
        E: FitnessEvaluator + ?Sized,
    {
        let mut summary = EvaluationSummary::default();
        for individual in self.individuals.iter_mut().filter(|i| !i.is_evaluated()) {
            let result = evaluator.evaluate(individual.genome());
            apply_evaluation(individual, result, objective, &mut summary)?;
        }
        Ok(summary)
    }
}

/// Parallel evaluation support (requires `parallel` feature)
#[cfg(feature = "parallel")]
impl Population {
    /// Evaluate all unevaluated individuals concurrently
    pub fn evaluate_parallel<E>(
        &mut self,
        evaluator: &E,
        objective: Objective,
    ) -> Result<EvaluationSummary, EvaluationError>
    where
        E: FitnessEvaluator + ?Sized,
    {
        let results: Vec<(usize, Result<f64, EvaluationError>)> = self
            .individuals
            .par_iter()
            .enumerate()
            .filter(|(_, i)| !i.is_evaluated())
            .map(|(index, i)| (index, evaluator.evaluate(i.genome())))
            .collect();

        let mut summary = EvaluationSummary::default();
        for (index, result) in results {
            apply_evaluation(&mut self.individuals[index], result, objective, &mut summary)?;
        }
        Ok(summary)
    }
}

/// Sequential fallback for parallel evaluation (when `parallel` feature is disabled)
#[cfg(not(feature = "parallel"))]
impl Population {
    /// Evaluate all unevaluated individuals (sequential fallback)
    pub fn evaluate_parallel<E>(
        &mut self,
        evaluator: &E,
        objective: Objective,
    ) -> Result<EvaluationSummary, EvaluationError>
    where
        E: FitnessEvaluator + ?Sized,
    {
        self.evaluate(evaluator, objective)
    }
}

fn apply_evaluation(
    individual: &mut Individual,
    result: Result<f64, EvaluationError>,
    objective: Objective,
    summary: &mut EvaluationSummary,
) -> Result<(), EvaluationError> {
    let error = match result {
        Ok(fitness) if fitness.is_finite() => {
            individual.set_fitness(fitness);
            summary.evaluated += 1;
            return Ok(());
        }
        Ok(fitness) => EvaluationError::NonFinite(fitness),
        Err(error) if error.is_fatal() => return Err(error),
        Err(error) => error,
    };

    warn!(
        individual = %individual.id(),
        error = %error,
        "Evaluation failed, assigning sentinel fitness"
    );
    individual.set_degraded(objective);
    summary.evaluated += 1;
    summary.degraded.push((individual.id(), error));
    Ok(())
}

impl std::ops::Index<usize> for Population {
    type Output = Individual;

    fn index(&self, index: usize) -> &Self::Output {
        &self.individuals[index]
    }
}

impl IntoIterator for Population {
    type Item = Individual;
    type IntoIter = std::vec::IntoIter<Individual>;

    fn into_iter(self) -> Self::IntoIter {
        self.individuals.into_iter()
    }
}
