//! Individual wrapper type
//!
//! This module provides the Individual type that wraps a genome with its
//! fitness, generation and stable identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fitness::traits::Objective;
use crate::genome::tick_genome::TickGenome;

/// Stable identity of an individual within a run
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct IndividualId(pub u64);

impl fmt::Display for IndividualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Individual({})", self.0)
    }
}

/// Monotonic source of individual identities
#[derive(Clone, Debug, Default)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    /// Create a sequence starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next identity
    pub fn next_id(&mut self) -> IndividualId {
        let id = IndividualId(self.next);
        self.next += 1;
        id
    }
}

/// An individual in the population
///
/// The generation is fixed at creation. Fitness may be set until the
/// individual is promoted into observer history, after which it is only
/// reachable through shared immutable references.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    id: IndividualId,
    genome: TickGenome,
    generation: usize,
    #[serde(with = "crate::serde_float::option")]
    fitness: Option<f64>,
    /// Whether the fitness is the sentinel from a failed evaluation
    degraded: bool,
}

impl Individual {
    /// Create a new individual with an unevaluated genome
    pub fn new(id: IndividualId, genome: TickGenome, generation: usize) -> Self {
        Self {
            id,
            genome,
            generation,
            fitness: None,
            degraded: false,
        }
    }

    /// Create a new individual with a known fitness
    pub fn with_fitness(id: IndividualId, genome: TickGenome, generation: usize, fitness: f64) -> Self {
        Self {
            fitness: Some(fitness),
            ..Self::new(id, genome, generation)
        }
    }

    /// Stable identity
    pub fn id(&self) -> IndividualId {
        self.id
    }

    /// Get a reference to the genome
    pub fn genome(&self) -> &TickGenome {
        &self.genome
    }

    /// Take the genome out of this individual
    pub fn into_genome(self) -> TickGenome {
        self.genome
    }

    /// Generation when this individual was created
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// The fitness value, if evaluated
    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    /// The fitness value, or the objective's worst sentinel
    pub fn fitness_or_worst(&self, objective: Objective) -> f64 {
        self.fitness.unwrap_or_else(|| objective.worst())
    }

    /// Check if this individual has been evaluated
    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    /// Check if the fitness came from a failed evaluation
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Set the fitness value
    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
        self.degraded = false;
    }

    /// Assign the sentinel fitness after a failed evaluation
    pub fn set_degraded(&mut self, objective: Objective) {
        self.fitness = Some(objective.worst());
        self.degraded = true;
    }

    /// Check if this individual is better than another
    pub fn is_better_than(&self, other: &Self, objective: Objective) -> bool {
        match (self.fitness, other.fitness) {
            (Some(a), Some(b)) => objective.is_better(a, b),
            (Some(_), None) => true,
            _ => false,
        }
    }

    /// Age of this individual (generations since birth)
    pub fn age(&self, current_generation: usize) -> usize {
        current_generation.saturating_sub(self.generation)
    }
}
