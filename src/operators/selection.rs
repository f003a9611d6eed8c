//! Selection strategies
//!
//! Selection runs twice per generation: once to pick the breeding pool
//! handed to pairing, and once to assemble the next population from elites
//! and offspring.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{ConfigurationError, OperatorError, OperatorResult};
use crate::fitness::traits::Objective;
use crate::operators::traits::SelectionStrategy;
use crate::population::individual::Individual;
use crate::population::population::Population;

/// Ranked individuals, excluding sentinel fitness unless nothing else is left
fn ranked_breeders(population: &Population, objective: Objective) -> Vec<&Individual> {
    let ranked = population.ranked(objective);
    let healthy: Vec<&Individual> = ranked.iter().copied().filter(|i| !i.is_degraded()).collect();
    if healthy.is_empty() {
        ranked
    } else {
        healthy
    }
}

fn assemble_survivors(
    current: &Population,
    offspring: Vec<Individual>,
    objective: Objective,
    elite_count: usize,
) -> OperatorResult<Vec<Individual>> {
    let size = current.len();
    let elites = elite_count.min(size);
    let needed = size - elites;
    if offspring.len() < needed {
        return Err(OperatorError::SelectionFailed(format!(
            "{} offspring cannot fill {} places",
            offspring.len(),
            needed
        )));
    }

    let mut next: Vec<Individual> = current
        .ranked(objective)
        .into_iter()
        .take(elites)
        .cloned()
        .collect();
    next.extend(offspring.into_iter().take(needed));
    Ok(next)
}

/// Truncation selection
///
/// The best `survival_rate` fraction of the population breeds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TruncationSelection {
    survival_rate: f64,
    elite_count: usize,
}

impl TruncationSelection {
    /// Create a truncation selection
    pub fn new(survival_rate: f64, elite_count: usize) -> Result<Self, ConfigurationError> {
        if !(survival_rate > 0.0 && survival_rate <= 1.0) {
            return Err(ConfigurationError::InvalidRate {
                name: "survival rate",
                value: survival_rate,
            });
        }
        Ok(Self {
            survival_rate,
            elite_count,
        })
    }

    /// Fraction of the population that breeds
    pub fn survival_rate(&self) -> f64 {
        self.survival_rate
    }
}

impl SelectionStrategy for TruncationSelection {
    fn breeding_pool<'a, R: Rng>(
        &self,
        population: &'a Population,
        objective: Objective,
        _rng: &mut R,
    ) -> Vec<&'a Individual> {
        let mut ranked = ranked_breeders(population, objective);
        let keep = ((population.len() as f64 * self.survival_rate).ceil() as usize).max(1);
        ranked.truncate(keep);
        ranked
    }

    fn elite_count(&self) -> usize {
        self.elite_count
    }

    fn select_survivors(
        &self,
        current: &Population,
        offspring: Vec<Individual>,
        objective: Objective,
    ) -> OperatorResult<Vec<Individual>> {
        assemble_survivors(current, offspring, objective, self.elite_count)
    }
}

/// Tournament selection
///
/// Each breeding slot goes to the best of a random subset of the population.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TournamentSelection {
    tournament_size: usize,
    elite_count: usize,
}

impl TournamentSelection {
    /// Create a tournament selection
    pub fn new(tournament_size: usize, elite_count: usize) -> Result<Self, ConfigurationError> {
        if tournament_size == 0 {
            return Err(ConfigurationError::InvalidTournamentSize);
        }
        Ok(Self {
            tournament_size,
            elite_count,
        })
    }

    /// Number of individuals competing per slot
    pub fn tournament_size(&self) -> usize {
        self.tournament_size
    }

    fn tournament<'a, R: Rng>(
        &self,
        candidates: &[&'a Individual],
        objective: Objective,
        rng: &mut R,
    ) -> Option<&'a Individual> {
        let size = self.tournament_size.min(candidates.len());
        candidates
            .choose_multiple(rng, size)
            .copied()
            .min_by(|a, b| {
                objective.compare(a.fitness_or_worst(objective), b.fitness_or_worst(objective))
            })
    }
}

impl SelectionStrategy for TournamentSelection {
    fn breeding_pool<'a, R: Rng>(
        &self,
        population: &'a Population,
        objective: Objective,
        rng: &mut R,
    ) -> Vec<&'a Individual> {
        let candidates = ranked_breeders(population, objective);
        (0..population.len())
            .filter_map(|_| self.tournament(&candidates, objective, rng))
            .collect()
    }

    fn elite_count(&self) -> usize {
        self.elite_count
    }

    fn select_survivors(
        &self,
        current: &Population,
        offspring: Vec<Individual>,
        objective: Objective,
    ) -> OperatorResult<Vec<Individual>> {
        assemble_survivors(current, offspring, objective, self.elite_count)
    }
}

/// Closed set of selection strategies
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Selection {
    /// Best fraction breeds
    Truncation(TruncationSelection),
    /// Repeated tournaments
    Tournament(TournamentSelection),
}

impl Default for Selection {
    fn default() -> Self {
        Self::Tournament(TournamentSelection {
            tournament_size: 3,
            elite_count: 1,
        })
    }
}

impl SelectionStrategy for Selection {
    fn breeding_pool<'a, R: Rng>(
        &self,
        population: &'a Population,
        objective: Objective,
        rng: &mut R,
    ) -> Vec<&'a Individual> {
        match self {
            Self::Truncation(s) => s.breeding_pool(population, objective, rng),
            Self::Tournament(s) => s.breeding_pool(population, objective, rng),
        }
    }

    fn elite_count(&self) -> usize {
        match self {
            Self::Truncation(s) => s.elite_count(),
            Self::Tournament(s) => s.elite_count(),
        }
    }

    fn select_survivors(
        &self,
        current: &Population,
        offspring: Vec<Individual>,
        objective: Objective,
    ) -> OperatorResult<Vec<Individual>> {
        match self {
            Self::Truncation(s) => s.select_survivors(current, offspring, objective),
            Self::Tournament(s) => s.select_survivors(current, offspring, objective),
        }
    }
}
