//! Strategy capabilities
//!
//! The orchestrator only depends on these traits. Each strategy family is a
//! closed enum implementing its capability, so adding a variant is checked
//! by exhaustive matching.

use rand::Rng;

use crate::error::OperatorResult;
use crate::fitness::traits::Objective;
use crate::genome::gene::Tick;
use crate::genome::tick_genome::TickGenome;
use crate::population::individual::Individual;
use crate::population::population::Population;

/// Parent pairing capability
pub trait PairingStrategy: Send + Sync {
    /// Choose two parents from the candidates
    ///
    /// Returns indices into `candidates`.
    fn select_parents<R: Rng>(
        &self,
        candidates: &[&Individual],
        rng: &mut R,
    ) -> OperatorResult<(usize, usize)>;
}

/// Crossover capability
pub trait CrossoverStrategy: Send + Sync {
    /// Recombine two parents into two children
    ///
    /// Below the crossover probability the children are verbatim copies.
    fn crossover<R: Rng>(
        &self,
        parent1: &TickGenome,
        parent2: &TickGenome,
        rng: &mut R,
    ) -> OperatorResult<(TickGenome, TickGenome)>;

    /// Get the probability of crossover being applied
    fn crossover_probability(&self) -> f64;
}

/// Mutation capability
pub trait MutationStrategy: Send + Sync {
    /// Perturb a genome in place, keeping every tick in `0..=total_ticks[i]`
    fn mutate<R: Rng>(&self, genome: &mut TickGenome, total_ticks: &[Tick], rng: &mut R);

    /// Get the mutation probability per gene
    fn mutation_probability(&self) -> f64;
}

/// Selection capability
pub trait SelectionStrategy: Send + Sync {
    /// Individuals eligible for pairing, drawn from a fully evaluated population
    fn breeding_pool<'a, R: Rng>(
        &self,
        population: &'a Population,
        objective: Objective,
        rng: &mut R,
    ) -> Vec<&'a Individual>;

    /// Number of individuals carried over unchanged
    fn elite_count(&self) -> usize;

    /// Assemble the next generation from the current population and offspring
    ///
    /// The result always has exactly `current.len()` individuals. Elites are
    /// carried over unmodified, keeping their fitness.
    fn select_survivors(
        &self,
        current: &Population,
        offspring: Vec<Individual>,
        objective: Objective,
    ) -> OperatorResult<Vec<Individual>>;
}
