//! Genetic operators
//!
//! This module provides the pairing, crossover, mutation and selection
//! strategy sets and the capabilities the orchestrator drives them through.

pub mod crossover;
pub mod mutation;
pub mod pairing;
pub mod selection;
pub mod traits;

use crate::termination::Termination;

/// The complete set of strategies for one run
#[derive(Clone, Debug, Default)]
pub struct StrategySet {
    /// Parent pairing
    pub pairing: pairing::Pairing,
    /// Recombination
    pub crossover: crossover::Crossover,
    /// Perturbation
    pub mutation: mutation::Mutation,
    /// Breeding pool and survivor assembly
    pub selection: selection::Selection,
    /// Early stopping; the generation cap always applies
    pub termination: Vec<Termination>,
}

pub mod prelude {
    pub use super::crossover::*;
    pub use super::mutation::*;
    pub use super::pairing::*;
    pub use super::selection::*;
    pub use super::traits::*;
    pub use super::StrategySet;
}
