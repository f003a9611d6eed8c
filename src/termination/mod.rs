//! Termination criteria
//!
//! Criteria are polled against the run history after each recorded
//! generation. The hard generation cap is enforced by the orchestrator and
//! is not a criterion.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::fitness::traits::Objective;
use crate::population::observer::Observer;

/// Number of trailing generations inspected for progress convergence
pub const CONVERGENCE_WINDOW: usize = 5;

/// Termination criterion trait
pub trait TerminationCriterion: Send + Sync {
    /// Check if evolution should terminate
    fn should_terminate(&self, history: &Observer) -> bool;

    /// Get a description of why termination occurred
    fn reason(&self) -> &'static str;
}

/// Terminate when normalized genome diversity falls below a threshold
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationDiversity {
    threshold: f64,
}

impl GenerationDiversity {
    /// Create with a threshold in `[0, 1]`
    pub fn new(threshold: f64) -> Result<Self, ConfigurationError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigurationError::InvalidThreshold {
                name: "generation diversity",
                value: threshold,
            });
        }
        Ok(Self { threshold })
    }

    /// Diversity threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl TerminationCriterion for GenerationDiversity {
    fn should_terminate(&self, history: &Observer) -> bool {
        history
            .latest_stats()
            .is_some_and(|stats| stats.diversity < self.threshold)
    }

    fn reason(&self) -> &'static str {
        "Generation diversity below threshold"
    }
}

/// Terminate when the number of distinct genomes falls below a threshold
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PopulationDiversity {
    threshold: usize,
}

impl PopulationDiversity {
    /// Create with a distinct-genome threshold
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    /// Distinct-genome threshold
    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

impl TerminationCriterion for PopulationDiversity {
    fn should_terminate(&self, history: &Observer) -> bool {
        history
            .latest()
            .is_some_and(|population| population.distinct_genomes() < self.threshold)
    }

    fn reason(&self) -> &'static str {
        "Population diversity below threshold"
    }
}

/// Terminate when best fitness stops improving over the trailing window
///
/// Improvement is measured in the objective's direction, so a falling best
/// fitness under maximization counts as no progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressConvergence {
    threshold: f64,
    objective: Objective,
}

impl ProgressConvergence {
    /// Create with a non-negative improvement threshold
    pub fn new(threshold: f64, objective: Objective) -> Result<Self, ConfigurationError> {
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(ConfigurationError::InvalidThreshold {
                name: "progress convergence",
                value: threshold,
            });
        }
        Ok(Self {
            threshold,
            objective,
        })
    }

    /// Improvement threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl TerminationCriterion for ProgressConvergence {
    fn should_terminate(&self, history: &Observer) -> bool {
        history
            .convergence_delta(CONVERGENCE_WINDOW, self.objective)
            .is_some_and(|delta| delta < self.threshold)
    }

    fn reason(&self) -> &'static str {
        "Fitness progress converged"
    }
}

/// Closed set of termination criteria
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Termination {
    /// Normalized diversity threshold
    GenerationDiversity(GenerationDiversity),
    /// Distinct genome count threshold
    PopulationDiversity(PopulationDiversity),
    /// Trailing best-fitness improvement threshold
    ProgressConvergence(ProgressConvergence),
}

impl TerminationCriterion for Termination {
    fn should_terminate(&self, history: &Observer) -> bool {
        match self {
            Self::GenerationDiversity(t) => t.should_terminate(history),
            Self::PopulationDiversity(t) => t.should_terminate(history),
            Self::ProgressConvergence(t) => t.should_terminate(history),
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            Self::GenerationDiversity(t) => t.reason(),
            Self::PopulationDiversity(t) => t.reason(),
            Self::ProgressConvergence(t) => t.reason(),
        }
    }
}

/// Serializable description of a termination criterion
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminationSettings {
    /// See [`GenerationDiversity`]
    GenerationDiversity { threshold: f64 },
    /// See [`PopulationDiversity`]
    PopulationDiversity { threshold: usize },
    /// See [`ProgressConvergence`]
    ProgressConvergence { threshold: f64 },
}

impl TerminationSettings {
    /// Build the criterion for a run optimizing in `objective`'s direction
    pub fn build(&self, objective: Objective) -> Result<Termination, ConfigurationError> {
        Ok(match *self {
            Self::GenerationDiversity { threshold } => {
                Termination::GenerationDiversity(GenerationDiversity::new(threshold)?)
            }
            Self::PopulationDiversity { threshold } => {
                Termination::PopulationDiversity(PopulationDiversity::new(threshold))
            }
            Self::ProgressConvergence { threshold } => {
                Termination::ProgressConvergence(ProgressConvergence::new(threshold, objective)?)
            }
        })
    }
}

/// First criterion that fires, if any
pub fn first_triggered<'a>(
    criteria: &'a [Termination],
    history: &Observer,
) -> Option<&'a Termination> {
    criteria.iter().find(|c| c.should_terminate(history))
}

pub mod prelude {
    pub use super::{
        first_triggered, GenerationDiversity, PopulationDiversity, ProgressConvergence,
        Termination, TerminationCriterion, TerminationSettings, CONVERGENCE_WINDOW,
    };
}
