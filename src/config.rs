//! Run settings
//!
//! Serializable settings for one run, loaded from JSON or TOML. Settings are
//! plain data; [`AlgorithmSettings::validate`] turns them into a checked
//! [`StrategySet`] before any generation runs.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::fitness::traits::Objective;
use crate::genome::tick_genome::DistanceMetric;
use crate::operators::crossover::{Crossover, SinglePointCrossover, TwoPointCrossover};
use crate::operators::mutation::{CreepMutation, Mutation, UniformMutation};
use crate::operators::pairing::{DistancePairing, Pairing};
use crate::operators::selection::{Selection, TournamentSelection, TruncationSelection};
use crate::operators::StrategySet;
use crate::termination::TerminationSettings;

/// Pairing parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingSettings {
    /// 0 favours close relatives, 1 favours distant ones
    pub inbreeding_factor: f64,
    /// 0 = Euclidean, 1 = Manhattan
    pub distance_metric: u8,
}

impl Default for PairingSettings {
    fn default() -> Self {
        Self {
            inbreeding_factor: 0.5,
            distance_metric: DistanceMetric::Euclidean.selector(),
        }
    }
}

/// Crossover variants
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverKind {
    #[default]
    SinglePoint,
    TwoPoint,
}

/// Crossover parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossoverSettings {
    pub kind: CrossoverKind,
    /// Probability that a pair recombines
    pub rate: f64,
}

impl Default for CrossoverSettings {
    fn default() -> Self {
        Self {
            kind: CrossoverKind::SinglePoint,
            rate: 0.9,
        }
    }
}

/// Mutation variants
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    #[default]
    Uniform,
    Creep,
}

/// Mutation parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationSettings {
    pub kind: MutationKind,
    /// Per-gene probability
    pub rate: f64,
    /// Creep step as a fraction of each gene's range
    pub step: f64,
}

impl Default for MutationSettings {
    fn default() -> Self {
        Self {
            kind: MutationKind::Uniform,
            rate: 0.1,
            step: 0.1,
        }
    }
}

/// Selection variants
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionKind {
    Truncation,
    #[default]
    Tournament,
}

/// Selection parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    pub kind: SelectionKind,
    /// Breeding fraction for truncation
    pub survival_rate: f64,
    /// Competitors per tournament
    pub tournament_size: usize,
    /// Best individuals carried over unchanged
    pub elite_count: usize,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            kind: SelectionKind::Tournament,
            survival_rate: 0.5,
            tournament_size: 3,
            elite_count: 1,
        }
    }
}

/// Settings for one run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmSettings {
    /// Individuals per generation
    pub population_size: usize,
    /// Hard cap on recorded generations
    pub max_generations: usize,
    /// Optimization direction
    pub objective: Objective,
    /// Seed for reproducible runs
    pub seed: Option<u64>,
    pub pairing: PairingSettings,
    pub crossover: CrossoverSettings,
    pub mutation: MutationSettings,
    pub selection: SelectionSettings,
    /// Early stopping criteria; any one firing ends the run
    pub termination: Vec<TerminationSettings>,
    /// Time allowed for one host re-solve
    pub evaluation_timeout_ms: u64,
    /// Evaluate individuals of a generation concurrently
    pub parallel_evaluation: bool,
}

impl Default for AlgorithmSettings {
    fn default() -> Self {
        Self {
            population_size: 50,
            max_generations: 100,
            objective: Objective::Maximize,
            seed: None,
            pairing: PairingSettings::default(),
            crossover: CrossoverSettings::default(),
            mutation: MutationSettings::default(),
            selection: SelectionSettings::default(),
            termination: Vec::new(),
            evaluation_timeout_ms: 30_000,
            parallel_evaluation: false,
        }
    }
}

impl AlgorithmSettings {
    /// Parse settings from JSON
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(json).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }

    /// Parse settings from TOML
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigurationError> {
        toml::from_str(text).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }

    /// Load settings from a `.toml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::Parse(format!("{}: {e}", path.display())))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            _ => Self::from_json_str(&text),
        }
    }

    /// Evaluation timeout as a duration
    pub fn evaluation_timeout(&self) -> Duration {
        Duration::from_millis(self.evaluation_timeout_ms)
    }

    /// Check run-level parameters against a strategy set
    pub fn validate_run(&self, strategies: &StrategySet) -> Result<(), ConfigurationError> {
        use crate::operators::traits::SelectionStrategy;

        if self.population_size == 0 {
            return Err(ConfigurationError::InvalidPopulationSize {
                min: 1,
                actual: self.population_size,
            });
        }
        if self.max_generations == 0 {
            return Err(ConfigurationError::InvalidGenerationCap);
        }
        let elite_count = strategies.selection.elite_count();
        if elite_count >= self.population_size {
            return Err(ConfigurationError::InvalidEliteCount {
                elite_count,
                population_size: self.population_size,
            });
        }
        Ok(())
    }

    /// Build the checked strategy set
    pub fn validate(&self) -> Result<StrategySet, ConfigurationError> {
        let pairing = Pairing::Distance(DistancePairing::from_selector(
            self.pairing.inbreeding_factor,
            self.pairing.distance_metric,
        )?);

        let crossover = match self.crossover.kind {
            CrossoverKind::SinglePoint => {
                Crossover::SinglePoint(SinglePointCrossover::new(self.crossover.rate)?)
            }
            CrossoverKind::TwoPoint => {
                Crossover::TwoPoint(TwoPointCrossover::new(self.crossover.rate)?)
            }
        };

        let mutation = match self.mutation.kind {
            MutationKind::Uniform => Mutation::Uniform(UniformMutation::new(self.mutation.rate)?),
            MutationKind::Creep => Mutation::Creep(CreepMutation::new(
                self.mutation.rate,
                self.mutation.step,
            )?),
        };

        let selection = match self.selection.kind {
            SelectionKind::Truncation => Selection::Truncation(TruncationSelection::new(
                self.selection.survival_rate,
                self.selection.elite_count,
            )?),
            SelectionKind::Tournament => Selection::Tournament(TournamentSelection::new(
                self.selection.tournament_size,
                self.selection.elite_count,
            )?),
        };

        let termination = self
            .termination
            .iter()
            .map(|t| t.build(self.objective))
            .collect::<Result<Vec<_>, _>>()?;

        let strategies = StrategySet {
            pairing,
            crossover,
            mutation,
            selection,
            termination,
        };
        self.validate_run(&strategies)?;
        Ok(strategies)
    }
}
