//! Diagnostics and statistics
//!
//! Per-generation statistics, whole-run statistics and the run result.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fitness::traits::Objective;
use crate::genome::gene::Tick;
use crate::genome::pool::GenePool;
use crate::population::individual::Individual;
use crate::population::observer::Observer;
use crate::population::population::Population;

/// Statistics for a single generation
///
/// Fitness figures ignore individuals holding the failed-evaluation sentinel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Generation number
    pub generation: usize,
    /// Total fitness evaluations so far
    pub evaluations: usize,
    /// Best fitness in this generation
    #[serde(with = "crate::serde_float")]
    pub best_fitness: f64,
    /// Worst fitness in this generation
    #[serde(with = "crate::serde_float")]
    pub worst_fitness: f64,
    /// Mean fitness
    #[serde(with = "crate::serde_float")]
    pub mean_fitness: f64,
    /// Median fitness
    #[serde(with = "crate::serde_float")]
    pub median_fitness: f64,
    /// Fitness standard deviation
    pub fitness_std: f64,
    /// Normalized genome diversity in `[0, 1]`
    pub diversity: f64,
    /// Number of distinct genomes
    pub distinct_genomes: usize,
    /// Individuals that received the sentinel fitness
    pub degraded: usize,
    /// Timing information
    pub timing: TimingStats,
}

/// Timing statistics
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingStats {
    /// Time spent waiting on fitness evaluation (ms)
    pub evaluation_ms: f64,
    /// Time spent producing the generation's genomes (ms)
    pub evolution_ms: f64,
}

impl TimingStats {
    /// Create new timing stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Set evaluation time
    pub fn with_evaluation(mut self, duration: Duration) -> Self {
        self.evaluation_ms = duration.as_secs_f64() * 1000.0;
        self
    }

    /// Set evolution time
    pub fn with_evolution(mut self, duration: Duration) -> Self {
        self.evolution_ms = duration.as_secs_f64() * 1000.0;
        self
    }

    /// Total of all phases (ms)
    pub fn total_ms(&self) -> f64 {
        self.evaluation_ms + self.evolution_ms
    }
}

impl GenerationStats {
    /// Compute statistics from an evaluated population
    pub fn from_population(
        population: &Population,
        objective: Objective,
        total_ticks: &[Tick],
        evaluations: usize,
    ) -> Self {
        let mut fitnesses = population.fitness_values();
        let generation = population.generation();
        let diversity = population.normalized_diversity(total_ticks);
        let distinct_genomes = population.distinct_genomes();
        let degraded = population.count_degraded();

        if fitnesses.is_empty() {
            return Self {
                generation,
                evaluations,
                best_fitness: objective.worst(),
                worst_fitness: objective.worst(),
                mean_fitness: objective.worst(),
                median_fitness: objective.worst(),
                fitness_std: 0.0,
                diversity,
                distinct_genomes,
                degraded,
                timing: TimingStats::default(),
            };
        }

        // Best first
        fitnesses.sort_by(|a, b| objective.compare(*a, *b));

        let n = fitnesses.len();
        let best = fitnesses[0];
        let worst = fitnesses[n - 1];
        let mean = fitnesses.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (fitnesses[n / 2 - 1] + fitnesses[n / 2]) / 2.0
        } else {
            fitnesses[n / 2]
        };
        let variance = if n > 1 {
            fitnesses.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };

        Self {
            generation,
            evaluations,
            best_fitness: best,
            worst_fitness: worst,
            mean_fitness: mean,
            median_fitness: median,
            fitness_std: variance.sqrt(),
            diversity,
            distinct_genomes,
            degraded,
            timing: TimingStats::default(),
        }
    }

    /// Set timing information
    pub fn with_timing(mut self, timing: TimingStats) -> Self {
        self.timing = timing;
        self
    }
}

/// Why a run stopped
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TerminationReason {
    /// The hard generation cap was reached
    GenerationCap,
    /// A termination strategy fired
    Strategy(String),
    /// A newer run took over the session
    Superseded,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GenerationCap => write!(f, "Maximum generations reached"),
            Self::Strategy(reason) => write!(f, "{reason}"),
            Self::Superseded => write!(f, "Superseded by a newer run"),
        }
    }
}

/// Statistics collector for an entire evolution run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Statistics per generation
    pub generations: Vec<GenerationStats>,
    /// Total runtime in milliseconds
    pub total_runtime_ms: f64,
    /// Reason for termination
    pub termination_reason: Option<String>,
}

impl EvolutionStats {
    /// Create a new stats collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a generation's statistics
    pub fn record(&mut self, stats: GenerationStats) {
        self.generations.push(stats);
    }

    /// Get the number of generations recorded
    pub fn num_generations(&self) -> usize {
        self.generations.len()
    }

    /// Get the best fitness across all generations
    pub fn best_fitness(&self, objective: Objective) -> Option<f64> {
        self.generations
            .iter()
            .map(|g| g.best_fitness)
            .min_by(|a, b| objective.compare(*a, *b))
    }

    /// Get the final best fitness
    pub fn final_best_fitness(&self) -> Option<f64> {
        self.generations.last().map(|g| g.best_fitness)
    }

    /// Total evaluations that received the sentinel fitness
    pub fn degraded_evaluations(&self) -> usize {
        self.generations.iter().map(|g| g.degraded).sum()
    }

    /// Set the termination reason
    pub fn set_termination_reason(&mut self, reason: &TerminationReason) {
        self.termination_reason = Some(reason.to_string());
    }

    /// Set the total runtime
    pub fn set_runtime(&mut self, duration: Duration) {
        self.total_runtime_ms = duration.as_secs_f64() * 1000.0;
    }

    /// Get a summary of the evolution run
    pub fn summary(&self, objective: Objective) -> String {
        let best = self.best_fitness(objective).unwrap_or(objective.worst());
        let final_best = self.final_best_fitness().unwrap_or(objective.worst());

        format!(
            "Evolution Summary:\n\
             - Generations: {}\n\
             - Best fitness: {:.6}\n\
             - Final best: {:.6}\n\
             - Degraded evaluations: {}\n\
             - Runtime: {:.2}ms\n\
             - Termination: {}",
            self.num_generations(),
            best,
            final_best,
            self.degraded_evaluations(),
            self.total_runtime_ms,
            self.termination_reason.as_deref().unwrap_or("unknown")
        )
    }
}

/// Result of an evolution run
#[derive(Clone, Debug)]
pub struct EvolutionResult {
    /// The best individual found, if any evaluation succeeded
    pub best: Option<Individual>,
    /// Direction the run optimized in
    pub objective: Objective,
    /// Number of generations recorded
    pub generations: usize,
    /// Total fitness evaluations
    pub evaluations: usize,
    /// Why the run stopped
    pub termination_reason: TerminationReason,
    /// Statistics for the run
    pub stats: EvolutionStats,
    /// Final history snapshot
    pub observer: Observer,
}

impl EvolutionResult {
    /// Best fitness found
    pub fn best_fitness(&self) -> Option<f64> {
        self.best.as_ref().and_then(Individual::fitness)
    }

    /// Decoded parameter values of the best individual
    pub fn best_values(&self, pool: &GenePool) -> Option<Vec<f64>> {
        self.best
            .as_ref()
            .and_then(|b| pool.decode_genome_f64(b.genome()).ok())
    }

    /// Whether the run stopped because it was superseded
    pub fn is_superseded(&self) -> bool {
        self.termination_reason == TerminationReason::Superseded
    }
}

pub mod prelude {
    pub use super::{
        EvolutionResult, EvolutionStats, GenerationStats, TerminationReason, TimingStats,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::tick_genome::TickGenome;
    use crate::population::individual::IndividualId;

    fn create_test_population() -> Population {
        let individuals = (1..=5)
            .map(|i| {
                Individual::with_fitness(
                    IndividualId(i),
                    TickGenome::new(vec![i as Tick]),
                    3,
                    i as f64 * 10.0,
                )
            })
            .collect();
        Population::from_individuals(3, individuals)
    }

    #[test]
    fn test_generation_stats_from_population() {
        let pop = create_test_population();
        let stats = GenerationStats::from_population(&pop, Objective::Maximize, &[10], 100);

        assert_eq!(stats.generation, 3);
        assert_eq!(stats.evaluations, 100);
        assert_eq!(stats.best_fitness, 50.0);
        assert_eq!(stats.worst_fitness, 10.0);
        assert_eq!(stats.mean_fitness, 30.0);
        assert_eq!(stats.median_fitness, 30.0);
        assert_eq!(stats.distinct_genomes, 5);
        assert_eq!(stats.degraded, 0);
        assert!(stats.fitness_std > 15.0 && stats.fitness_std < 16.0);
        assert!(stats.diversity > 0.0 && stats.diversity <= 1.0);
    }

    #[test]
    fn test_generation_stats_minimize() {
        let pop = create_test_population();
        let stats = GenerationStats::from_population(&pop, Objective::Minimize, &[10], 5);
        assert_eq!(stats.best_fitness, 10.0);
        assert_eq!(stats.worst_fitness, 50.0);
    }

    #[test]
    fn test_generation_stats_ignores_degraded() {
        let mut individuals = create_test_population().into_individuals();
        individuals[0].set_degraded(Objective::Maximize);
        let pop = Population::from_individuals(3, individuals);
        let stats = GenerationStats::from_population(&pop, Objective::Maximize, &[10], 5);
        assert_eq!(stats.degraded, 1);
        assert_eq!(stats.worst_fitness, 20.0);
        assert_eq!(stats.mean_fitness, 35.0);
    }

    #[test]
    fn test_generation_stats_empty_population() {
        let pop = Population::new(0);
        let stats = GenerationStats::from_population(&pop, Objective::Maximize, &[10], 0);
        assert_eq!(stats.best_fitness, f64::NEG_INFINITY);
        assert_eq!(stats.worst_fitness, f64::NEG_INFINITY);
    }

    #[test]
    fn test_generation_stats_json_with_sentinel() {
        let pop = Population::new(0);
        let stats = GenerationStats::from_population(&pop, Objective::Minimize, &[10], 0);
        let json = serde_json::to_string(&stats).unwrap();
        let back: GenerationStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }

    #[test]
    fn test_evolution_stats_summary() {
        let mut stats = EvolutionStats::new();
        let pop = create_test_population();
        stats.record(GenerationStats::from_population(&pop, Objective::Maximize, &[10], 5));
        stats.set_termination_reason(&TerminationReason::Strategy(
            "Population diversity below threshold".to_string(),
        ));
        stats.set_runtime(Duration::from_millis(1234));

        let summary = stats.summary(Objective::Maximize);
        assert!(summary.contains("Generations: 1"));
        assert!(summary.contains("Best fitness: 50"));
        assert!(summary.contains("Population diversity below threshold"));
    }

    #[test]
    fn test_evolution_stats_best_respects_objective() {
        let mut stats = EvolutionStats::new();
        let pop = create_test_population();
        let mut first = GenerationStats::from_population(&pop, Objective::Minimize, &[10], 5);
        first.best_fitness = 4.0;
        let mut second = first.clone();
        second.best_fitness = 2.0;
        stats.record(first);
        stats.record(second);
        assert_eq!(stats.best_fitness(Objective::Minimize), Some(2.0));
        assert_eq!(stats.best_fitness(Objective::Maximize), Some(4.0));
    }

    #[test]
    fn test_timing_stats() {
        let timing = TimingStats::new()
            .with_evaluation(Duration::from_millis(100))
            .with_evolution(Duration::from_millis(20));
        assert!((timing.total_ms() - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_termination_reason_display() {
        assert_eq!(
            TerminationReason::GenerationCap.to_string(),
            "Maximum generations reached"
        );
        assert_eq!(
            TerminationReason::Strategy("done".to_string()).to_string(),
            "done"
        );
    }
}
