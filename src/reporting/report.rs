//! JSON run reports
//!
//! Reports carry genomes both as raw ticks and as decoded parameter values so
//! a consumer never needs the gene pool to read them.

use serde::{Deserialize, Serialize};

use crate::diagnostics::{EvolutionResult, GenerationStats, TerminationReason};
use crate::error::{EncodingError, ReportError};
use crate::fitness::traits::Objective;
use crate::genome::gene::Tick;
use crate::genome::pool::GenePool;
use crate::population::individual::{Individual, IndividualId};
use crate::population::population::Population;
use crate::session::RunToken;

/// One individual as reported
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndividualReport {
    pub id: IndividualId,
    pub generation: usize,
    pub ticks: Vec<Tick>,
    /// Decoded values in gene pool order
    pub values: Vec<f64>,
    #[serde(with = "crate::serde_float::option")]
    pub fitness: Option<f64>,
    /// The evaluation failed and the fitness is the sentinel
    pub degraded: bool,
}

impl IndividualReport {
    pub fn new(individual: &Individual, pool: &GenePool) -> Result<Self, EncodingError> {
        Ok(Self {
            id: individual.id(),
            generation: individual.generation(),
            ticks: individual.genome().ticks().to_vec(),
            values: pool.decode_genome_f64(individual.genome())?,
            fitness: individual.fitness(),
            degraded: individual.is_degraded(),
        })
    }
}

/// One generation as reported
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub generation: usize,
    pub stats: GenerationStats,
    pub individuals: Vec<IndividualReport>,
}

impl GenerationReport {
    /// Build from a recorded generation, best individuals first
    pub fn new(
        population: &Population,
        stats: &GenerationStats,
        pool: &GenePool,
        objective: Objective,
    ) -> Result<Self, EncodingError> {
        let individuals = population
            .ranked(objective)
            .into_iter()
            .map(|individual| IndividualReport::new(individual, pool))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            generation: population.generation(),
            stats: stats.clone(),
            individuals,
        })
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Summary of a finished run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub run: Option<RunToken>,
    /// Gene identifiers in genome order
    pub genes: Vec<String>,
    pub objective: Objective,
    pub generations: usize,
    pub evaluations: usize,
    pub termination_reason: TerminationReason,
    pub best: Option<IndividualReport>,
    /// Per-generation statistics
    pub history: Vec<GenerationStats>,
    /// Every individual of the last recorded generation
    pub final_generation: Option<GenerationReport>,
}

impl RunReport {
    pub fn from_result(result: &EvolutionResult, pool: &GenePool) -> Result<Self, EncodingError> {
        let best = result
            .best
            .as_ref()
            .map(|individual| IndividualReport::new(individual, pool))
            .transpose()?;

        let observer = &result.observer;
        let final_generation = match (observer.latest(), observer.latest_stats()) {
            (Some(population), Some(stats)) => Some(GenerationReport::new(
                population,
                stats,
                pool,
                result.objective,
            )?),
            _ => None,
        };

        Ok(Self {
            run: None,
            genes: pool.ids().into_iter().map(str::to_string).collect(),
            objective: result.objective,
            generations: result.generations,
            evaluations: result.evaluations,
            termination_reason: result.termination_reason.clone(),
            best,
            history: observer.stats().to_vec(),
            final_generation,
        })
    }

    /// Tag the report with the run that produced it
    pub fn with_run(mut self, token: RunToken) -> Self {
        self.run = Some(token);
        self
    }

    pub fn best_fitness(&self) -> Option<f64> {
        self.best.as_ref().and_then(|b| b.fitness)
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::evolutionary::EvolutionaryAlgorithm;
    use crate::error::EvaluationError;
    use crate::fitness::traits::FnEvaluator;
    use crate::genome::gene::Gene;
    use crate::genome::tick_genome::TickGenome;

    fn pool() -> GenePool {
        GenePool::new(vec![
            Gene::from_f64("width", 0.0, 10.0, 1).unwrap(),
            Gene::from_f64("height", 0.0, 1.0, 2).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_individual_report_decodes_values() {
        let individual =
            Individual::with_fitness(IndividualId(4), TickGenome::new(vec![25, 50]), 3, 1.5);
        let report = IndividualReport::new(&individual, &pool()).unwrap();
        assert_eq!(report.ticks, vec![25, 50]);
        assert!((report.values[0] - 2.5).abs() < 1e-12);
        assert!((report.values[1] - 0.5).abs() < 1e-12);
        assert_eq!(report.fitness, Some(1.5));
        assert_eq!(report.generation, 3);
        assert!(!report.degraded);
    }

    #[test]
    fn test_run_report_from_result() {
        let evaluator = FnEvaluator::new(|g: &TickGenome| {
            if g[0] == 0 {
                Err(EvaluationError::Failed("no solution".to_string()))
            } else {
                Ok(g[0] as f64 + g[1] as f64)
            }
        });
        let mut ga = EvolutionaryAlgorithm::builder()
            .population_size(6)
            .max_generations(3)
            .seed(11)
            .gene_pool(pool())
            .evaluator(evaluator)
            .build()
            .unwrap();
        let result = ga.run().unwrap();

        let report = RunReport::from_result(&result, &pool())
            .unwrap()
            .with_run(RunToken(2));
        assert_eq!(report.genes, vec!["width".to_string(), "height".to_string()]);
        assert_eq!(report.generations, 3);
        assert_eq!(report.history.len(), 3);
        assert_eq!(report.best_fitness(), result.best_fitness());

        let last = report.final_generation.as_ref().unwrap();
        assert_eq!(last.generation, 2);
        assert_eq!(last.individuals.len(), 6);

        let json = report.to_json().unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.run, Some(RunToken(2)));
        assert_eq!(parsed.termination_reason, TerminationReason::GenerationCap);
    }
}
