//! Evolutionary algorithm orchestrator
//!
//! Drives the generation loop as a small state machine:
//!
//! ```text
//! Idle -> Evaluating -> Evolving -> Evaluating -> ... -> Terminated
//! ```
//!
//! Each call to [`EvolutionaryAlgorithm::step`] evaluates one generation and
//! records it in the observer. The next generation is bred only from the
//! observer's latest, fully evaluated population.

use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use crate::config::AlgorithmSettings;
use crate::diagnostics::{
    EvolutionResult, EvolutionStats, GenerationStats, TerminationReason, TimingStats,
};
use crate::error::{ConfigurationError, EvaluationError, EvoResult, EvolutionError};
use crate::fitness::traits::{FitnessEvaluator, Objective};
use crate::genome::gene::Tick;
use crate::genome::pool::GenePool;
use crate::operators::traits::{CrossoverStrategy, MutationStrategy, SelectionStrategy};
use crate::operators::StrategySet;
use crate::population::individual::{IdSequence, Individual};
use crate::population::observer::Observer;
use crate::population::population::Population;
use crate::session::state::{RunToken, SessionState};
use crate::termination::{first_triggered, TerminationCriterion};

/// Orchestrator lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// Constructed, no population yet
    Idle,
    /// The working population is waiting on fitness
    Evaluating,
    /// The latest generation is recorded; the next one is not bred yet
    Evolving,
    /// Final; the instance is not reused
    Terminated,
}

/// Result of one [`EvolutionaryAlgorithm::step`]
#[derive(Clone, Debug)]
pub enum StepOutcome {
    /// A generation was evaluated and recorded
    GenerationComplete {
        /// Generation number, starting at 0
        generation: usize,
        /// Best fitness of the generation
        best_fitness: f64,
        /// Individuals that received the sentinel fitness
        degraded: usize,
    },
    /// The run is over
    Terminated(Box<EvolutionResult>),
}

/// Builder for [`EvolutionaryAlgorithm`]
pub struct EvolutionaryAlgorithmBuilder<E> {
    settings: AlgorithmSettings,
    pool: Option<GenePool>,
    strategies: Option<StrategySet>,
    evaluator: Option<E>,
    session: Option<(Arc<SessionState>, RunToken)>,
}

impl EvolutionaryAlgorithmBuilder<()> {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            settings: AlgorithmSettings::default(),
            pool: None,
            strategies: None,
            evaluator: None,
            session: None,
        }
    }
}

impl Default for EvolutionaryAlgorithmBuilder<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EvolutionaryAlgorithmBuilder<E> {
    /// Replace all settings
    pub fn settings(mut self, settings: AlgorithmSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the population size
    pub fn population_size(mut self, size: usize) -> Self {
        self.settings.population_size = size;
        self
    }

    /// Set the hard generation cap
    pub fn max_generations(mut self, max: usize) -> Self {
        self.settings.max_generations = max;
        self
    }

    /// Set the optimization direction
    pub fn objective(mut self, objective: Objective) -> Self {
        self.settings.objective = objective;
        self
    }

    /// Seed the random number generator
    pub fn seed(mut self, seed: u64) -> Self {
        self.settings.seed = Some(seed);
        self
    }

    /// Enable or disable parallel evaluation
    pub fn parallel_evaluation(mut self, enabled: bool) -> Self {
        self.settings.parallel_evaluation = enabled;
        self
    }

    /// Set the gene pool
    pub fn gene_pool(mut self, pool: GenePool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Use an explicit strategy set instead of the one described by the settings
    pub fn strategies(mut self, strategies: StrategySet) -> Self {
        self.strategies = Some(strategies);
        self
    }

    /// Attach the run to a session
    pub fn session(mut self, session: Arc<SessionState>, token: RunToken) -> Self {
        self.session = Some((session, token));
        self
    }

    /// Set the fitness evaluator
    pub fn evaluator<NewE>(self, evaluator: NewE) -> EvolutionaryAlgorithmBuilder<NewE>
    where
        NewE: FitnessEvaluator,
    {
        EvolutionaryAlgorithmBuilder {
            settings: self.settings,
            pool: self.pool,
            strategies: self.strategies,
            evaluator: Some(evaluator),
            session: self.session,
        }
    }
}

impl<E: FitnessEvaluator> EvolutionaryAlgorithmBuilder<E> {
    /// Build the orchestrator, validating everything up front
    pub fn build(self) -> EvoResult<EvolutionaryAlgorithm<E>> {
        let pool = self
            .pool
            .ok_or(ConfigurationError::Missing("Gene pool"))?;
        let evaluator = self
            .evaluator
            .ok_or(ConfigurationError::Missing("Fitness evaluator"))?;

        let strategies = match self.strategies {
            Some(strategies) => {
                self.settings.validate_run(&strategies)?;
                strategies
            }
            None => self.settings.validate()?,
        };

        let total_ticks = pool.total_ticks()?;

        if let Some((session, _)) = &self.session {
            let ids = session.genes();
            if !ids.is_empty() {
                pool.check_ids(&ids)?;
            }
        }

        let rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(EvolutionaryAlgorithm {
            settings: self.settings,
            pool,
            total_ticks,
            strategies,
            evaluator,
            session: self.session,
            rng,
            ids: IdSequence::new(),
            observer: Observer::new(),
            stats: EvolutionStats::new(),
            state: RunState::Idle,
            working: None,
            evaluations: 0,
            started: None,
            finished: None,
        })
    }
}

/// Generational evolutionary algorithm over a gene pool
pub struct EvolutionaryAlgorithm<E> {
    settings: AlgorithmSettings,
    pool: GenePool,
    total_ticks: Vec<Tick>,
    strategies: StrategySet,
    evaluator: E,
    session: Option<(Arc<SessionState>, RunToken)>,
    rng: StdRng,
    ids: IdSequence,
    observer: Observer,
    stats: EvolutionStats,
    state: RunState,
    working: Option<Population>,
    evaluations: usize,
    started: Option<Instant>,
    finished: Option<Box<EvolutionResult>>,
}

impl EvolutionaryAlgorithm<()> {
    /// Create a builder
    pub fn builder() -> EvolutionaryAlgorithmBuilder<()> {
        EvolutionaryAlgorithmBuilder::new()
    }
}

impl<E: FitnessEvaluator> EvolutionaryAlgorithm<E> {
    /// Current lifecycle state
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Recorded history so far
    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    /// Gene pool of this run
    pub fn gene_pool(&self) -> &GenePool {
        &self.pool
    }

    /// Settings of this run
    pub fn settings(&self) -> &AlgorithmSettings {
        &self.settings
    }

    /// Run token, if attached to a session
    pub fn token(&self) -> Option<RunToken> {
        self.session.as_ref().map(|(_, token)| *token)
    }

    /// Run until a termination condition is met
    pub fn run(&mut self) -> EvoResult<EvolutionResult> {
        loop {
            if let StepOutcome::Terminated(result) = self.step()? {
                return Ok(*result);
            }
        }
    }

    /// Advance by one generation
    ///
    /// Returns the finished result on every call after termination.
    pub fn step(&mut self) -> EvoResult<StepOutcome> {
        if let Some(result) = &self.finished {
            return Ok(StepOutcome::Terminated(result.clone()));
        }

        if self.is_superseded() {
            return Ok(StepOutcome::Terminated(self.finish(TerminationReason::Superseded)));
        }

        let mut evolution_time = std::time::Duration::ZERO;
        match self.state {
            RunState::Idle => self.initialize()?,
            RunState::Evolving => {
                let breed_start = Instant::now();
                self.breed()?;
                evolution_time = breed_start.elapsed();
            }
            RunState::Evaluating => {}
            // Only reachable after a fatal error left no result behind
            RunState::Terminated => {
                return Err(EvolutionError::Aborted(
                    "run stopped after a fatal error".to_string(),
                ));
            }
        }

        self.evaluate(evolution_time)
    }

    fn initialize(&mut self) -> EvoResult<()> {
        self.observer.reset();
        self.started = Some(Instant::now());
        let population = Population::random(
            self.settings.population_size,
            &self.pool,
            0,
            &mut self.ids,
            &mut self.rng,
        )?;
        info!(
            population_size = population.len(),
            genes = self.pool.len(),
            max_generations = self.settings.max_generations,
            "Starting evolution"
        );
        self.working = Some(population);
        self.state = RunState::Evaluating;
        Ok(())
    }

    /// Selection, pairing, crossover and mutation over the latest generation
    fn breed(&mut self) -> EvoResult<()> {
        let current = Arc::clone(
            self.observer
                .latest()
                .ok_or(EvolutionError::EmptyPopulation)?,
        );
        let objective = self.settings.objective;
        let next_generation = current.generation() + 1;
        let strategies = &self.strategies;

        let breeders = strategies
            .selection
            .breeding_pool(&current, objective, &mut self.rng);
        let pairs = strategies.pairing.prepare(&breeders)?;

        let needed = current.len() - strategies.selection.elite_count().min(current.len());
        let mut offspring = Vec::with_capacity(needed + 1);
        while offspring.len() < needed {
            let (a, b) = pairs.sample(&mut self.rng);
            let (mut child1, mut child2) = strategies.crossover.crossover(
                breeders[a].genome(),
                breeders[b].genome(),
                &mut self.rng,
            )?;
            strategies
                .mutation
                .mutate(&mut child1, &self.total_ticks, &mut self.rng);
            strategies
                .mutation
                .mutate(&mut child2, &self.total_ticks, &mut self.rng);

            offspring.push(Individual::new(self.ids.next_id(), child1, next_generation));
            if offspring.len() < needed {
                offspring.push(Individual::new(self.ids.next_id(), child2, next_generation));
            }
        }

        let survivors = strategies
            .selection
            .select_survivors(&current, offspring, objective)?;
        self.working = Some(Population::from_individuals(next_generation, survivors));
        self.state = RunState::Evaluating;
        Ok(())
    }

    /// Evaluate the working population and record it
    fn evaluate(&mut self, evolution_time: std::time::Duration) -> EvoResult<StepOutcome> {
        let mut population = self.working.take().ok_or(EvolutionError::EmptyPopulation)?;
        let objective = self.settings.objective;

        let eval_start = Instant::now();
        let evaluated = if self.settings.parallel_evaluation {
            population.evaluate_parallel(&self.evaluator, objective)
        } else {
            population.evaluate(&self.evaluator, objective)
        };
        let eval_time = eval_start.elapsed();

        let summary = match evaluated {
            Ok(summary) => summary,
            Err(EvaluationError::Superseded(stale)) => {
                debug!(run = %stale.actual, active = %stale.expected, "Evaluation superseded");
                return Ok(StepOutcome::Terminated(self.finish(TerminationReason::Superseded)));
            }
            Err(EvaluationError::Encoding(e)) => {
                error!(error = %e, "Genome could not be decoded, aborting run");
                self.state = RunState::Terminated;
                return Err(e.into());
            }
            Err(other) => {
                error!(error = %other, "Evaluation pass aborted");
                self.state = RunState::Terminated;
                return Err(EvolutionError::Aborted(other.to_string()));
            }
        };
        self.evaluations += summary.evaluated;
        if !summary.degraded.is_empty() {
            warn!(
                generation = population.generation(),
                degraded = summary.degraded.len(),
                "Generation completed with failed evaluations"
            );
        }

        let timing = TimingStats::new()
            .with_evaluation(eval_time)
            .with_evolution(evolution_time);
        let stats = GenerationStats::from_population(
            &population,
            objective,
            &self.total_ticks,
            self.evaluations,
        )
        .with_timing(timing);

        let generation = stats.generation;
        let best_fitness = stats.best_fitness;
        let degraded = stats.degraded;

        self.observer.append(population, stats.clone())?;
        self.stats.record(stats);
        debug!(
            generation,
            best = best_fitness,
            degraded,
            evaluations = self.evaluations,
            "Generation recorded"
        );

        if let Some((session, token)) = &self.session {
            if session.publish(*token, self.observer.snapshot()).is_err() {
                return Ok(StepOutcome::Terminated(self.finish(TerminationReason::Superseded)));
            }
        }

        if let Some(reason) = self.termination_reason() {
            return Ok(StepOutcome::Terminated(self.finish(reason)));
        }

        self.state = RunState::Evolving;
        Ok(StepOutcome::GenerationComplete {
            generation,
            best_fitness,
            degraded,
        })
    }

    fn termination_reason(&self) -> Option<TerminationReason> {
        if self.observer.len() >= self.settings.max_generations {
            return Some(TerminationReason::GenerationCap);
        }
        first_triggered(&self.strategies.termination, &self.observer)
            .map(|criterion| TerminationReason::Strategy(criterion.reason().to_string()))
    }

    fn is_superseded(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|(session, token)| !session.is_active(*token))
    }

    fn finish(&mut self, reason: TerminationReason) -> Box<EvolutionResult> {
        if let Some(result) = &self.finished {
            return result.clone();
        }

        self.state = RunState::Terminated;
        self.working = None;
        self.stats.set_termination_reason(&reason);
        if let Some(started) = self.started {
            self.stats.set_runtime(started.elapsed());
        }

        let objective = self.settings.objective;
        let result = Box::new(EvolutionResult {
            best: self.observer.best_individual(objective).cloned(),
            objective,
            generations: self.observer.len(),
            evaluations: self.evaluations,
            termination_reason: reason,
            stats: self.stats.clone(),
            observer: self.observer.snapshot(),
        });

        info!(
            generations = result.generations,
            evaluations = result.evaluations,
            best = ?result.best_fitness(),
            reason = %result.termination_reason,
            "Evolution finished"
        );

        self.finished = Some(result.clone());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::traits::{FnEvaluator, ValueEvaluator};
    use crate::genome::gene::Gene;
    use crate::genome::tick_genome::TickGenome;

    fn pool() -> GenePool {
        GenePool::new(vec![
            Gene::from_f64("x", -5.0, 5.0, 2).unwrap(),
            Gene::from_f64("y", -5.0, 5.0, 2).unwrap(),
        ])
        .unwrap()
    }

    fn sphere() -> impl FitnessEvaluator {
        ValueEvaluator::new(pool(), |values: &[f64]| {
            Ok(values.iter().map(|v| v * v).sum::<f64>())
        })
    }

    #[test]
    fn test_builder_requires_components() {
        let result = EvolutionaryAlgorithm::builder()
            .evaluator(sphere())
            .build();
        assert!(matches!(
            result,
            Err(EvolutionError::Configuration(ConfigurationError::Missing("Gene pool")))
        ));
    }

    #[test]
    fn test_builder_rejects_invalid_settings() {
        let mut settings = AlgorithmSettings::default();
        settings.crossover.rate = 3.0;
        let result = EvolutionaryAlgorithm::builder()
            .settings(settings)
            .gene_pool(pool())
            .evaluator(sphere())
            .build();
        assert!(matches!(result, Err(EvolutionError::Configuration(_))));
    }

    #[test]
    fn test_step_state_machine() {
        let mut ga = EvolutionaryAlgorithm::builder()
            .population_size(8)
            .max_generations(3)
            .seed(1)
            .gene_pool(pool())
            .evaluator(sphere())
            .build()
            .unwrap();

        assert_eq!(ga.state(), RunState::Idle);
        match ga.step().unwrap() {
            StepOutcome::GenerationComplete { generation, .. } => assert_eq!(generation, 0),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(ga.state(), RunState::Evolving);
        assert!(matches!(
            ga.step().unwrap(),
            StepOutcome::GenerationComplete { generation: 1, .. }
        ));
        let result = match ga.step().unwrap() {
            StepOutcome::Terminated(result) => result,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(ga.state(), RunState::Terminated);
        assert_eq!(result.generations, 3);
        assert_eq!(result.termination_reason, TerminationReason::GenerationCap);

        // Further steps return the same result
        assert!(matches!(ga.step().unwrap(), StepOutcome::Terminated(_)));
        assert_eq!(ga.observer().len(), 3);
    }

    #[test]
    fn test_minimize_improves() {
        let mut ga = EvolutionaryAlgorithm::builder()
            .population_size(30)
            .max_generations(40)
            .objective(Objective::Minimize)
            .seed(42)
            .gene_pool(pool())
            .evaluator(sphere())
            .build()
            .unwrap();

        let result = ga.run().unwrap();
        let history = result.observer.best_fitness_history();
        let best = result.best_fitness().unwrap();
        assert!(best <= history[0]);
        assert!(best < 2.0, "best {best} should approach 0");
    }

    #[test]
    fn test_elites_not_reevaluated() {
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let evaluator = FnEvaluator::new(|g: &TickGenome| {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(g[0] as f64)
        });
        let mut settings = AlgorithmSettings::default();
        settings.population_size = 10;
        settings.max_generations = 5;
        settings.selection.elite_count = 2;
        settings.seed = Some(9);

        let mut ga = EvolutionaryAlgorithm::builder()
            .settings(settings)
            .gene_pool(pool())
            .evaluator(evaluator)
            .build()
            .unwrap();
        let result = ga.run().unwrap();

        // 10 initial, then 8 new individuals in each of 4 later generations
        assert_eq!(result.evaluations, 10 + 4 * 8);
        drop(ga);
        assert_eq!(calls.into_inner(), 42);
    }

    #[test]
    fn test_failed_evaluation_degrades() {
        let evaluator = FnEvaluator::new(|g: &TickGenome| {
            if g[0] % 2 == 0 {
                Err(EvaluationError::Failed("solve failed".to_string()))
            } else {
                Ok(1.0)
            }
        });
        let mut ga = EvolutionaryAlgorithm::builder()
            .population_size(10)
            .max_generations(2)
            .seed(5)
            .gene_pool(pool())
            .evaluator(evaluator)
            .build()
            .unwrap();
        let result = ga.run().unwrap();
        assert_eq!(result.generations, 2);
        for population in result.observer.generations() {
            assert_eq!(population.len(), 10);
            assert!(population.all_evaluated());
        }
    }
}
