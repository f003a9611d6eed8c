//! Run coordinator
//!
//! Dispatches independent runs onto blocking worker threads and tracks their
//! status. Each job gets its own gene pool, settings and evaluator; nothing
//! is shared between jobs.

#[cfg(feature = "coordinator")]
pub mod http;
#[cfg(feature = "reporting")]
pub mod remote;

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{error, info};
use uuid::Uuid;

use crate::algorithms::evolutionary::EvolutionaryAlgorithm;
use crate::config::AlgorithmSettings;
use crate::diagnostics::{EvolutionResult, TerminationReason};
use crate::error::{ConfigurationError, EvoResult};
use crate::fitness::traits::FitnessEvaluator;
use crate::genome::gene::Gene;
use crate::genome::pool::GenePool;

#[cfg(feature = "reporting")]
use crate::reporting::{report::RunReport, webhook::WebhookReporter};
#[cfg(feature = "reporting")]
use tracing::debug;

/// Identifier of a submitted run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A run to dispatch
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunRequest {
    /// Genes in genome order
    pub genes: Vec<Gene>,
    #[serde(default)]
    pub settings: AlgorithmSettings,
    /// Endpoint that scores decoded parameter values
    #[serde(default)]
    pub evaluate_url: Option<String>,
}

/// Outcome of a completed run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub generations: usize,
    pub evaluations: usize,
    pub termination_reason: TerminationReason,
    #[serde(with = "crate::serde_float::option")]
    pub best_fitness: Option<f64>,
    pub best_values: Option<Vec<f64>>,
    pub degraded_evaluations: usize,
    pub runtime_ms: f64,
}

impl RunSummary {
    pub fn from_result(result: &EvolutionResult, pool: &GenePool) -> Self {
        Self {
            generations: result.generations,
            evaluations: result.evaluations,
            termination_reason: result.termination_reason.clone(),
            best_fitness: result.best_fitness(),
            best_values: result.best_values(pool),
            degraded_evaluations: result.stats.degraded_evaluations(),
            runtime_ms: result.stats.total_runtime_ms,
        }
    }
}

/// Lifecycle of a submitted run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed { summary: RunSummary },
    Failed { error: String },
}

impl JobStatus {
    /// Whether the job has stopped, successfully or not
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Creates the fitness evaluator for a submitted run
pub trait EvaluatorFactory: Send + Sync + 'static {
    fn create(
        &self,
        request: &RunRequest,
        pool: &GenePool,
    ) -> Result<Box<dyn FitnessEvaluator>, ConfigurationError>;
}

impl<F> EvaluatorFactory for F
where
    F: Fn(&RunRequest, &GenePool) -> Result<Box<dyn FitnessEvaluator>, ConfigurationError>
        + Send
        + Sync
        + 'static,
{
    fn create(
        &self,
        request: &RunRequest,
        pool: &GenePool,
    ) -> Result<Box<dyn FitnessEvaluator>, ConfigurationError> {
        self(request, pool)
    }
}

/// Finished jobs kept for status queries before the oldest is dropped
pub const DEFAULT_RETENTION: usize = 256;

/// Live status of every tracked job
///
/// Pending and running jobs are always kept. Finished jobs are kept up to
/// the retention limit, oldest evicted first.
struct JobTable {
    jobs: HashMap<JobId, watch::Sender<JobStatus>>,
    finished: VecDeque<JobId>,
    retention: usize,
}

impl JobTable {
    fn new(retention: usize) -> Self {
        Self {
            jobs: HashMap::new(),
            finished: VecDeque::new(),
            retention,
        }
    }

    fn insert(&mut self, id: JobId) {
        let (status, _) = watch::channel(JobStatus::Pending);
        self.jobs.insert(id, status);
    }

    /// Record a status; a finished job never changes again
    fn set(&mut self, id: JobId, status: JobStatus) {
        let Some(current) = self.jobs.get(&id) else {
            return;
        };
        if current.borrow().is_finished() {
            return;
        }
        let finished = status.is_finished();
        current.send_replace(status);

        if finished {
            self.finished.push_back(id);
            while self.finished.len() > self.retention {
                if let Some(evicted) = self.finished.pop_front() {
                    self.jobs.remove(&evicted);
                }
            }
        }
    }
}

type SharedJobs = Arc<RwLock<JobTable>>;

fn set_status(jobs: &SharedJobs, id: JobId, status: JobStatus) {
    jobs.write()
        .unwrap_or_else(PoisonError::into_inner)
        .set(id, status);
}

/// Dispatches and tracks independent runs
pub struct Coordinator {
    factory: Arc<dyn EvaluatorFactory>,
    jobs: SharedJobs,
    runtime: Handle,
    #[cfg(feature = "reporting")]
    reporter: Option<WebhookReporter>,
}

impl Coordinator {
    /// Create a coordinator spawning work on `runtime`
    pub fn new(factory: impl EvaluatorFactory, runtime: Handle) -> Self {
        Self {
            factory: Arc::new(factory),
            jobs: Arc::new(RwLock::new(JobTable::new(DEFAULT_RETENTION))),
            runtime,
            #[cfg(feature = "reporting")]
            reporter: None,
        }
    }

    /// Keep at most `retention` finished jobs
    pub fn with_retention(self, retention: usize) -> Self {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retention = retention;
        self
    }

    /// Post a report for every completed run
    #[cfg(feature = "reporting")]
    pub fn with_reporter(mut self, reporter: WebhookReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Validate and dispatch a run
    ///
    /// Invalid requests are rejected here; nothing is spawned for them. A
    /// worker that panics is recorded as failed.
    pub fn submit(&self, request: RunRequest) -> EvoResult<JobId> {
        let pool = GenePool::new(request.genes.clone())?;
        pool.total_ticks()?;
        request.settings.validate()?;
        let evaluator = self.factory.create(&request, &pool)?;

        let id = JobId::new();
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        info!(job = %id, genes = pool.len(), population_size = request.settings.population_size, "Run submitted");

        let jobs = Arc::clone(&self.jobs);
        let settings = request.settings;
        #[cfg(feature = "reporting")]
        let reporter = self.reporter.clone();
        #[cfg(feature = "reporting")]
        let runtime = self.runtime.clone();

        let worker = self.runtime.spawn_blocking(move || {
            set_status(&jobs, id, JobStatus::Running);
            let started = Instant::now();

            let outcome = EvolutionaryAlgorithm::builder()
                .settings(settings)
                .gene_pool(pool.clone())
                .evaluator(evaluator)
                .build()
                .and_then(|mut algorithm| algorithm.run());

            match outcome {
                Ok(result) => {
                    info!(
                        job = %id,
                        generations = result.generations,
                        best = ?result.best_fitness(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Run completed"
                    );
                    #[cfg(feature = "reporting")]
                    if let Some(reporter) = &reporter {
                        match RunReport::from_result(&result, &pool) {
                            Ok(report) => match runtime.block_on(reporter.send_run(&report)) {
                                Ok(()) => {
                                    debug!(job = %id, url = reporter.url(), "Run report delivered")
                                }
                                // The reporter already warned; the run result stands
                                Err(e) => {
                                    debug!(job = %id, error = %e, "Run report not delivered")
                                }
                            },
                            Err(e) => error!(job = %id, error = %e, "Failed to build run report"),
                        }
                    }
                    let summary = RunSummary::from_result(&result, &pool);
                    set_status(&jobs, id, JobStatus::Completed { summary });
                }
                Err(e) => {
                    error!(job = %id, error = %e, "Run failed");
                    set_status(&jobs, id, JobStatus::Failed { error: e.to_string() });
                }
            }
        });

        let jobs = Arc::clone(&self.jobs);
        self.runtime.spawn(async move {
            if let Err(e) = worker.await {
                error!(job = %id, error = %e, "Run worker panicked");
                set_status(
                    &jobs,
                    id,
                    JobStatus::Failed {
                        error: format!("Run worker panicked: {e}"),
                    },
                );
            }
        });

        Ok(id)
    }

    /// Current status of a job
    ///
    /// `None` for unknown jobs and for finished jobs past the retention limit.
    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .jobs
            .get(&id)
            .map(|status| status.borrow().clone())
    }

    /// All tracked jobs
    pub fn jobs(&self) -> Vec<(JobId, JobStatus)> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .jobs
            .iter()
            .map(|(id, status)| (*id, status.borrow().clone()))
            .collect()
    }

    /// Wait for a job to finish and return its final status
    pub async fn wait(&self, id: JobId) -> Option<JobStatus> {
        let mut updates = self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .jobs
            .get(&id)?
            .subscribe();

        let result = match updates.wait_for(JobStatus::is_finished).await {
            Ok(status) => Some(status.clone()),
            // Evicted while waiting
            Err(_) => self.status(id),
        };
        result
    }
}

pub mod prelude {
    pub use super::{
        Coordinator, EvaluatorFactory, JobId, JobStatus, RunRequest, RunSummary,
    };
}
