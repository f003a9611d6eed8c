//! Remote fitness evaluation over HTTP
//!
//! The evaluator posts `{"ticks": [...], "values": [...]}` and expects
//! `{"fitness": <number>}` back. Like the host bridge it blocks on a runtime
//! handle and must only be used from blocking threads.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

use crate::coordinator::{EvaluatorFactory, RunRequest};
use crate::error::{ConfigurationError, EvaluationError};
use crate::fitness::traits::FitnessEvaluator;
use crate::genome::gene::Tick;
use crate::genome::pool::GenePool;
use crate::genome::tick_genome::TickGenome;

#[derive(Serialize)]
struct EvaluateRequest<'a> {
    ticks: &'a [Tick],
    values: Vec<f64>,
}

#[derive(Deserialize)]
struct EvaluateResponse {
    fitness: f64,
}

/// Scores genomes by calling an HTTP endpoint
pub struct RemoteEvaluator {
    url: String,
    pool: GenePool,
    http: reqwest::Client,
    runtime: Handle,
    timeout: Duration,
}

impl RemoteEvaluator {
    pub fn new(
        url: impl Into<String>,
        pool: GenePool,
        http: reqwest::Client,
        runtime: Handle,
        timeout: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            pool,
            http,
            runtime,
            timeout,
        }
    }

    async fn call(&self, genome: &TickGenome, values: Vec<f64>) -> Result<f64, EvaluationError> {
        let body = EvaluateRequest {
            ticks: genome.ticks(),
            values,
        };
        let resp = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EvaluationError::Failed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(EvaluationError::Failed(format!(
                "evaluator returned {status}"
            )));
        }

        let reply: EvaluateResponse = resp
            .json()
            .await
            .map_err(|e| EvaluationError::Failed(format!("invalid evaluator reply: {e}")))?;
        Ok(reply.fitness)
    }
}

impl FitnessEvaluator for RemoteEvaluator {
    fn evaluate(&self, genome: &TickGenome) -> Result<f64, EvaluationError> {
        let values = self.pool.decode_genome_f64(genome)?;
        self.runtime.block_on(async {
            tokio::time::timeout(self.timeout, self.call(genome, values))
                .await
                .map_err(|_| EvaluationError::Timeout(self.timeout))?
        })
    }
}

/// Builds a [`RemoteEvaluator`] from each request's `evaluate_url`
#[derive(Clone, Debug)]
pub struct RemoteEvaluatorFactory {
    http: reqwest::Client,
    runtime: Handle,
}

impl RemoteEvaluatorFactory {
    pub fn new(runtime: Handle) -> Self {
        Self {
            http: reqwest::Client::new(),
            runtime,
        }
    }
}

impl EvaluatorFactory for RemoteEvaluatorFactory {
    fn create(
        &self,
        request: &RunRequest,
        pool: &GenePool,
    ) -> Result<Box<dyn FitnessEvaluator>, ConfigurationError> {
        let url = request
            .evaluate_url
            .clone()
            .ok_or(ConfigurationError::Missing("Evaluation URL"))?;
        Ok(Box::new(RemoteEvaluator::new(
            url,
            pool.clone(),
            self.http.clone(),
            self.runtime.clone(),
            request.settings.evaluation_timeout(),
        )))
    }
}
