//! Host bridge
//!
//! Turns the host's schedule-a-solve-then-call-back protocol into an
//! explicit request and reply. The orchestrator side sends a
//! [`SolveRequest`] on a channel and blocks until the host answers on the
//! request's oneshot, or until the timeout elapses. Replies are checked
//! against the run token before they are accepted.
//!
//! [`HostBridge::evaluate`] blocks on the runtime handle, so it must be
//! called from a blocking thread (`spawn_blocking` or a plain thread), never
//! from inside an async task.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::{EvaluationError, StaleRunError};
use crate::fitness::traits::FitnessEvaluator;
use crate::genome::pool::GenePool;
use crate::genome::tick_genome::TickGenome;
use crate::session::state::{RunToken, SessionState};

/// Default time allowed for one host re-solve
pub const DEFAULT_SOLVE_TIMEOUT: Duration = Duration::from_secs(30);

/// A request for the host to re-solve its model for one genome
#[derive(Debug)]
pub struct SolveRequest {
    /// Run the request belongs to
    pub token: RunToken,
    /// Genome being evaluated
    pub genome: TickGenome,
    /// Decoded parameter values, in gene pool order
    pub values: Vec<f64>,
    /// Where the host sends the result
    pub reply: oneshot::Sender<SolveReply>,
}

impl SolveRequest {
    /// Answer the request
    pub fn respond(self, fitness: Result<f64, String>) {
        let reply = SolveReply {
            token: self.token,
            fitness,
        };
        if self.reply.send(reply).is_err() {
            debug!(run = %self.token, "Solve reply dropped; requester gone");
        }
    }
}

/// The host's answer to a [`SolveRequest`]
#[derive(Clone, Debug, PartialEq)]
pub struct SolveReply {
    /// Run the reply belongs to
    pub token: RunToken,
    /// Fitness, or the host's failure message
    pub fitness: Result<f64, String>,
}

/// Fitness evaluator that delegates to the host over a channel
pub struct HostBridge {
    session: Arc<SessionState>,
    token: RunToken,
    pool: GenePool,
    requests: mpsc::Sender<SolveRequest>,
    runtime: Handle,
    timeout: Duration,
}

impl HostBridge {
    /// Create a bridge for one run
    pub fn new(
        session: Arc<SessionState>,
        token: RunToken,
        pool: GenePool,
        requests: mpsc::Sender<SolveRequest>,
        runtime: Handle,
    ) -> Self {
        Self {
            session,
            token,
            pool,
            requests,
            runtime,
            timeout: DEFAULT_SOLVE_TIMEOUT,
        }
    }

    /// Set the time allowed for one host re-solve
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run this bridge serves
    pub fn token(&self) -> RunToken {
        self.token
    }

    fn accept(&self, reply: SolveReply) -> Result<f64, EvaluationError> {
        if reply.token != self.token {
            debug!(
                run = %self.token,
                reply = %reply.token,
                "Discarding reply for another run"
            );
            self.session.ensure_active(self.token)?;
            return Err(EvaluationError::Failed(format!(
                "host answered for {} instead of {}",
                reply.token, self.token
            )));
        }

        // The run may have been superseded while the solve was outstanding.
        if let Err(stale) = self.session.ensure_active(self.token) {
            debug!(run = %self.token, active = %stale.expected, "Discarding stale solve result");
            return Err(stale.into());
        }

        match reply.fitness {
            Ok(fitness) if fitness.is_finite() => Ok(fitness),
            Ok(fitness) => Err(EvaluationError::NonFinite(fitness)),
            Err(message) => Err(EvaluationError::Failed(message)),
        }
    }
}

impl FitnessEvaluator for HostBridge {
    fn evaluate(&self, genome: &TickGenome) -> Result<f64, EvaluationError> {
        self.session.ensure_active(self.token)?;
        let values = self.pool.decode_genome_f64(genome)?;

        let (reply, response) = oneshot::channel();
        let request = SolveRequest {
            token: self.token,
            genome: genome.clone(),
            values,
            reply,
        };

        let received = self.runtime.block_on(async {
            self.requests
                .send(request)
                .await
                .map_err(|_| EvaluationError::BridgeClosed)?;
            match tokio::time::timeout(self.timeout, response).await {
                Ok(Ok(reply)) => Ok(reply),
                Ok(Err(_)) => Err(EvaluationError::BridgeClosed),
                Err(_) => Err(EvaluationError::Timeout(self.timeout)),
            }
        })?;

        self.accept(received)
    }
}

/// Create the request channel between bridges and the host
pub fn solve_channel(capacity: usize) -> (mpsc::Sender<SolveRequest>, mpsc::Receiver<SolveRequest>) {
    mpsc::channel(capacity.max(1))
}

/// Host-side loop answering solve requests until every bridge is dropped
pub async fn serve<F, Fut>(mut requests: mpsc::Receiver<SolveRequest>, mut solve: F)
where
    F: FnMut(Vec<f64>) -> Fut,
    Fut: Future<Output = Result<f64, String>>,
{
    while let Some(request) = requests.recv().await {
        let fitness = solve(request.values.clone()).await;
        request.respond(fitness);
    }
}

/// Check a reply token without a bridge, for hosts that route replies themselves
pub fn check_reply(session: &SessionState, reply: &SolveReply) -> Result<(), StaleRunError> {
    session.ensure_active(reply.token)
}
