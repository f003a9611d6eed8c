//! Fitness traits
//!
//! This module defines the evaluation boundary between the engine and the
//! host that re-solves the parametric model.

use serde::{Deserialize, Serialize};

use crate::error::EvaluationError;
use crate::genome::pool::GenePool;
use crate::genome::tick_genome::TickGenome;

/// Direction of optimization
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Higher fitness is better
    #[default]
    Maximize,
    /// Lower fitness is better
    Minimize,
}

impl Objective {
    /// Check if `a` is strictly better than `b`
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            Self::Maximize => a > b,
            Self::Minimize => a < b,
        }
    }

    /// Sentinel fitness assigned to individuals whose evaluation failed
    pub fn worst(self) -> f64 {
        match self {
            Self::Maximize => f64::NEG_INFINITY,
            Self::Minimize => f64::INFINITY,
        }
    }

    /// Ordering that sorts better fitness first
    pub fn compare(self, a: f64, b: f64) -> std::cmp::Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal);
        match self {
            Self::Maximize => ord.reverse(),
            Self::Minimize => ord,
        }
    }
}

/// Fitness evaluation boundary
///
/// Provided by the host. Must be idempotent for the same genome; may be slow.
/// The engine calls it at most once per individual per generation.
pub trait FitnessEvaluator: Send + Sync {
    /// Evaluate a genome and return its fitness
    fn evaluate(&self, genome: &TickGenome) -> Result<f64, EvaluationError>;
}

impl<E: FitnessEvaluator + ?Sized> FitnessEvaluator for Box<E> {
    fn evaluate(&self, genome: &TickGenome) -> Result<f64, EvaluationError> {
        (**self).evaluate(genome)
    }
}

impl<E: FitnessEvaluator + ?Sized> FitnessEvaluator for std::sync::Arc<E> {
    fn evaluate(&self, genome: &TickGenome) -> Result<f64, EvaluationError> {
        (**self).evaluate(genome)
    }
}

/// A closure over raw tick vectors
pub struct FnEvaluator<F>
where
    F: Fn(&TickGenome) -> Result<f64, EvaluationError>,
{
    f: F,
}

impl<F> FnEvaluator<F>
where
    F: Fn(&TickGenome) -> Result<f64, EvaluationError>,
{
    /// Create a new function-based evaluator
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> FitnessEvaluator for FnEvaluator<F>
where
    F: Fn(&TickGenome) -> Result<f64, EvaluationError> + Send + Sync,
{
    fn evaluate(&self, genome: &TickGenome) -> Result<f64, EvaluationError> {
        (self.f)(genome)
    }
}

/// A closure over decoded parameter values
///
/// The genome is decoded through the gene pool before the closure sees it,
/// which is how a host usually wants its parameters.
pub struct ValueEvaluator<F>
where
    F: Fn(&[f64]) -> Result<f64, EvaluationError>,
{
    pool: GenePool,
    f: F,
}

impl<F> ValueEvaluator<F>
where
    F: Fn(&[f64]) -> Result<f64, EvaluationError>,
{
    /// Create a new value-based evaluator
    pub fn new(pool: GenePool, f: F) -> Self {
        Self { pool, f }
    }
}

impl<F> FitnessEvaluator for ValueEvaluator<F>
where
    F: Fn(&[f64]) -> Result<f64, EvaluationError> + Send + Sync,
{
    fn evaluate(&self, genome: &TickGenome) -> Result<f64, EvaluationError> {
        let values = self.pool.decode_genome_f64(genome)?;
        (self.f)(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::gene::Gene;

    #[test]
    fn test_objective_is_better() {
        assert!(Objective::Maximize.is_better(2.0, 1.0));
        assert!(!Objective::Maximize.is_better(1.0, 1.0));
        assert!(Objective::Minimize.is_better(1.0, 2.0));
    }

    #[test]
    fn test_objective_worst_sentinel() {
        assert!(Objective::Maximize.is_better(-1e300, Objective::Maximize.worst()));
        assert!(Objective::Minimize.is_better(1e300, Objective::Minimize.worst()));
    }

    #[test]
    fn test_objective_compare_sorts_best_first() {
        let mut values = vec![1.0, 3.0, 2.0];
        values.sort_by(|a, b| Objective::Maximize.compare(*a, *b));
        assert_eq!(values, vec![3.0, 2.0, 1.0]);
        values.sort_by(|a, b| Objective::Minimize.compare(*a, *b));
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_fn_evaluator() {
        let evaluator = FnEvaluator::new(|g: &TickGenome| Ok(g.ticks().iter().sum::<i64>() as f64));
        assert_eq!(evaluator.evaluate(&TickGenome::new(vec![1, 2, 3])), Ok(6.0));
    }

    #[test]
    fn test_value_evaluator_decodes() {
        let pool = GenePool::new(vec![Gene::from_f64("x", 0.0, 1.0, 1).unwrap()]).unwrap();
        let evaluator = ValueEvaluator::new(pool, |values: &[f64]| Ok(values[0] * 2.0));
        assert_eq!(evaluator.evaluate(&TickGenome::new(vec![5])), Ok(1.0));
        assert!(matches!(
            evaluator.evaluate(&TickGenome::new(vec![50])),
            Err(EvaluationError::Encoding(_))
        ));
    }
}
