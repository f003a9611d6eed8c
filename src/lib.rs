//! # genepool-evo
//!
//! A tick-encoded evolutionary optimization engine for parametric design
//! hosts.
//!
//! Each host parameter is described by a [`Gene`](genome::gene::Gene) with
//! decimal bounds and a precision. The engine discretizes every gene into
//! integer ticks, evolves tick vectors, and hands decoded values back to the
//! host for fitness evaluation.
//!
//! ## Core Concepts
//!
//! - **Tick codec**: exact decimal round-trips between ticks and values
//! - **Strategy sets**: pairing, crossover, mutation, selection and termination
//!   chosen from closed sets of variants
//! - **Observer**: append-only generation history that breeding reads from
//! - **Sessions**: run tokens that let a newer run supersede an older one
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use genepool_evo::prelude::*;
//!
//! let pool = GenePool::new(vec![
//!     Gene::from_f64("width", 1.0, 5.0, 2)?,
//!     Gene::from_f64("height", 1.0, 5.0, 2)?,
//! ])?;
//!
//! let evaluator = ValueEvaluator::new(pool.clone(), |v: &[f64]| Ok(v[0] * v[1]));
//!
//! let result = EvolutionaryAlgorithm::builder()
//!     .population_size(40)
//!     .max_generations(50)
//!     .objective(Objective::Minimize)
//!     .seed(42)
//!     .gene_pool(pool)
//!     .evaluator(evaluator)
//!     .build()?
//!     .run()?;
//! ```

pub mod algorithms;
pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod error;
pub mod fitness;
pub mod genome;
pub mod operators;
pub mod population;
pub mod reporting;
mod serde_float;
pub mod session;
pub mod termination;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::algorithms::prelude::*;
    pub use crate::config::AlgorithmSettings;
    pub use crate::coordinator::prelude::*;
    pub use crate::diagnostics::prelude::*;
    pub use crate::error::*;
    pub use crate::fitness::prelude::*;
    pub use crate::genome::prelude::*;
    pub use crate::operators::prelude::*;
    pub use crate::population::prelude::*;
    pub use crate::reporting::prelude::*;
    pub use crate::session::prelude::*;
    pub use crate::termination::prelude::*;
}
