//! Genome encoding
//!
//! This module provides the gene descriptor, the tick codec, the gene pool
//! and the tick-vector genome.

pub mod gene;
pub mod pool;
pub mod tick_genome;

pub mod prelude {
    pub use super::gene::{decode, encode, Gene, Tick, MAX_DECIMALS};
    pub use super::pool::GenePool;
    pub use super::tick_genome::{DistanceMetric, TickGenome};
}
