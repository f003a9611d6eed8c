//! Evolutionary algorithms
//!
//! This module provides the generational orchestrator.

pub mod evolutionary;

pub mod prelude {
    pub use super::evolutionary::*;
}
