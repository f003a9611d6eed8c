//! Fitness evaluation
//!
//! This module provides the host-facing evaluation boundary and the
//! objective direction.

pub mod traits;

pub mod prelude {
    pub use super::traits::*;
}
