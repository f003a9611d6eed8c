//! Population management
//!
//! This module provides the Individual, Population and Observer types.

pub mod individual;
pub mod observer;
#[allow(clippy::module_inception)]
pub mod population;

pub mod prelude {
    pub use super::individual::*;
    pub use super::observer::*;
    pub use super::population::*;
}
