//! Run reporting
//!
//! JSON documents describing a run or a generation, and an HTTP webhook that
//! delivers them.

pub mod report;
#[cfg(feature = "reporting")]
pub mod webhook;

pub mod prelude {
    pub use super::report::{GenerationReport, IndividualReport, RunReport};
    #[cfg(feature = "reporting")]
    pub use super::webhook::WebhookReporter;
}
