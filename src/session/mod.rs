//! Session state and host bridge
//!
//! Explicit context shared between the host and the runs it triggers.

pub mod bridge;
pub mod state;

pub use state::RunToken;

pub mod prelude {
    pub use super::bridge::{serve, solve_channel, HostBridge, SolveReply, SolveRequest};
    pub use super::state::{
        ComponentRef, DocumentHandle, PublishedSnapshot, RunToken, SessionState,
    };
}
