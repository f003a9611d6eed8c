//! Session context
//!
//! The rendezvous point between the host and the runs it triggers. One
//! `SessionState` is created by whoever drives runs and shared by `Arc`;
//! there is no process-wide instance.
//!
//! Every setter overwrites (last writer wins). Starting a run mints a new
//! [`RunToken`]; any run holding an older token is superseded and must stop
//! at its next evaluation boundary.

use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StaleRunError;
use crate::population::observer::Observer;

/// Identifier of one algorithm run within a session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunToken(pub u64);

impl fmt::Display for RunToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run #{}", self.0)
    }
}

/// Opaque handle to the host's document or model
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentHandle(pub String);

/// Opaque reference to a host component
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentRef(pub String);

/// Observer snapshot published by a run
#[derive(Clone, Debug)]
pub struct PublishedSnapshot {
    /// Run that produced the snapshot
    pub token: RunToken,
    /// History up to the last completed generation
    pub observer: Observer,
}

#[derive(Debug, Default)]
struct SessionInner {
    document: Option<DocumentHandle>,
    genes: Vec<String>,
    this_component: Option<ComponentRef>,
    fitness_component: Option<ComponentRef>,
    active: RunToken,
    latest: Option<PublishedSnapshot>,
}

/// Shared session context
#[derive(Debug, Default)]
pub struct SessionState {
    inner: RwLock<SessionInner>,
}

impl SessionState {
    /// Create an empty session; no run is active
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the host document handle
    pub fn set_document(&self, document: DocumentHandle) {
        self.write().document = Some(document);
    }

    /// Set the gene identifiers exposed by the host model, in genome order
    pub fn set_genes(&self, ids: Vec<String>) {
        self.write().genes = ids;
    }

    /// Set the component that triggered the solve
    pub fn set_this_component(&self, component: ComponentRef) {
        self.write().this_component = Some(component);
    }

    /// Set the component that produces the fitness value
    pub fn set_fitness_component(&self, component: ComponentRef) {
        self.write().fitness_component = Some(component);
    }

    /// Current host document handle
    pub fn document(&self) -> Option<DocumentHandle> {
        self.read().document.clone()
    }

    /// Current gene identifiers
    pub fn genes(&self) -> Vec<String> {
        self.read().genes.clone()
    }

    /// Component that triggered the solve
    pub fn this_component(&self) -> Option<ComponentRef> {
        self.read().this_component.clone()
    }

    /// Component that produces the fitness value
    pub fn fitness_component(&self) -> Option<ComponentRef> {
        self.read().fitness_component.clone()
    }

    /// Start a new run, superseding any run in progress
    pub fn begin_run(&self) -> RunToken {
        let mut inner = self.write();
        let previous = inner.active;
        inner.active = RunToken(previous.0 + 1);
        if previous.0 > 0 {
            debug!(superseded = %previous, "Superseding previous run");
        }
        info!(run = %inner.active, genes = inner.genes.len(), "Run started");
        inner.active
    }

    /// The run currently allowed to write
    pub fn active_run(&self) -> RunToken {
        self.read().active
    }

    /// Whether `token` is still the active run
    pub fn is_active(&self, token: RunToken) -> bool {
        self.read().active == token
    }

    /// Fail with [`StaleRunError`] when `token` has been superseded
    pub fn ensure_active(&self, token: RunToken) -> Result<(), StaleRunError> {
        let expected = self.active_run();
        if expected == token {
            Ok(())
        } else {
            Err(StaleRunError {
                expected,
                actual: token,
            })
        }
    }

    /// Publish a run's latest history
    ///
    /// Snapshots from superseded runs are discarded.
    pub fn publish(&self, token: RunToken, observer: Observer) -> Result<(), StaleRunError> {
        let mut inner = self.write();
        if inner.active != token {
            debug!(run = %token, active = %inner.active, "Discarding stale snapshot");
            return Err(StaleRunError {
                expected: inner.active,
                actual: token,
            });
        }
        inner.latest = Some(PublishedSnapshot { token, observer });
        Ok(())
    }

    /// Last published history, safe to read while a run continues
    pub fn latest_snapshot(&self) -> Option<PublishedSnapshot> {
        self.read().latest.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_overwrite() {
        let session = SessionState::new();
        session.set_genes(vec!["a".to_string()]);
        session.set_genes(vec!["b".to_string(), "c".to_string()]);
        session.set_document(DocumentHandle("doc-1".to_string()));
        session.set_document(DocumentHandle("doc-2".to_string()));
        session.set_fitness_component(ComponentRef("fitness".to_string()));
        session.set_this_component(ComponentRef("solver".to_string()));

        assert_eq!(session.genes(), vec!["b".to_string(), "c".to_string()]);
        assert_eq!(session.document(), Some(DocumentHandle("doc-2".to_string())));
        assert_eq!(
            session.fitness_component(),
            Some(ComponentRef("fitness".to_string()))
        );
        assert_eq!(
            session.this_component(),
            Some(ComponentRef("solver".to_string()))
        );
    }

    #[test]
    fn test_tokens_are_monotonic() {
        let session = SessionState::new();
        let first = session.begin_run();
        let second = session.begin_run();
        assert!(second > first);
        assert!(session.is_active(second));
        assert!(!session.is_active(first));
    }

    #[test]
    fn test_ensure_active_reports_stale() {
        let session = SessionState::new();
        let old = session.begin_run();
        let new = session.begin_run();
        assert_eq!(
            session.ensure_active(old),
            Err(StaleRunError {
                expected: new,
                actual: old
            })
        );
        assert!(session.ensure_active(new).is_ok());
    }

    #[test]
    fn test_publish_rejects_stale_run() {
        let session = SessionState::new();
        let old = session.begin_run();
        let new = session.begin_run();

        assert!(session.publish(old, Observer::new()).is_err());
        assert!(session.latest_snapshot().is_none());

        session.publish(new, Observer::new()).unwrap();
        assert_eq!(session.latest_snapshot().unwrap().token, new);
    }

    #[test]
    fn test_token_display() {
        assert_eq!(RunToken(3).to_string(), "run #3");
    }
}
