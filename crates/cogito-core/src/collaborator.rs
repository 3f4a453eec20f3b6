//! Contracts with external collaborators: a reasoning engine and a telemetry feed.
//!
//! The core only needs the call shapes; implementations live in other crates.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::atomspace::{AtomRecord, Pattern, TruthValue};
use crate::goals::{GenerationInputs, IntrospectionResult, PerformanceMetric};

/// Error type returned across collaborator boundaries.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Reasoning collaborator (inference, program synthesis) consulted by the core.
#[async_trait::async_trait]
pub trait ReasoningCollaborator: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Hands an atom to the reasoner and returns its revised truth value.
    async fn submit_atom(&self, atom: &AtomRecord) -> Result<TruthValue, CollaboratorError>;

    /// Atoms the reasoner knows about that match `pattern`.
    async fn query_atoms(&self, pattern: &Pattern) -> Result<Vec<AtomRecord>, CollaboratorError>;

    async fn on_metric_update(&self, metric: &PerformanceMetric) -> Result<(), CollaboratorError>;
}

/// Everything the meta-cognition collaborator reports for one generation cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    #[serde(default)]
    pub metrics: Vec<PerformanceMetric>,
    #[serde(default)]
    pub introspection: Vec<IntrospectionResult>,
    #[serde(default)]
    pub domain_mastery: BTreeMap<String, f64>,
}

/// Pull-based telemetry feed, read once per generation cycle.
#[async_trait::async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn pull(&self) -> Result<TelemetrySnapshot, CollaboratorError>;
}

impl GenerationInputs {
    pub fn from_telemetry(snapshot: TelemetrySnapshot, capabilities: BTreeSet<String>) -> Self {
        Self {
            metrics: snapshot.metrics,
            introspection: snapshot.introspection,
            domain_mastery: snapshot.domain_mastery,
            capabilities,
        }
    }
}
