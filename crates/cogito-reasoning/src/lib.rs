//! Stand-in collaborators for the cognitive core.
//!
//! [`StubReasoner`] performs no inference: it remembers submitted atoms and scales their
//! confidence by how reliable the reporting processes have recently been.
//! [`StaticTelemetry`] serves a fixed (replaceable) telemetry snapshot.

use std::fmt;

use cogito_core::{
    AtomRecord, CollaboratorError, Handle, PerformanceMetric, Pattern, ReasoningCollaborator, TelemetrySnapshot,
    TelemetrySource, TruthValue,
};
use dashmap::DashMap;
use tokio::sync::RwLock;

#[derive(Debug)]
struct InvalidMetric(String);

impl fmt::Display for InvalidMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid success rate for process: {}", self.0)
    }
}

impl std::error::Error for InvalidMetric {}

/// In-memory reasoner stub.
#[derive(Debug, Default)]
pub struct StubReasoner {
    atoms: DashMap<Handle, AtomRecord>,
    /// Process -> latest success rate.
    reliability: DashMap<String, f64>,
}

impl StubReasoner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean success rate over every reporting process; 1.0 before any report.
    pub fn reliability(&self) -> f64 {
        if self.reliability.is_empty() {
            return 1.0;
        }
        let sum: f64 = self.reliability.iter().map(|e| *e.value()).sum();
        sum / self.reliability.len() as f64
    }

    pub fn known_atoms(&self) -> usize {
        self.atoms.len()
    }
}

#[async_trait::async_trait]
impl ReasoningCollaborator for StubReasoner {
    fn name(&self) -> &str {
        "stub-reasoner"
    }

    async fn submit_atom(&self, atom: &AtomRecord) -> Result<TruthValue, CollaboratorError> {
        let truth = atom.view().truth();
        let revised = TruthValue {
            strength: truth.strength,
            confidence: (truth.confidence * self.reliability()).clamp(0.0, 1.0),
        };
        self.atoms.insert(atom.handle(), atom.clone());
        tracing::debug!(
            target: "cogito::reasoning",
            handle = %atom.handle(),
            confidence = revised.confidence,
            "atom submitted"
        );
        Ok(revised)
    }

    async fn query_atoms(&self, pattern: &Pattern) -> Result<Vec<AtomRecord>, CollaboratorError> {
        let mut found: Vec<AtomRecord> = self
            .atoms
            .iter()
            .filter(|e| pattern.matches(e.value().view()))
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(AtomRecord::handle);
        Ok(found)
    }

    async fn on_metric_update(&self, metric: &PerformanceMetric) -> Result<(), CollaboratorError> {
        if !(0.0..=1.0).contains(&metric.success_rate) {
            return Err(Box::new(InvalidMetric(metric.process.clone())));
        }
        self.reliability.insert(metric.process.clone(), metric.success_rate);
        Ok(())
    }
}

/// Telemetry source returning whatever snapshot it was last given.
#[derive(Debug, Default)]
pub struct StaticTelemetry {
    snapshot: RwLock<TelemetrySnapshot>,
}

impl StaticTelemetry {
    pub fn new(snapshot: TelemetrySnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }

    /// Parses a snapshot from JSON (`metrics`, `introspection`, `domain_mastery`; all optional).
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub async fn replace(&self, snapshot: TelemetrySnapshot) {
        *self.snapshot.write().await = snapshot;
    }
}

#[async_trait::async_trait]
impl TelemetrySource for StaticTelemetry {
    async fn pull(&self) -> Result<TelemetrySnapshot, CollaboratorError> {
        Ok(self.snapshot.read().await.clone())
    }
}
