//! Autonomous goal generation: telemetry types, scoring, trigger policy and lifecycle.
//!
//! ## Pipeline
//!
//! | Stage        | Where                          | What happens                                    |
//! |--------------|--------------------------------|-------------------------------------------------|
//! | Trigger      | [`should_trigger`]             | efficiency + recent goal-set edits gate a cycle |
//! | Discovery    | [`GoalGenerator::generate`]    | four strategies emit raw candidates             |
//! | Rescoring    | [`assess_priority`]            | priority overwritten from source/impact/effort  |
//! | Ranking      | [`rank_goals`]                 | sort desc by priority, asc by id; dedup         |
//! | Lifecycle    | [`GoalSet`]                    | Proposed → Active (bounded) → terminal          |
//! | Coalescing   | [`GoalEngine`]                 | at most one cycle in flight                     |

mod engine;
mod generator;
mod lifecycle;

pub use engine::{CycleGuard, CycleOutcome, GoalEngine};
pub use generator::{rank_goals, GenerationReport, GoalGenerator};
pub use lifecycle::{AdmissionReport, GoalSet, GoalStatus};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Goal identity, unique within one generator's lifetime.
pub type GoalId = u64;

/// How a goal was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GoalSource {
    KnowledgeGapDiscovery,
    PerformanceOptimization,
    CreativeSynthesis,
    CuriosityDriven,
    ProblemDecomposition,
}

impl GoalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalSource::KnowledgeGapDiscovery => "KnowledgeGapDiscovery",
            GoalSource::PerformanceOptimization => "PerformanceOptimization",
            GoalSource::CreativeSynthesis => "CreativeSynthesis",
            GoalSource::CuriosityDriven => "CuriosityDriven",
            GoalSource::ProblemDecomposition => "ProblemDecomposition",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "KnowledgeGapDiscovery" => Some(Self::KnowledgeGapDiscovery),
            "PerformanceOptimization" => Some(Self::PerformanceOptimization),
            "CreativeSynthesis" => Some(Self::CreativeSynthesis),
            "CuriosityDriven" => Some(Self::CuriosityDriven),
            "ProblemDecomposition" => Some(Self::ProblemDecomposition),
            _ => None,
        }
    }

    /// Fixed urgency per source used by [`assess_priority`].
    pub fn urgency(&self) -> f64 {
        match self {
            GoalSource::PerformanceOptimization => 0.9,
            GoalSource::ProblemDecomposition => 0.8,
            GoalSource::KnowledgeGapDiscovery => 0.7,
            GoalSource::CreativeSynthesis => 0.4,
            GoalSource::CuriosityDriven => 0.3,
        }
    }
}

/// A self-generated objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutonomousGoal {
    pub id: GoalId,
    pub description: String,
    pub source: GoalSource,
    /// In [0, 1]; recomputed by [`assess_priority`].
    pub priority: f64,
    pub estimated_difficulty: f64,
    pub potential_impact: f64,
    pub required_capabilities: BTreeSet<String>,
    /// Unix timestamp (milliseconds) of the generating cycle.
    pub created_at_ms: i64,
    /// Goals this one was derived from.
    #[serde(default)]
    pub parents: BTreeSet<GoalId>,
}

/// `0.4·urgency(source) + 0.4·impact + 0.2·(1 − difficulty)`.
pub fn assess_priority(goal: &AutonomousGoal) -> f64 {
    0.4 * goal.source.urgency() + 0.4 * goal.potential_impact + 0.2 * (1.0 - goal.estimated_difficulty)
}

/// Whether a generation cycle should run given the latest efficiency rating and the
/// number of goal-set changes since the previous cycle.
pub fn should_trigger(efficiency: f64, recent_changes: u64) -> bool {
    (recent_changes == 0 && efficiency > 0.6)
        || efficiency > 0.85
        || (efficiency < 0.4 && recent_changes == 0)
}

/// Performance telemetry for one process, supplied by the meta-cognition collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetric {
    pub process: String,
    /// In [0, 1].
    pub success_rate: f64,
    pub average_time: f64,
    pub resource_usage: f64,
    pub improvement_trend: f64,
}

/// One introspection observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrospectionResult {
    pub process: String,
    /// In [0, 1].
    pub efficiency_rating: f64,
    #[serde(default)]
    pub bottlenecks: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub timestamp_ms: i64,
}

/// Everything a generation cycle reads besides the AtomSpace snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationInputs {
    pub metrics: Vec<PerformanceMetric>,
    pub introspection: Vec<IntrospectionResult>,
    /// Knowledge domain → mastery in [0, 1]. Ordered for reproducible output.
    pub domain_mastery: BTreeMap<String, f64>,
    pub capabilities: BTreeSet<String>,
}

impl GenerationInputs {
    /// Efficiency of the most recent introspection result (later entries win ties).
    pub fn latest_efficiency(&self) -> Option<f64> {
        self.introspection
            .iter()
            .enumerate()
            .max_by_key(|(i, r)| (r.timestamp_ms, *i))
            .map(|(_, r)| r.efficiency_rating)
    }
}
