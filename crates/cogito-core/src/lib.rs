//! cogito-core: in-memory cognitive core.
//!
//! A typed hypergraph knowledge store (AtomSpace), an economic attention allocator over
//! it, a dependency-aware task scheduler, and an autonomous goal generator that mines the
//! store and performance telemetry for self-directed objectives. [`CognitiveContext`]
//! bundles one instance of each behind the locks the add-ons share.

mod atomspace;
mod attention;
mod collaborator;
mod context;
mod error;
mod goals;
mod record;
mod scheduler;
mod shared;

// Errors and configuration
pub use error::{CogitoError, CogitoResult};
pub use shared::{
    now_ms, AtomSpaceConfig, AttentionConfig, BoundsPolicy, CognitiveConfig, DaemonConfig, GoalsConfig,
    SchedulerConfig,
};

// Knowledge store
pub use atomspace::{
    AtomRecord, AtomRef, AtomSpace, AtomTypeFilter, AttentionValue, Handle, Link, LinkId, LinkType, Node, NodeId,
    NodeType, Pattern, TruthValue,
};

// Attention economy
pub use attention::{AttentionAllocator, ImportanceMetric, SpreadReport};

// Scheduling
pub use scheduler::{Task, TaskId, TaskScheduler, TaskStatus};

// Goal generation
pub use goals::{
    assess_priority, rank_goals, should_trigger, AdmissionReport, AutonomousGoal, CycleGuard, CycleOutcome,
    GenerationInputs, GenerationReport, GoalEngine, GoalGenerator, GoalId, GoalSet, GoalSource, GoalStatus,
    IntrospectionResult, PerformanceMetric,
};

// Record codec and collaborator contracts
pub use collaborator::{CollaboratorError, ReasoningCollaborator, TelemetrySnapshot, TelemetrySource};
pub use context::CognitiveContext;
pub use record::{parse_record, Record, TextRecord};
