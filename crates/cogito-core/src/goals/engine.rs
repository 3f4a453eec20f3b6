use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{should_trigger, AutonomousGoal, GenerationInputs, GenerationReport, GoalGenerator, GoalId};
use crate::atomspace::AtomSpace;

/// What a call to [`GoalEngine::run_cycle`] did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CycleOutcome {
    /// The trigger policy declined. `efficiency` is `None` when no introspection data was supplied.
    Skipped {
        efficiency: Option<f64>,
        recent_changes: u64,
    },
    /// Another cycle was already running; nothing happened.
    Coalesced,
    Completed(GenerationReport),
}

impl CycleOutcome {
    pub fn report(&self) -> Option<&GenerationReport> {
        match self {
            CycleOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Marks a cycle as in flight until dropped.
pub struct CycleGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Goal generator behind a trigger policy and a single-flight gate.
pub struct GoalEngine {
    generator: Mutex<GoalGenerator>,
    in_flight: AtomicBool,
}

impl GoalEngine {
    pub fn new(generator: GoalGenerator) -> Self {
        Self {
            generator: Mutex::new(generator),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Claims the in-flight slot, or `None` if a cycle is already running.
    pub fn try_begin(&self) -> Option<CycleGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard { flag: &self.in_flight })
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Runs one generation cycle over `space` if no other cycle is in flight and the
    /// trigger policy accepts the latest efficiency and `recent_changes`.
    pub fn run_cycle(&self, space: &AtomSpace, inputs: &GenerationInputs, recent_changes: u64) -> CycleOutcome {
        let Some(_guard) = self.try_begin() else {
            tracing::debug!(target: "cogito::goals", "generation already in flight, coalescing");
            return CycleOutcome::Coalesced;
        };

        let efficiency = inputs.latest_efficiency();
        let triggered = efficiency.is_some_and(|e| should_trigger(e, recent_changes));
        if !triggered {
            tracing::debug!(target: "cogito::goals", ?efficiency, recent_changes, "generation skipped");
            return CycleOutcome::Skipped {
                efficiency,
                recent_changes,
            };
        }

        let mut generator = self.generator.lock().unwrap_or_else(PoisonError::into_inner);
        CycleOutcome::Completed(generator.generate(space, inputs))
    }

    /// Splits `goal` into capability sub-goals using the shared id counter.
    pub fn decompose(&self, goal: &AutonomousGoal) -> Vec<AutonomousGoal> {
        self.generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .decompose(goal)
    }

    pub fn next_goal_id(&self) -> GoalId {
        self.generator.lock().unwrap_or_else(PoisonError::into_inner).next_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomspace::NodeType;
    use crate::goals::IntrospectionResult;
    use crate::shared::GoalsConfig;
    use std::sync::{Arc, Barrier};

    fn engine() -> GoalEngine {
        GoalEngine::new(GoalGenerator::with_seed(GoalsConfig::default(), 7))
    }

    fn inputs(efficiency: f64) -> GenerationInputs {
        GenerationInputs {
            introspection: vec![IntrospectionResult {
                process: "reasoning".to_string(),
                efficiency_rating: efficiency,
                bottlenecks: vec![],
                suggestions: vec![],
                timestamp_ms: 1,
            }],
            ..GenerationInputs::default()
        }
    }

    fn space() -> AtomSpace {
        let mut space = AtomSpace::new();
        space.add_node(NodeType::Concept, "lonely");
        space
    }

    #[test]
    fn completes_when_policy_allows() {
        let outcome = engine().run_cycle(&space(), &inputs(0.9), 0);
        let report = outcome.report().expect("cycle should run");
        assert_eq!(report.goals[0].description, "connect lonely to existing knowledge network");
    }

    #[test]
    fn skips_without_mutating_the_counter() {
        let engine = engine();
        let outcome = engine.run_cycle(&space(), &inputs(0.6), 2);
        assert_eq!(
            outcome,
            CycleOutcome::Skipped {
                efficiency: Some(0.6),
                recent_changes: 2
            }
        );
        assert_eq!(engine.next_goal_id(), 0);

        let none = engine.run_cycle(&space(), &GenerationInputs::default(), 0);
        assert!(matches!(none, CycleOutcome::Skipped { efficiency: None, .. }));
        assert!(!engine.is_running());
    }

    #[test]
    fn concurrent_trigger_is_coalesced() {
        let engine = engine();
        let guard = engine.try_begin().unwrap();
        assert_eq!(engine.run_cycle(&space(), &inputs(0.9), 0), CycleOutcome::Coalesced);
        drop(guard);
        assert!(engine.run_cycle(&space(), &inputs(0.9), 0).report().is_some());
    }

    #[test]
    fn only_one_of_many_threads_holds_the_slot() {
        let engine = Arc::new(engine());
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    let guard = engine.try_begin();
                    let won = guard.is_some();
                    barrier.wait();
                    won
                })
            })
            .collect();
        let winners = handles.into_iter().map(|h| h.join().unwrap()).filter(|w| *w).count();
        assert_eq!(winners, 1);
        assert!(!engine.is_running());
    }
}
