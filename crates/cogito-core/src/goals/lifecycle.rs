use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{AutonomousGoal, GoalId};
use crate::error::{CogitoError, CogitoResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalStatus {
    Proposed,
    Active,
    Completed,
    Abandoned,
    Superseded,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Proposed => "Proposed",
            GoalStatus::Active => "Active",
            GoalStatus::Completed => "Completed",
            GoalStatus::Abandoned => "Abandoned",
            GoalStatus::Superseded => "Superseded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GoalStatus::Completed | GoalStatus::Abandoned | GoalStatus::Superseded)
    }
}

#[derive(Debug, Clone)]
struct GoalEntry {
    goal: AutonomousGoal,
    status: GoalStatus,
}

/// Outcome of one [`GoalSet::admit`] pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdmissionReport {
    pub activated: Vec<GoalId>,
    pub superseded: Vec<GoalId>,
    /// Proposed goals dropped because the backlog was full. They are no longer tracked.
    pub withdrawn: Vec<GoalId>,
}

/// Bounded set of current goals plus the history of terminal ones.
///
/// At most `capacity` goals are Active and at most `capacity` wait as Proposed after an
/// admission pass. No two non-terminal goals share a description. Every state change
/// bumps a counter that the trigger policy reads as "recent changes"; the owner resets
/// it after a cycle.
#[derive(Debug, Clone)]
pub struct GoalSet {
    capacity: usize,
    entries: BTreeMap<GoalId, GoalEntry>,
    changes: u64,
}

impl GoalSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: BTreeMap::new(),
            changes: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Adds goals as Proposed. Ids already tracked, and descriptions already held by a
    /// Proposed or Active goal, are ignored. Returns how many were added.
    pub fn propose(&mut self, goals: impl IntoIterator<Item = AutonomousGoal>) -> usize {
        let mut added = 0;
        for goal in goals {
            if self.entries.contains_key(&goal.id) || self.holds_description(&goal.description) {
                tracing::trace!(target: "cogito::goals", goal = goal.id, "already tracked, not proposed");
                continue;
            }
            self.entries.insert(
                goal.id,
                GoalEntry {
                    goal,
                    status: GoalStatus::Proposed,
                },
            );
            added += 1;
        }
        self.changes += added as u64;
        added
    }

    /// Promotes Proposed goals, best first. When the set is full a Proposed goal evicts
    /// the weakest Active goal (lowest priority, newest id on ties) only if it scores
    /// strictly higher; otherwise admission stops and the rest stay Proposed.
    pub fn admit(&mut self) -> AdmissionReport {
        let mut report = AdmissionReport::default();
        let mut candidates: Vec<(GoalId, f64)> = self
            .entries
            .values()
            .filter(|e| e.status == GoalStatus::Proposed)
            .map(|e| (e.goal.id, e.goal.priority))
            .collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        for (id, priority) in candidates {
            if self.active_count() >= self.capacity {
                let weakest = self
                    .entries
                    .values()
                    .filter(|e| e.status == GoalStatus::Active)
                    .min_by(|a, b| {
                        a.goal
                            .priority
                            .total_cmp(&b.goal.priority)
                            .then_with(|| b.goal.id.cmp(&a.goal.id))
                    })
                    .map(|e| (e.goal.id, e.goal.priority));
                match weakest {
                    Some((victim, lowest)) if priority > lowest => {
                        self.set_status(victim, GoalStatus::Superseded);
                        report.superseded.push(victim);
                    }
                    _ => break,
                }
            }
            self.set_status(id, GoalStatus::Active);
            report.activated.push(id);
        }
        report.withdrawn = self.trim_backlog();

        if !report.activated.is_empty() || !report.withdrawn.is_empty() {
            tracing::info!(
                target: "cogito::goals",
                activated = report.activated.len(),
                superseded = report.superseded.len(),
                withdrawn = report.withdrawn.len(),
                "goals admitted"
            );
        }
        report
    }

    fn holds_description(&self, description: &str) -> bool {
        self.entries
            .values()
            .any(|e| !e.status.is_terminal() && e.goal.description == description)
    }

    /// Drops the weakest Proposed goals beyond `capacity`.
    fn trim_backlog(&mut self) -> Vec<GoalId> {
        let excess: Vec<GoalId> = self.proposed().iter().skip(self.capacity).map(|g| g.id).collect();
        for id in &excess {
            self.entries.remove(id);
        }
        self.changes += excess.len() as u64;
        excess
    }

    /// Marks an Active goal Completed.
    pub fn complete(&mut self, id: GoalId) -> CogitoResult<()> {
        self.transition(id, GoalStatus::Completed, |s| s == GoalStatus::Active)
    }

    /// Cancels a Proposed or Active goal.
    pub fn abandon(&mut self, id: GoalId) -> CogitoResult<()> {
        self.transition(id, GoalStatus::Abandoned, |s| {
            matches!(s, GoalStatus::Proposed | GoalStatus::Active)
        })
    }

    fn transition(&mut self, id: GoalId, to: GoalStatus, allowed: impl Fn(GoalStatus) -> bool) -> CogitoResult<()> {
        let from = self.status(id).ok_or(CogitoError::UnknownGoal(id))?;
        if !allowed(from) {
            return Err(CogitoError::InvalidTransition {
                id,
                from: from.as_str(),
                to: to.as_str(),
            });
        }
        self.set_status(id, to);
        tracing::debug!(target: "cogito::goals", goal = id, from = from.as_str(), to = to.as_str(), "goal transition");
        Ok(())
    }

    fn set_status(&mut self, id: GoalId, status: GoalStatus) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.status = status;
            self.changes += 1;
        }
    }

    pub fn status(&self, id: GoalId) -> Option<GoalStatus> {
        self.entries.get(&id).map(|e| e.status)
    }

    pub fn goal(&self, id: GoalId) -> Option<&AutonomousGoal> {
        self.entries.get(&id).map(|e| &e.goal)
    }

    fn active_count(&self) -> usize {
        self.entries.values().filter(|e| e.status == GoalStatus::Active).count()
    }

    /// Active goals, highest priority first.
    pub fn active(&self) -> Vec<&AutonomousGoal> {
        self.with_status(GoalStatus::Active)
    }

    /// Proposed goals waiting for admission, highest priority first.
    pub fn proposed(&self) -> Vec<&AutonomousGoal> {
        self.with_status(GoalStatus::Proposed)
    }

    fn with_status(&self, status: GoalStatus) -> Vec<&AutonomousGoal> {
        let mut goals: Vec<&AutonomousGoal> = self
            .entries
            .values()
            .filter(|e| e.status == status)
            .map(|e| &e.goal)
            .collect();
        goals.sort_by(|a, b| b.priority.total_cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
        goals
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Goal-set changes since the last [`reset_changes`](Self::reset_changes).
    pub fn recent_changes(&self) -> u64 {
        self.changes
    }

    pub fn reset_changes(&mut self) {
        self.changes = 0;
    }
}
