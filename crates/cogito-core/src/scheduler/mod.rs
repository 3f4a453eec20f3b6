//! Dependency-aware priority scheduler.
//!
//! A task becomes eligible once every dependency has completed. Among eligible tasks the
//! scheduler pops the one with the highest effective priority:
//!
//! ```text
//! urgency_weight · urgency
//!   + sti_weight · clamp(STI(atom) / sti_scale, 0, 1)
//!   + age_weight · min(age / age_horizon, 1)
//! ```
//!
//! Priorities are recomputed on every dequeue attempt, so attention changes take effect
//! without re-inserting tasks. Age counts dequeue attempts (ticks) since the task was
//! queued. Ties go to the earliest-queued task.
//!
//! Retry is the caller's decision: a failed task stays failed (and its dependents stay
//! pending) until [`TaskScheduler::retry`] re-queues it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::atomspace::{AtomSpace, Handle};
use crate::error::{CogitoError, CogitoResult};
use crate::goals::AutonomousGoal;
use crate::shared::{BoundsPolicy, SchedulerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Eligible,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Eligible => "eligible",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    /// Declared urgency in [0, 1].
    pub urgency: f64,
    /// Atom whose STI feeds the attention term.
    pub atom: Option<Handle>,
    pub dependencies: BTreeSet<TaskId>,
    pub status: TaskStatus,
    /// Number of times the task has been queued (1 on submit).
    pub attempts: u32,
    /// Goal this task was seeded from, if any.
    pub origin_goal: Option<u64>,
    queued_seq: u64,
    queued_tick: u64,
}

pub struct TaskScheduler {
    config: SchedulerConfig,
    tasks: BTreeMap<TaskId, Task>,
    next_id: u64,
    next_seq: u64,
    tick: u64,
}

impl TaskScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            tasks: BTreeMap::new(),
            next_id: 0,
            next_seq: 0,
            tick: 0,
        }
    }

    /// Queues a task. Every dependency must already be known to the scheduler.
    pub fn submit(
        &mut self,
        description: impl Into<String>,
        urgency: f64,
        atom: Option<Handle>,
        dependencies: impl IntoIterator<Item = TaskId>,
    ) -> CogitoResult<TaskId> {
        let urgency = BoundsPolicy::Clamp.apply("urgency", urgency, 0.0, 1.0)?;
        let dependencies: BTreeSet<TaskId> = dependencies.into_iter().collect();
        if let Some(missing) = dependencies.iter().find(|d| !self.tasks.contains_key(*d)) {
            return Err(CogitoError::UnknownTask(missing.0));
        }

        let id = TaskId(self.next_id);
        self.next_id += 1;
        let task = Task {
            id,
            description: description.into(),
            urgency,
            atom,
            dependencies,
            status: TaskStatus::Pending,
            attempts: 1,
            origin_goal: None,
            queued_seq: self.take_seq(),
            queued_tick: self.tick,
        };
        tracing::debug!(target: "cogito::scheduler", %id, urgency, deps = task.dependencies.len(), "task submitted");
        self.tasks.insert(id, task);
        Ok(id)
    }

    /// Seeds a task from a goal; the goal's priority becomes the task's urgency.
    pub fn submit_goal(
        &mut self,
        goal: &AutonomousGoal,
        dependencies: impl IntoIterator<Item = TaskId>,
    ) -> CogitoResult<TaskId> {
        let id = self.submit(goal.description.clone(), goal.priority, None, dependencies)?;
        if let Some(task) = self.tasks.get_mut(&id) {
            task.origin_goal = Some(goal.id);
        }
        Ok(id)
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Promotes pending tasks whose dependencies have all completed.
    fn refresh_eligibility(&mut self) {
        let ready: Vec<TaskId> = self
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::Pending)
            .filter(|t| {
                t.dependencies.iter().all(|d| {
                    self.tasks
                        .get(d)
                        .is_some_and(|dep| dep.status == TaskStatus::Completed)
                })
            })
            .map(|t| t.id)
            .collect();
        for id in ready {
            if let Some(task) = self.tasks.get_mut(&id) {
                task.status = TaskStatus::Eligible;
            }
        }
    }

    fn priority_of(&self, task: &Task, space: &AtomSpace) -> f64 {
        let sti = task
            .atom
            .and_then(|h| space.attention(h).ok())
            .map(|av| av.sti)
            .unwrap_or(0.0);
        let attention = if self.config.sti_scale > 0.0 {
            (sti / self.config.sti_scale).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let age = self.tick.saturating_sub(task.queued_tick) as f64;
        let age_term = if self.config.age_horizon == 0 {
            1.0
        } else {
            (age / self.config.age_horizon as f64).min(1.0)
        };
        self.config.urgency_weight * task.urgency
            + self.config.sti_weight * attention
            + self.config.age_weight * age_term
    }

    /// Current effective priority of a task, as the next dequeue would see it.
    pub fn effective_priority(&self, id: TaskId, space: &AtomSpace) -> CogitoResult<f64> {
        let task = self.tasks.get(&id).ok_or(CogitoError::UnknownTask(id.0))?;
        Ok(self.priority_of(task, space))
    }

    /// Pops the highest-priority eligible task and marks it running.
    pub fn next(&mut self, space: &AtomSpace) -> Option<TaskId> {
        self.tick += 1;
        self.refresh_eligibility();

        let chosen = self
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::Eligible)
            .map(|t| (self.priority_of(t, space), t.queued_seq, t.id))
            .max_by(|a, b| a.0.total_cmp(&b.0).then_with(|| b.1.cmp(&a.1)))
            .map(|(priority, _, id)| (priority, id));

        let (priority, id) = chosen?;
        if let Some(task) = self.tasks.get_mut(&id) {
            task.status = TaskStatus::Running;
        }
        tracing::debug!(target: "cogito::scheduler", %id, priority, "task dequeued");
        Some(id)
    }

    fn transition(&mut self, id: TaskId, from: TaskStatus, to: TaskStatus) -> CogitoResult<&mut Task> {
        let task = self.tasks.get_mut(&id).ok_or(CogitoError::UnknownTask(id.0))?;
        if task.status != from {
            return Err(CogitoError::InvalidTransition {
                id: id.0,
                from: task.status.as_str(),
                to: to.as_str(),
            });
        }
        task.status = to;
        Ok(task)
    }

    pub fn complete(&mut self, id: TaskId) -> CogitoResult<()> {
        self.transition(id, TaskStatus::Running, TaskStatus::Completed)?;
        self.refresh_eligibility();
        tracing::debug!(target: "cogito::scheduler", %id, "task completed");
        Ok(())
    }

    pub fn fail(&mut self, id: TaskId) -> CogitoResult<()> {
        self.transition(id, TaskStatus::Running, TaskStatus::Failed)?;
        tracing::debug!(target: "cogito::scheduler", %id, "task failed");
        Ok(())
    }

    /// Re-queues a failed task as pending. The caller owns the retry policy.
    pub fn retry(&mut self, id: TaskId) -> CogitoResult<()> {
        let seq = self.take_seq();
        let tick = self.tick;
        let task = self.transition(id, TaskStatus::Failed, TaskStatus::Pending)?;
        task.attempts += 1;
        task.queued_seq = seq;
        task.queued_tick = tick;
        tracing::debug!(target: "cogito::scheduler", %id, attempts = task.attempts, "task re-queued");
        Ok(())
    }

    pub fn status(&self, id: TaskId) -> Option<TaskStatus> {
        self.tasks.get(&id).map(|t| t.status)
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Whether some task was already seeded from `goal_id`.
    pub fn has_goal(&self, goal_id: u64) -> bool {
        self.tasks.values().any(|t| t.origin_goal == Some(goal_id))
    }

    /// Tasks not yet completed or failed.
    pub fn pending_count(&self) -> usize {
        self.tasks.values().filter(|t| !t.status.is_terminal()).count()
    }
}
