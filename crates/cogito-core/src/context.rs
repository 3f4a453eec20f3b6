//! Explicit context value owning one complete cognitive core instance.
//!
//! Several contexts can coexist in a process. Locks are always taken in the order
//! goals → scheduler → attention → space, and no guard is held across an `.await`.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::atomspace::{AtomRecord, AtomSpace, Handle, Link, LinkId, LinkType, Node, NodeId, NodeType, Pattern, TruthValue};
use crate::attention::{AttentionAllocator, ImportanceMetric, SpreadReport};
use crate::collaborator::{CollaboratorError, ReasoningCollaborator, TelemetrySource};
use crate::error::{CogitoError, CogitoResult};
use crate::goals::{
    AdmissionReport, AutonomousGoal, CycleOutcome, GenerationInputs, GenerationReport, GoalEngine, GoalGenerator,
    GoalId, GoalSet, GoalStatus, PerformanceMetric,
};
use crate::scheduler::{TaskId, TaskScheduler, TaskStatus};
use crate::shared::CognitiveConfig;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct CognitiveContext {
    config: CognitiveConfig,
    space: RwLock<AtomSpace>,
    attention: Mutex<AttentionAllocator>,
    scheduler: Mutex<TaskScheduler>,
    goals: Mutex<GoalSet>,
    engine: GoalEngine,
    capabilities: RwLock<BTreeSet<String>>,
}

impl CognitiveContext {
    pub fn new(config: CognitiveConfig) -> Self {
        let generator = GoalGenerator::new(config.goals.clone());
        Self::with_generator(config, generator)
    }

    /// Context whose goal sampler is seeded with `seed`, regardless of `config.goals.seed`.
    pub fn with_seed(config: CognitiveConfig, seed: u64) -> Self {
        let generator = GoalGenerator::with_seed(config.goals.clone(), seed);
        Self::with_generator(config, generator)
    }

    fn with_generator(config: CognitiveConfig, generator: GoalGenerator) -> Self {
        tracing::info!(target: "cogito::context", app = %config.app_name, "cognitive context created");
        Self {
            space: RwLock::new(AtomSpace::with_bounds(config.atomspace.bounds)),
            attention: Mutex::new(AttentionAllocator::new(config.attention.clone())),
            scheduler: Mutex::new(TaskScheduler::new(config.scheduler.clone())),
            goals: Mutex::new(GoalSet::new(config.goals.active_capacity)),
            engine: GoalEngine::new(generator),
            capabilities: RwLock::new(BTreeSet::new()),
            config,
        }
    }

    pub fn config(&self) -> &CognitiveConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, AtomSpace> {
        self.space.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AtomSpace> {
        self.space.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` under the store's read lock.
    pub fn read_space<R>(&self, f: impl FnOnce(&AtomSpace) -> R) -> R {
        f(&self.read())
    }

    /// Copy of the store for work that must not hold the lock.
    pub fn snapshot(&self) -> AtomSpace {
        self.read().snapshot()
    }

    // ---- atomspace ----

    pub fn add_node(&self, node_type: NodeType, name: impl Into<String>) -> NodeId {
        self.write().add_node(node_type, name)
    }

    pub fn add_link(&self, link_type: LinkType, outgoing: Vec<NodeId>) -> CogitoResult<LinkId> {
        self.write().add_link(link_type, outgoing)
    }

    pub fn remove_node(&self, id: NodeId, cascade: bool) -> CogitoResult<Node> {
        self.write().remove_node(id, cascade)
    }

    pub fn remove_link(&self, id: LinkId) -> CogitoResult<Link> {
        self.write().remove_link(id)
    }

    pub fn find_by_name(&self, name: &str) -> Vec<NodeId> {
        self.read().find_by_name(name)
    }

    pub fn get_incoming(&self, id: NodeId) -> CogitoResult<Vec<LinkId>> {
        self.read().get_incoming(id)
    }

    /// Owned copies of every atom matching `pattern`.
    pub fn pattern_match(&self, pattern: &Pattern) -> Vec<AtomRecord> {
        self.read().pattern_match(pattern).map(|a| a.to_atom_record()).collect()
    }

    pub fn set_truth_value(&self, handle: Handle, strength: f64, confidence: f64) -> CogitoResult<()> {
        self.write().set_truth_value(handle, strength, confidence)
    }

    // ---- attention ----

    pub fn stimulate(&self, handle: Handle, amount: f64) -> CogitoResult<f64> {
        let mut attention = lock(&self.attention);
        attention.stimulate(&mut self.write(), handle, amount)
    }

    pub fn spread_activation(
        &self,
        source: Handle,
        amount: f64,
        decay_factor: f64,
        max_hops: usize,
    ) -> CogitoResult<SpreadReport> {
        let mut attention = lock(&self.attention);
        attention.spread_activation(&mut self.write(), source, amount, decay_factor, max_hops)
    }

    pub fn collect_rent(&self, rent_rate: f64) -> CogitoResult<f64> {
        let mut attention = lock(&self.attention);
        attention.collect_rent(&mut self.write(), rent_rate)
    }

    pub fn decay_lti(&self, rate: f64) -> CogitoResult<()> {
        let mut attention = lock(&self.attention);
        attention.decay_lti(&mut self.write(), rate)
    }

    pub fn get_most_important(&self, n: usize, metric: ImportanceMetric) -> Vec<(Handle, f64)> {
        let attention = lock(&self.attention);
        attention.get_most_important(&self.read(), n, metric)
    }

    pub fn bank_pool(&self) -> f64 {
        lock(&self.attention).bank_pool()
    }

    /// `total_sti + bank_pool`, the quantity rent collection preserves.
    pub fn attention_total(&self) -> f64 {
        let attention = lock(&self.attention);
        attention.total_sti(&self.read()) + attention.bank_pool()
    }

    // ---- scheduler ----

    pub fn submit_task(
        &self,
        description: impl Into<String>,
        urgency: f64,
        atom: Option<Handle>,
        dependencies: impl IntoIterator<Item = TaskId>,
    ) -> CogitoResult<TaskId> {
        lock(&self.scheduler).submit(description, urgency, atom, dependencies)
    }

    /// Pops the highest-priority eligible task and marks it Running.
    pub fn next_task(&self) -> Option<TaskId> {
        let mut scheduler = lock(&self.scheduler);
        scheduler.next(&self.read())
    }

    pub fn complete_task(&self, id: TaskId) -> CogitoResult<()> {
        lock(&self.scheduler).complete(id)
    }

    pub fn fail_task(&self, id: TaskId) -> CogitoResult<()> {
        lock(&self.scheduler).fail(id)
    }

    pub fn retry_task(&self, id: TaskId) -> CogitoResult<()> {
        lock(&self.scheduler).retry(id)
    }

    pub fn task_status(&self, id: TaskId) -> Option<TaskStatus> {
        lock(&self.scheduler).status(id)
    }

    pub fn pending_tasks(&self) -> usize {
        lock(&self.scheduler).pending_count()
    }

    /// Queues one task per Active goal that has none yet. Returns the new task ids.
    pub fn seed_tasks_from_active_goals(&self) -> CogitoResult<Vec<TaskId>> {
        let goals = lock(&self.goals);
        let mut scheduler = lock(&self.scheduler);
        let mut seeded = Vec::new();
        for goal in goals.active() {
            if !scheduler.has_goal(goal.id) {
                seeded.push(scheduler.submit_goal(goal, [])?);
            }
        }
        if !seeded.is_empty() {
            tracing::info!(target: "cogito::scheduler", tasks = seeded.len(), "tasks seeded from goals");
        }
        Ok(seeded)
    }

    // ---- goals ----

    pub fn set_capabilities(&self, capabilities: impl IntoIterator<Item = String>) {
        *self.capabilities.write().unwrap_or_else(PoisonError::into_inner) = capabilities.into_iter().collect();
    }

    pub fn capabilities(&self) -> BTreeSet<String> {
        self.capabilities.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Runs one generation cycle over a snapshot of the store. Coalesces with a cycle
    /// already in flight; never mutates the goal set.
    pub fn run_generation_cycle(&self, inputs: &GenerationInputs) -> CycleOutcome {
        let recent_changes = lock(&self.goals).recent_changes();
        let snapshot = self.snapshot();
        self.engine.run_cycle(&snapshot, inputs, recent_changes)
    }

    /// Pulls telemetry and pairs it with the current capability set.
    pub async fn pull_inputs(&self, source: &dyn TelemetrySource) -> Result<GenerationInputs, CollaboratorError> {
        let snapshot = source.pull().await?;
        Ok(GenerationInputs::from_telemetry(snapshot, self.capabilities()))
    }

    /// Proposes a cycle's goals, runs admission and starts a new change window.
    pub fn admit_goals(&self, report: &GenerationReport) -> AdmissionReport {
        let mut goals = lock(&self.goals);
        goals.propose(report.goals.iter().cloned());
        let admission = goals.admit();
        goals.reset_changes();
        admission
    }

    /// Decomposes a tracked goal and proposes the sub-goals.
    pub fn decompose_goal(&self, id: GoalId) -> CogitoResult<Vec<AutonomousGoal>> {
        let mut goals = lock(&self.goals);
        let parent = goals.goal(id).cloned().ok_or(CogitoError::UnknownGoal(id))?;
        let subgoals = self.engine.decompose(&parent);
        goals.propose(subgoals.iter().cloned());
        Ok(subgoals)
    }

    pub fn complete_goal(&self, id: GoalId) -> CogitoResult<()> {
        lock(&self.goals).complete(id)
    }

    pub fn abandon_goal(&self, id: GoalId) -> CogitoResult<()> {
        lock(&self.goals).abandon(id)
    }

    pub fn goal_status(&self, id: GoalId) -> Option<GoalStatus> {
        lock(&self.goals).status(id)
    }

    pub fn active_goals(&self) -> Vec<AutonomousGoal> {
        lock(&self.goals).active().into_iter().cloned().collect()
    }

    pub fn goal_changes(&self) -> u64 {
        lock(&self.goals).recent_changes()
    }

    // ---- reasoning ----

    /// Sends an atom to the reasoner and stores the truth value it returns.
    pub async fn submit_to_reasoner(
        &self,
        reasoner: &dyn ReasoningCollaborator,
        handle: Handle,
    ) -> Result<TruthValue, CollaboratorError> {
        let record = self
            .read()
            .get(handle)
            .map(|a| a.to_atom_record())
            .ok_or(CogitoError::UnknownAtom(handle))?;
        let revised = reasoner.submit_atom(&record).await?;
        self.set_truth_value(handle, revised.strength, revised.confidence)?;
        tracing::debug!(
            target: "cogito::context",
            reasoner = reasoner.name(),
            %handle,
            strength = revised.strength,
            confidence = revised.confidence,
            "truth value revised"
        );
        Ok(revised)
    }

    /// Forwards metrics to the reasoner. Individual failures are logged and skipped.
    pub async fn forward_metrics(&self, reasoner: &dyn ReasoningCollaborator, metrics: &[PerformanceMetric]) -> usize {
        let mut delivered = 0;
        for metric in metrics {
            match reasoner.on_metric_update(metric).await {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(
                    target: "cogito::context",
                    reasoner = reasoner.name(),
                    process = %metric.process,
                    error = %e,
                    "metric update rejected"
                ),
            }
        }
        delivered
    }
}
