//! Four independent discovery strategies plus ranking and decomposition.
//!
//! Strategies run in a fixed order (knowledge gaps, performance, creative synthesis,
//! curiosity) and ids are minted in discovery order, so ranking ties resolve to that
//! order. Sampling uses the generator's own seedable RNG; two generators built with the
//! same seed produce the same goals from the same inputs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use uuid::Uuid;

use super::{assess_priority, AutonomousGoal, GenerationInputs, GoalId, GoalSource};
use crate::atomspace::{AtomSpace, NodeType};
use crate::shared::{now_ms, GoalsConfig};

const GAP_CAPS: &[&str] = &["pattern-recognition", "reasoning"];
const MASTERY_CAPS: &[&str] = &["learning", "reasoning", "pattern-recognition"];
const PERFORMANCE_CAPS: &[&str] = &["optimization", "debugging"];
const CREATIVE_CAPS: &[&str] = &["creativity", "pattern-recognition", "reasoning"];
const CURIOSITY_CAPS: &[&str] = &["exploration", "reasoning"];

/// Result of one generation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub cycle_id: Uuid,
    /// Ranked, deduplicated goals.
    pub goals: Vec<AutonomousGoal>,
    /// Raw candidate count per strategy, before deduplication.
    pub per_source: BTreeMap<GoalSource, usize>,
    pub duplicates_dropped: usize,
    /// Capabilities required by some goal but absent from the current capability set.
    pub capability_gaps: BTreeSet<String>,
}

impl GenerationReport {
    /// Compact JSON summary for logs.
    pub fn summary(&self) -> serde_json::Value {
        let per_source: serde_json::Map<String, serde_json::Value> = self
            .per_source
            .iter()
            .map(|(s, n)| (s.as_str().to_string(), serde_json::json!(n)))
            .collect();
        serde_json::json!({
            "cycle_id": self.cycle_id.to_string(),
            "goals": self.goals.len(),
            "top": self.goals.first().map(|g| g.description.clone()),
            "per_source": per_source,
            "duplicates_dropped": self.duplicates_dropped,
            "capability_gaps": self.capability_gaps,
        })
    }
}

pub struct GoalGenerator {
    config: GoalsConfig,
    rng: StdRng,
    next_id: GoalId,
}

impl GoalGenerator {
    /// Generator seeded from `config.seed`, or from entropy when unset.
    pub fn new(config: GoalsConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng,
            next_id: 0,
        }
    }

    /// Generator with an explicit seed, overriding `config.seed`.
    pub fn with_seed(config: GoalsConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            next_id: 0,
        }
    }

    /// Starts id assignment at `first_id`.
    pub fn starting_at(mut self, first_id: GoalId) -> Self {
        self.next_id = first_id;
        self
    }

    /// Id the next minted goal will receive.
    pub fn next_id(&self) -> GoalId {
        self.next_id
    }

    pub fn config(&self) -> &GoalsConfig {
        &self.config
    }

    fn mint(
        &mut self,
        description: String,
        source: GoalSource,
        (priority, difficulty, impact): (f64, f64, f64),
        caps: &[&str],
        created_at_ms: i64,
    ) -> AutonomousGoal {
        let id = self.next_id;
        self.next_id += 1;
        AutonomousGoal {
            id,
            description,
            source,
            priority,
            estimated_difficulty: difficulty,
            potential_impact: impact,
            required_capabilities: caps.iter().map(|c| c.to_string()).collect(),
            created_at_ms,
            parents: BTreeSet::new(),
        }
    }

    /// Runs every strategy over `space` and `inputs` and returns the ranked result.
    pub fn generate(&mut self, space: &AtomSpace, inputs: &GenerationInputs) -> GenerationReport {
        let created = now_ms();
        let mut candidates = Vec::new();
        let mut per_source = BTreeMap::new();

        for (source, found) in [
            (GoalSource::KnowledgeGapDiscovery, self.knowledge_gaps(space, inputs, created)),
            (GoalSource::PerformanceOptimization, self.performance(inputs, created)),
            (GoalSource::CreativeSynthesis, self.creative_synthesis(space, created)),
            (GoalSource::CuriosityDriven, self.curiosity(space, created)),
        ] {
            per_source.insert(source, found.len());
            candidates.extend(found);
        }

        let raw = candidates.len();
        let goals = rank_goals(candidates);
        let duplicates_dropped = raw - goals.len();
        let capability_gaps: BTreeSet<String> = goals
            .iter()
            .flat_map(|g| g.required_capabilities.iter())
            .filter(|c| !inputs.capabilities.contains(*c))
            .cloned()
            .collect();

        let report = GenerationReport {
            cycle_id: Uuid::new_v4(),
            goals,
            per_source,
            duplicates_dropped,
            capability_gaps,
        };
        tracing::info!(
            target: "cogito::goals",
            cycle_id = %report.cycle_id,
            goals = report.goals.len(),
            duplicates = duplicates_dropped,
            "generation cycle finished"
        );
        report
    }

    /// Poorly connected nodes and weakly mastered domains.
    fn knowledge_gaps(&mut self, space: &AtomSpace, inputs: &GenerationInputs, created: i64) -> Vec<AutonomousGoal> {
        let threshold = self.config.connectivity_threshold;
        let isolated: Vec<String> = space
            .nodes()
            .filter(|n| space.get_incoming(n.id).map(|l| l.len()).unwrap_or(0) < threshold)
            .map(|n| n.name.clone())
            .collect();

        let mut out: Vec<AutonomousGoal> = isolated
            .into_iter()
            .map(|name| {
                self.mint(
                    format!("connect {} to existing knowledge network", name),
                    GoalSource::KnowledgeGapDiscovery,
                    (0.7, 0.6, 0.8),
                    GAP_CAPS,
                    created,
                )
            })
            .collect();

        for (domain, mastery) in &inputs.domain_mastery {
            if *mastery < self.config.mastery_threshold {
                out.push(self.mint(
                    format!("improve mastery of {}", domain),
                    GoalSource::KnowledgeGapDiscovery,
                    (1.0 - mastery, 0.7, 0.9),
                    MASTERY_CAPS,
                    created,
                ));
            }
        }
        out
    }

    /// Processes whose success rate is below the performance threshold.
    fn performance(&mut self, inputs: &GenerationInputs, created: i64) -> Vec<AutonomousGoal> {
        let threshold = self.config.performance_threshold;
        inputs
            .metrics
            .iter()
            .filter(|m| m.success_rate < threshold)
            .map(|m| {
                self.mint(
                    format!("optimize {} performance", m.process),
                    GoalSource::PerformanceOptimization,
                    (1.0 - m.success_rate, 0.5, 0.8),
                    PERFORMANCE_CAPS,
                    created,
                )
            })
            .collect()
    }

    /// Randomly retained unordered pairs of distinct concept names.
    fn creative_synthesis(&mut self, space: &AtomSpace, created: i64) -> Vec<AutonomousGoal> {
        let mut seen = HashSet::new();
        let concepts: Vec<String> = space
            .nodes()
            .filter(|n| n.node_type == NodeType::Concept)
            .filter(|n| seen.insert(n.name.clone()))
            .map(|n| n.name.clone())
            .collect();

        let retention = probability(self.config.creative_retention);
        let mut out = Vec::new();
        for (i, a) in concepts.iter().enumerate() {
            for b in &concepts[i + 1..] {
                if self.rng.gen_bool(retention) {
                    out.push(self.mint(
                        format!("explore creative synthesis of {} and {}", a, b),
                        GoalSource::CreativeSynthesis,
                        (0.6, 0.8, 0.7),
                        CREATIVE_CAPS,
                        created,
                    ));
                }
            }
        }
        out
    }

    /// Randomly retained high-attention nodes.
    fn curiosity(&mut self, space: &AtomSpace, created: i64) -> Vec<AutonomousGoal> {
        let threshold = self.config.curiosity_threshold;
        let retention = probability(self.config.curiosity_retention);
        let hot: Vec<String> = space
            .nodes()
            .filter(|n| n.attention.sti > threshold)
            .map(|n| n.name.clone())
            .collect();

        let mut out = Vec::new();
        for name in hot {
            if self.rng.gen_bool(retention) {
                out.push(self.mint(
                    format!("explore deeper implications of {}", name),
                    GoalSource::CuriosityDriven,
                    (0.5, 0.6, 0.6),
                    CURIOSITY_CAPS,
                    created,
                ));
            }
        }
        out
    }

    /// Splits a goal into one sub-goal per required capability. Sub-goals are scored
    /// with [`assess_priority`] and list `goal` as their parent.
    pub fn decompose(&mut self, goal: &AutonomousGoal) -> Vec<AutonomousGoal> {
        let created = now_ms();
        let difficulty = goal.estimated_difficulty * 0.6;
        let impact = goal.potential_impact * 0.8;
        let mut subgoals = Vec::new();
        for capability in &goal.required_capabilities {
            let mut sub = self.mint(
                format!("develop {} for: {}", capability, goal.description),
                GoalSource::ProblemDecomposition,
                (0.0, difficulty, impact),
                &[capability.as_str()],
                created,
            );
            sub.parents.insert(goal.id);
            sub.priority = assess_priority(&sub);
            subgoals.push(sub);
        }
        tracing::debug!(target: "cogito::goals", parent = goal.id, subgoals = subgoals.len(), "goal decomposed");
        subgoals
    }
}

/// Clamps a configured rate into `[0, 1]`; NaN and infinities count as 0.
fn probability(rate: f64) -> f64 {
    if rate.is_finite() {
        rate.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Rescores every goal, sorts descending by priority (ascending id on ties) and drops
/// later goals whose description already appeared.
pub fn rank_goals(mut goals: Vec<AutonomousGoal>) -> Vec<AutonomousGoal> {
    for goal in &mut goals {
        goal.priority = assess_priority(goal);
    }
    goals.sort_by(|a, b| b.priority.total_cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
    let mut seen = HashSet::new();
    goals.retain(|g| seen.insert(g.description.clone()));
    goals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomspace::LinkType;
    use crate::attention::AttentionAllocator;
    use crate::goals::PerformanceMetric;
    use crate::shared::AttentionConfig;

    fn quiet_config() -> GoalsConfig {
        GoalsConfig {
            creative_retention: 0.0,
            curiosity_retention: 0.0,
            ..GoalsConfig::default()
        }
    }

    fn metric(process: &str, success_rate: f64) -> PerformanceMetric {
        PerformanceMetric {
            process: process.to_string(),
            success_rate,
            average_time: 1.0,
            resource_usage: 0.5,
            improvement_trend: 0.0,
        }
    }

    /// cat, dog -> animal; bird isolated. animal has 2 incoming, the rest fewer.
    fn zoo() -> AtomSpace {
        let mut space = AtomSpace::new();
        let cat = space.add_node(NodeType::Concept, "cat");
        let dog = space.add_node(NodeType::Concept, "dog");
        let animal = space.add_node(NodeType::Concept, "animal");
        space.add_node(NodeType::Concept, "bird");
        space.add_link(LinkType::Inheritance, vec![cat, animal]).unwrap();
        space.add_link(LinkType::Inheritance, vec![dog, animal]).unwrap();
        space
    }

    fn rich_inputs() -> GenerationInputs {
        GenerationInputs {
            metrics: vec![metric("parsing", 0.4), metric("search", 0.95)],
            domain_mastery: [("algebra".to_string(), 0.3), ("logic".to_string(), 0.8)]
                .into_iter()
                .collect(),
            capabilities: ["reasoning".to_string()].into_iter().collect(),
            ..GenerationInputs::default()
        }
    }

    #[test]
    fn knowledge_gaps_flag_poorly_connected_nodes_and_weak_domains() {
        let space = zoo();
        let mut generator = GoalGenerator::with_seed(quiet_config(), 1);
        let report = generator.generate(&space, &rich_inputs());
        let descriptions: Vec<&str> = report.goals.iter().map(|g| g.description.as_str()).collect();

        assert!(descriptions.contains(&"connect cat to existing knowledge network"));
        assert!(descriptions.contains(&"connect bird to existing knowledge network"));
        assert!(!descriptions.contains(&"connect animal to existing knowledge network"));
        assert!(descriptions.contains(&"improve mastery of algebra"));
        assert!(!descriptions.contains(&"improve mastery of logic"));
        assert!(descriptions.contains(&"optimize parsing performance"));
        assert!(!descriptions.contains(&"optimize search performance"));
        assert_eq!(report.per_source[&GoalSource::KnowledgeGapDiscovery], 4);
        assert_eq!(report.per_source[&GoalSource::PerformanceOptimization], 1);
        assert_eq!(report.per_source[&GoalSource::CreativeSynthesis], 0);
    }

    #[test]
    fn candidates_are_rescored_and_ranked() {
        let space = zoo();
        let mut generator = GoalGenerator::with_seed(quiet_config(), 1);
        let report = generator.generate(&space, &rich_inputs());

        for pair in report.goals.windows(2) {
            assert!(pair[0].priority >= pair[1].priority);
            if pair[0].priority == pair[1].priority {
                assert!(pair[0].id < pair[1].id);
            }
        }
        // Performance: 0.4·0.9 + 0.4·0.8 + 0.2·0.5 = 0.78, the highest score here.
        let top = &report.goals[0];
        assert_eq!(top.source, GoalSource::PerformanceOptimization);
        assert!((top.priority - 0.78).abs() < 1e-12);
        let mastery = report
            .goals
            .iter()
            .find(|g| g.description == "improve mastery of algebra")
            .unwrap();
        assert!((mastery.priority - (0.28 + 0.36 + 0.06)).abs() < 1e-12);
    }

    #[test]
    fn capability_gaps_list_missing_capabilities() {
        let space = zoo();
        let report = GoalGenerator::with_seed(quiet_config(), 1).generate(&space, &rich_inputs());
        assert!(report.capability_gaps.contains("optimization"));
        assert!(report.capability_gaps.contains("learning"));
        assert!(!report.capability_gaps.contains("reasoning"));
    }

    #[test]
    fn full_retention_emits_every_concept_pair_once() {
        let space = zoo();
        let config = GoalsConfig {
            creative_retention: 1.0,
            curiosity_retention: 0.0,
            ..GoalsConfig::default()
        };
        let report = GoalGenerator::with_seed(config, 3).generate(&space, &GenerationInputs::default());
        let pairs = report
            .goals
            .iter()
            .filter(|g| g.source == GoalSource::CreativeSynthesis)
            .count();
        assert_eq!(pairs, 6);
        assert!(report
            .goals
            .iter()
            .any(|g| g.description == "explore creative synthesis of cat and dog"));
    }

    #[test]
    fn duplicate_concept_names_are_paired_once() {
        let mut space = AtomSpace::new();
        space.add_node(NodeType::Concept, "sun");
        space.add_node(NodeType::Concept, "sun");
        space.add_node(NodeType::Concept, "moon");
        space.add_node(NodeType::Predicate, "shines");
        let config = GoalsConfig {
            creative_retention: 1.0,
            ..quiet_config()
        };
        let report = GoalGenerator::with_seed(config, 3).generate(&space, &GenerationInputs::default());
        assert_eq!(report.per_source[&GoalSource::CreativeSynthesis], 1);
        // Both "sun" nodes are isolated; the second gap goal is a duplicate.
        assert_eq!(report.duplicates_dropped, 1);
    }

    #[test]
    fn non_finite_retention_samples_nothing() {
        let mut space = zoo();
        let cat = space.find_by_name("cat")[0];
        let mut alloc = AttentionAllocator::new(AttentionConfig::default());
        alloc.stimulate(&mut space, cat.into(), 0.9).unwrap();
        let config = GoalsConfig {
            creative_retention: f64::NAN,
            curiosity_retention: f64::INFINITY,
            ..GoalsConfig::default()
        };
        let report = GoalGenerator::with_seed(config, 5).generate(&space, &GenerationInputs::default());
        assert!(report
            .goals
            .iter()
            .all(|g| !matches!(g.source, GoalSource::CreativeSynthesis | GoalSource::CuriosityDriven)));
    }

    #[test]
    fn curiosity_picks_high_attention_nodes() {
        let mut space = zoo();
        let cat = space.find_by_name("cat")[0];
        let mut alloc = AttentionAllocator::new(AttentionConfig::default());
        alloc.stimulate(&mut space, cat.into(), 0.9).unwrap();
        let config = GoalsConfig {
            curiosity_retention: 1.0,
            ..quiet_config()
        };
        let report = GoalGenerator::with_seed(config, 9).generate(&space, &GenerationInputs::default());
        let curious: Vec<&AutonomousGoal> = report
            .goals
            .iter()
            .filter(|g| g.source == GoalSource::CuriosityDriven)
            .collect();
        assert_eq!(curious.len(), 1);
        assert_eq!(curious[0].description, "explore deeper implications of cat");
    }

    #[test]
    fn same_seed_reproduces_goals_up_to_id_offset() {
        let mut space = zoo();
        for name in ["fish", "tree", "rock", "river"] {
            space.add_node(NodeType::Concept, name);
        }
        let config = GoalsConfig::default();
        let first = GoalGenerator::with_seed(config.clone(), 42).generate(&space, &rich_inputs());
        let second = GoalGenerator::with_seed(config, 42)
            .starting_at(100)
            .generate(&space, &rich_inputs());

        assert_eq!(first.goals.len(), second.goals.len());
        for (a, b) in first.goals.iter().zip(&second.goals) {
            assert_eq!(b.id, a.id + 100);
            assert_eq!(a.description, b.description);
            assert_eq!(a.source, b.source);
            assert_eq!(a.priority, b.priority);
            assert_eq!(a.required_capabilities, b.required_capabilities);
        }
    }

    #[test]
    fn ids_are_unique_and_continue_across_cycles() {
        let space = zoo();
        let mut generator = GoalGenerator::with_seed(GoalsConfig::default(), 5);
        let a = generator.generate(&space, &rich_inputs());
        let b = generator.generate(&space, &rich_inputs());
        let ids: HashSet<GoalId> = a.goals.iter().chain(&b.goals).map(|g| g.id).collect();
        assert_eq!(ids.len(), a.goals.len() + b.goals.len());
    }

    #[test]
    fn decompose_emits_one_child_per_capability() {
        let space = zoo();
        let mut generator = GoalGenerator::with_seed(quiet_config(), 1);
        let report = generator.generate(&space, &rich_inputs());
        let parent = report.goals[0].clone();
        let children = generator.decompose(&parent);

        assert_eq!(children.len(), parent.required_capabilities.len());
        for child in &children {
            assert_eq!(child.source, GoalSource::ProblemDecomposition);
            assert_eq!(child.parents, BTreeSet::from([parent.id]));
            assert_eq!(child.required_capabilities.len(), 1);
            assert!(child.id >= report.goals.iter().map(|g| g.id).max().unwrap());
            assert!((child.priority - assess_priority(child)).abs() < 1e-12);
        }
        assert!(children[0].description.ends_with(&parent.description));
    }

    #[test]
    fn rank_goals_deduplicates_keeping_best() {
        let mk = |id, source| AutonomousGoal {
            id,
            description: "same".to_string(),
            source,
            priority: 0.0,
            estimated_difficulty: 0.5,
            potential_impact: 0.5,
            required_capabilities: BTreeSet::new(),
            created_at_ms: 0,
            parents: BTreeSet::new(),
        };
        let ranked = rank_goals(vec![mk(1, GoalSource::CuriosityDriven), mk(2, GoalSource::PerformanceOptimization)]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, 2);
    }
}
