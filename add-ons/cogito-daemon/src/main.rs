//! Cogito daemon: hosts one cognitive context and drives it on a fixed tick.
//!
//! Environment:
//! - `COGITO_CONFIG`: config file path (see `CognitiveConfig::load`)
//! - `COGITO_SEED_RECORDS`: optional file of node/link records, one per line
//! - `COGITO_TELEMETRY`: optional JSON telemetry snapshot served every tick
//! - `COGITO_CAPABILITIES`: comma-separated capability labels

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cogito_core::{
    CognitiveConfig, CognitiveContext, CycleOutcome, NodeId, ReasoningCollaborator, Record, TelemetrySource,
    TextRecord,
};
use cogito_reasoning::{StaticTelemetry, StubReasoner};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type DaemonError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), DaemonError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CognitiveConfig::load()?;
    let tick = Duration::from_secs(config.daemon.tick_secs.max(1));
    let context = Arc::new(CognitiveContext::new(config));

    if let Ok(capabilities) = std::env::var("COGITO_CAPABILITIES") {
        context.set_capabilities(
            capabilities
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        );
    }
    if let Ok(path) = std::env::var("COGITO_SEED_RECORDS") {
        let loaded = load_seed_records(&context, &std::fs::read_to_string(&path)?)?;
        tracing::info!(target: "cogito::daemon", path = %path, atoms = loaded, "seed records loaded");
    }

    let telemetry: Arc<StaticTelemetry> = match std::env::var("COGITO_TELEMETRY") {
        Ok(path) => Arc::new(StaticTelemetry::from_json(&std::fs::read_to_string(path)?)?),
        Err(_) => Arc::new(StaticTelemetry::default()),
    };
    let reasoner = Arc::new(StubReasoner::new());

    tokio::select! {
        _ = heartbeat_loop(Arc::clone(&context), telemetry, reasoner, tick) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(target: "cogito::daemon", "shutdown requested");
        }
    }
    Ok(())
}

/// Loads node and link records into the context. Record ids are remapped to the ids the
/// store assigns; links must follow the nodes they reference.
fn load_seed_records(context: &CognitiveContext, text: &str) -> Result<usize, DaemonError> {
    let mut ids: HashMap<NodeId, NodeId> = HashMap::new();
    let mut loaded = 0;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty() && !l.starts_with(';')) {
        match Record::parse_record(line)? {
            Record::Node(node) => {
                let id = context.add_node(node.node_type, node.name);
                context.set_truth_value(id.into(), node.truth.strength, node.truth.confidence)?;
                if node.attention.sti != 0.0 {
                    context.stimulate(id.into(), node.attention.sti)?;
                }
                ids.insert(node.id, id);
            }
            Record::Link(link) => {
                let outgoing = link
                    .outgoing
                    .iter()
                    .map(|old| {
                        ids.get(old).copied().ok_or_else(|| -> DaemonError {
                            format!("link {} references unseeded node {}", link.id.0, old.0).into()
                        })
                    })
                    .collect::<Result<Vec<NodeId>, DaemonError>>()?;
                let id = context.add_link(link.link_type, outgoing)?;
                context.set_truth_value(id.into(), link.truth.strength, link.truth.confidence)?;
            }
            Record::Goal(goal) => {
                tracing::warn!(target: "cogito::daemon", goal = goal.id, "goal records are not seeded, skipping");
                continue;
            }
        }
        loaded += 1;
    }
    Ok(loaded)
}

async fn heartbeat_loop(
    context: Arc<CognitiveContext>,
    telemetry: Arc<StaticTelemetry>,
    reasoner: Arc<StubReasoner>,
    tick: Duration,
) {
    tracing::info!(
        target: "cogito::daemon",
        app = %context.config().app_name,
        tick_secs = tick.as_secs(),
        "heartbeat loop started"
    );
    let mut interval = tokio::time::interval(tick);
    loop {
        interval.tick().await;
        if let Err(e) = heartbeat_tick(&context, telemetry.as_ref(), reasoner.as_ref()).await {
            tracing::warn!(target: "cogito::daemon", error = %e, "heartbeat tick failed");
        }
    }
}

async fn heartbeat_tick(
    context: &CognitiveContext,
    telemetry: &dyn TelemetrySource,
    reasoner: &dyn ReasoningCollaborator,
) -> Result<(), DaemonError> {
    let daemon = &context.config().daemon;
    let rent = context.collect_rent(daemon.rent_rate)?;
    context.decay_lti(daemon.lti_decay_rate)?;

    let inputs = context.pull_inputs(telemetry).await?;
    let mut summary = serde_json::json!({
        "rent_collected": rent,
        "bank_pool": context.bank_pool(),
    });

    match context.run_generation_cycle(&inputs) {
        CycleOutcome::Completed(report) => {
            let admission = context.admit_goals(&report);
            let seeded = context.seed_tasks_from_active_goals()?;
            summary["cycle"] = report.summary();
            summary["activated"] = serde_json::json!(admission.activated);
            summary["superseded"] = serde_json::json!(admission.superseded);
            summary["withdrawn"] = serde_json::json!(admission.withdrawn);
            summary["tasks_seeded"] = serde_json::json!(seeded.len());
        }
        CycleOutcome::Skipped {
            efficiency,
            recent_changes,
        } => {
            summary["cycle"] = serde_json::json!({
                "skipped": true,
                "efficiency": efficiency,
                "recent_changes": recent_changes,
            });
        }
        CycleOutcome::Coalesced => {
            summary["cycle"] = serde_json::json!({ "coalesced": true });
        }
    }

    summary["metrics_forwarded"] = serde_json::json!(context.forward_metrics(reasoner, &inputs.metrics).await);
    summary["pending_tasks"] = serde_json::json!(context.pending_tasks());
    tracing::info!(target: "cogito::daemon", summary = %summary, "heartbeat tick");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogito_core::{GoalStatus, IntrospectionResult, PerformanceMetric, TelemetrySnapshot};

    const SEED: &str = r#"
; two concepts and the link between them
(node 10 Concept "cat" (attention 2 0 0) (tv 0.9 0.8))
(node 11 Concept "animal" (attention 0 0 0) (tv 1 1))
(link 4 Inheritance (10 11) (attention 0 0 0) (tv 0.7 0.6))
"#;

    #[test]
    fn seed_records_are_remapped() {
        let context = CognitiveContext::with_seed(CognitiveConfig::default(), 1);
        assert_eq!(load_seed_records(&context, SEED).unwrap(), 3);
        let cat = context.find_by_name("cat")[0];
        assert_eq!(cat, NodeId(0));
        assert_eq!(context.get_incoming(cat).unwrap().len(), 1);

        let dangling = "(link 7 Similarity (99) (attention 0 0 0) (tv 1 1))";
        let err = load_seed_records(&context, dangling).unwrap_err().to_string();
        assert_eq!(err, "link 7 references unseeded node 99");
    }

    #[tokio::test]
    async fn tick_admits_goals_and_seeds_tasks() {
        let context = CognitiveContext::with_seed(CognitiveConfig::default(), 1);
        load_seed_records(&context, SEED).unwrap();
        let telemetry = StaticTelemetry::new(TelemetrySnapshot {
            metrics: vec![PerformanceMetric {
                process: "parsing".to_string(),
                success_rate: 0.3,
                average_time: 1.0,
                resource_usage: 0.5,
                improvement_trend: 0.0,
            }],
            introspection: vec![IntrospectionResult {
                process: "parsing".to_string(),
                efficiency_rating: 0.9,
                bottlenecks: vec![],
                suggestions: vec![],
                timestamp_ms: 1,
            }],
            ..TelemetrySnapshot::default()
        });
        let reasoner = StubReasoner::new();

        heartbeat_tick(&context, &telemetry, &reasoner).await.unwrap();
        let active = context.active_goals();
        assert!(!active.is_empty());
        assert_eq!(context.goal_status(active[0].id), Some(GoalStatus::Active));
        assert_eq!(context.pending_tasks(), active.len());
        assert!((reasoner.reliability() - 0.3).abs() < 1e-12);
    }
}
