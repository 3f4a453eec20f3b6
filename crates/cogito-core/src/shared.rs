//! Shared configuration and bound-checking types used across the cognitive core.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CogitoError, CogitoResult};

/// Default config path (extension optional; `config` resolves `.toml`).
const DEFAULT_CONFIG_PATH: &str = "config/cogito";
const ENV_CONFIG_PATH: &str = "COGITO_CONFIG";
const ENV_PREFIX: &str = "COGITO";

/// How a write outside a configured bound is handled. One policy per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsPolicy {
    /// Out-of-range values are clamped to the nearest bound.
    #[default]
    Clamp,
    /// Out-of-range values fail with [`CogitoError::ValueOutOfRange`].
    Reject,
}

impl BoundsPolicy {
    /// Applies the policy to `value` against `[min, max]`. NaN is always rejected.
    pub fn apply(self, field: &'static str, value: f64, min: f64, max: f64) -> CogitoResult<f64> {
        let out_of_range = || CogitoError::ValueOutOfRange {
            field,
            value,
            min,
            max,
        };
        if value.is_nan() {
            return Err(out_of_range());
        }
        if value >= min && value <= max {
            return Ok(value);
        }
        match self {
            BoundsPolicy::Clamp => Ok(value.clamp(min, max)),
            BoundsPolicy::Reject => Err(out_of_range()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AtomSpaceConfig {
    /// Policy for truth-value writes outside [0, 1].
    pub bounds: BoundsPolicy,
}

/// Attention economy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionConfig {
    /// Upper bound for STI (and the nominal size of the attention bank).
    pub bank_capacity: f64,
    /// Optional lower bound for STI. `None` leaves STI unbounded below.
    pub sti_floor: Option<f64>,
    /// Upper bound for LTI; the lower bound is 0.
    pub lti_max: f64,
    /// Atoms with STI strictly above this value are in the attentional focus.
    pub focus_threshold: f64,
    /// Spread shares smaller than this are dropped.
    pub epsilon: f64,
    pub bounds: BoundsPolicy,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            bank_capacity: 100.0,
            sti_floor: None,
            lti_max: 100.0,
            focus_threshold: 0.5,
            epsilon: 0.001,
            bounds: BoundsPolicy::Clamp,
        }
    }
}

impl AttentionConfig {
    /// Lower STI bound as a float (`-inf` when unbounded).
    pub fn sti_min(&self) -> f64 {
        self.sti_floor.unwrap_or(f64::NEG_INFINITY)
    }
}

/// Weights for a task's effective priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub urgency_weight: f64,
    pub sti_weight: f64,
    pub age_weight: f64,
    /// STI at which the attention term saturates to 1.0.
    pub sti_scale: f64,
    /// Number of ticks after which the age term saturates to 1.0.
    pub age_horizon: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            urgency_weight: 0.5,
            sti_weight: 0.3,
            age_weight: 0.2,
            sti_scale: 1.0,
            age_horizon: 100,
        }
    }
}

/// Goal-discovery thresholds and sampling rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalsConfig {
    /// Nodes with fewer incoming links than this are knowledge gaps.
    pub connectivity_threshold: usize,
    /// Domains with mastery below this get an improvement goal.
    pub mastery_threshold: f64,
    /// Processes with success rate below this get an optimization goal.
    pub performance_threshold: f64,
    /// Probability that a concept pair is kept for creative synthesis.
    pub creative_retention: f64,
    /// Nodes with STI strictly above this are curiosity candidates.
    pub curiosity_threshold: f64,
    /// Probability that a curiosity candidate is kept.
    pub curiosity_retention: f64,
    /// Capacity of the Active goal set.
    pub active_capacity: usize,
    /// Sampler seed. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for GoalsConfig {
    fn default() -> Self {
        Self {
            connectivity_threshold: 2,
            mastery_threshold: 0.6,
            performance_threshold: 0.7,
            creative_retention: 0.2,
            curiosity_threshold: 0.5,
            curiosity_retention: 0.3,
            active_capacity: 8,
            seed: None,
        }
    }
}

impl GoalsConfig {
    /// Rejects sampling rates outside `[0, 1]`, NaN included.
    pub fn validate(&self) -> CogitoResult<()> {
        for (field, value) in [
            ("goals.creative_retention", self.creative_retention),
            ("goals.curiosity_retention", self.curiosity_retention),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CogitoError::Config(format!("{} must be within [0, 1], got {}", field, value)));
            }
        }
        Ok(())
    }
}

/// Host loop settings (used by the daemon add-on).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub tick_secs: u64,
    pub rent_rate: f64,
    pub lti_decay_rate: f64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            tick_secs: 30,
            rent_rate: 0.05,
            lti_decay_rate: 0.01,
        }
    }
}

/// Global configuration for one cognitive context. Load from TOML or env.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CognitiveConfig {
    /// Instance name, used in log lines.
    pub app_name: String,
    pub atomspace: AtomSpaceConfig,
    pub attention: AttentionConfig,
    pub scheduler: SchedulerConfig,
    pub goals: GoalsConfig,
    pub daemon: DaemonConfig,
}

impl Default for CognitiveConfig {
    fn default() -> Self {
        Self {
            app_name: "Cogito".to_string(),
            atomspace: AtomSpaceConfig::default(),
            attention: AttentionConfig::default(),
            scheduler: SchedulerConfig::default(),
            goals: GoalsConfig::default(),
            daemon: DaemonConfig::default(),
        }
    }
}

impl CognitiveConfig {
    /// Load config from file and environment. Precedence: env `COGITO__*` > env `COGITO_CONFIG` path
    /// > `config/cogito` > defaults.
    pub fn load() -> CogitoResult<Self> {
        let config_path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Load config from an explicit file (missing files are skipped) plus environment overrides.
    pub fn load_from(path: &Path) -> CogitoResult<Self> {
        let built = config::Config::builder()
            .set_default("app_name", "Cogito")?
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = built.try_deserialize()?;
        config.goals.validate()?;
        Ok(config)
    }
}

/// Unix timestamp in milliseconds (0 if the clock is before the epoch).
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
