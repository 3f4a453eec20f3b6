//! Error type shared by every subsystem of the cognitive core.
//!
//! All variants are local, recoverable conditions reported to the immediate caller.
//! A goal-generation trigger that collides with a running cycle is not an error; see
//! [`CycleOutcome::Coalesced`](crate::CycleOutcome::Coalesced).

use thiserror::Error;

use crate::atomspace::Handle;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CogitoError {
    #[error("unknown atom: {0}")]
    UnknownAtom(Handle),

    #[error("atom in use: {node} is referenced by {links} link(s)")]
    AtomInUse { node: Handle, links: usize },

    #[error("link outgoing set must not be empty")]
    EmptyOutgoing,

    #[error("value out of range: {field}={value} (allowed {min}..={max})")]
    ValueOutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("unknown task: #{0}")]
    UnknownTask(u64),

    #[error("unknown goal: #{0}")]
    UnknownGoal(u64),

    #[error("invalid transition for #{id}: {from} -> {to}")]
    InvalidTransition {
        id: u64,
        from: &'static str,
        to: &'static str,
    },

    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("config error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for CogitoError {
    fn from(e: config::ConfigError) -> Self {
        CogitoError::Config(e.to_string())
    }
}

pub type CogitoResult<T> = Result<T, CogitoError>;
