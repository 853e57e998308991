//! Error types for Formica operations.
//!
//! Consistency defects in the stage/commit discipline, configuration
//! problems and topology feed anomalies all surface as [`SimError`].
//! Empty-state queries (a marker never deposited, a minimum over an empty
//! store) are not errors and never appear here.

use std::fmt;
use thiserror::Error;

use crate::types::{Marker, Tick};

/// Result type for Formica operations.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors that can occur while driving a simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Two accumulators carrying different markers were fused.
    #[error("pheromone marker mismatch: expected {expected}, found {found}")]
    MarkerMismatch { expected: Marker, found: Marker },

    /// A staged removal referenced an ant that is not a member.
    #[error("ant '{0}' staged for removal is not a member")]
    MissingMember(String),

    /// A staged addition reused the id of an existing member.
    #[error("ant identifier '{0}' is already registered")]
    DuplicateMember(String),

    /// A colony with this name already exists.
    #[error("colony '{0}' already exists")]
    DuplicateColony(String),

    /// No live colony has this name.
    #[error("colony '{0}' not found")]
    UnknownColony(String),

    /// The node key is already present in the graph.
    #[error("node '{0}' already exists")]
    DuplicateNode(String),

    /// The node key is not present in the graph.
    #[error("node '{0}' not found")]
    UnknownNode(String),

    /// The edge key is already present in the graph.
    #[error("edge '{0}' already exists")]
    DuplicateEdge(String),

    /// The edge key is not present in the graph.
    #[error("edge '{0}' not found")]
    UnknownEdge(String),

    /// Parameters failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An agent behaviour failed during a tick.
    #[error("ant '{ant}' failed: {reason}")]
    Agent { ant: String, reason: String },

    /// A previous tick panicked while holding the simulation section.
    #[error("simulation section poisoned by an earlier panic")]
    SectionPoisoned,

    /// A tick failed part way. The run stays failed until re-initialised.
    #[error("run failed during tick {tick}: {cause}")]
    RunFailed { tick: Tick, cause: Box<SimError> },
}

impl SimError {
    pub fn agent(ant: impl fmt::Display, reason: impl Into<String>) -> Self {
        SimError::Agent {
            ant: ant.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error signals a broken stage/commit invariant rather than
    /// bad input.
    pub fn is_consistency_defect(&self) -> bool {
        matches!(
            self,
            SimError::MarkerMismatch { .. }
                | SimError::MissingMember(_)
                | SimError::DuplicateMember(_)
        )
    }
}

/// A single violated parameter constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamViolation {
    pub field: &'static str,
    pub value: String,
    pub constraint: &'static str,
}

impl ParamViolation {
    pub fn new(field: &'static str, value: impl fmt::Display, constraint: &'static str) -> Self {
        Self {
            field,
            value: value.to_string(),
            constraint,
        }
    }
}

impl fmt::Display for ParamViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {} (must be {})", self.field, self.value, self.constraint)
    }
}

/// Configuration errors, reported before any simulation state is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// One or more parameters are out of range.
    #[error("invalid parameters: {}", join_violations(.violations))]
    Invalid { violations: Vec<ParamViolation> },
}

impl ConfigError {
    pub fn violations(&self) -> &[ParamViolation] {
        match self {
            ConfigError::Invalid { violations } => violations,
        }
    }
}

fn join_violations(violations: &[ParamViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
