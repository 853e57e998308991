//! Shared identifiers used across all Formica crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a colony in the simulation's colony arena.
///
/// Indices are stable for the lifetime of a colony and may be reused once
/// the colony is removed.
pub type ColonyIndex = usize;

/// Identity keying pheromone accumulators. Ants mark with their colony index.
pub type Marker = usize;

/// The current tick of the simulation.
pub type Tick = u64;

/// Unique identifier for an ant inside its colony.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AntId(pub String);

impl AntId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Deterministic identifier derived from the colony name and a sequence
    /// counter owned by the colony.
    pub fn synthesize(colony: &str, seq: u64) -> Self {
        Self(format!("{}_{:05x}", colony, seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AntId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AntId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesized_ids_are_deterministic() {
        assert_eq!(AntId::synthesize("red", 0).as_str(), "red_00000");
        assert_eq!(AntId::synthesize("red", 0x1f).as_str(), "red_0001f");
        assert_eq!(AntId::synthesize("blue", 3), AntId::synthesize("blue", 3));
    }
}
