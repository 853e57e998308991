//! Serializable snapshots of a simulation.

use formica_core::types::{ColonyIndex, Tick};
use serde::Serialize;

use crate::context::TickCounters;

/// Identity and size of one colony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColonyInfo {
    pub name: String,
    pub index: ColonyIndex,
    pub ant_count: usize,
}

/// Snapshot of the whole simulation, taken between ticks.
#[derive(Debug, Clone, Serialize)]
pub struct SimStats {
    pub tick: Tick,
    /// Global ant count as tracked by the population policy.
    pub ant_count: usize,
    pub colonies: Vec<ColonyInfo>,
    pub node_count: usize,
    pub edge_count: usize,
    pub counters: TickCounters,
    /// Committed pheromone summed over every node.
    pub node_load: f64,
    /// Committed pheromone summed over every edge.
    pub edge_load: f64,
}

impl SimStats {
    /// Live ants summed over the colonies, which can differ from
    /// `ant_count` until the policy resyncs at the end of the next tick.
    pub fn live_ants(&self) -> usize {
        self.colonies.iter().map(|c| c.ant_count).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
