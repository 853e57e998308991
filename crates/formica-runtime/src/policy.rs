//! Population policies.
//!
//! A policy decides how many ants of which colony live where. It reacts to
//! nodes and colonies coming and going by staging `add_ant`/`remove_ants`
//! calls on colonies; nothing it asks for is visible before the colonies
//! commit at the start of the next tick.

use formica_core::params::SimParams;
use formica_core::pheromone::Mergeable;
use formica_core::types::ColonyIndex;
use tracing::debug;

use crate::colony::{Colony, ColonyArena};
use crate::graph::{AntGraph, NodeId};

/// What a policy reaction may touch.
pub struct PolicyScope<'a, D = ()> {
    pub colonies: &'a mut ColonyArena<D>,
    pub graph: &'a AntGraph<D>,
    pub params: &'a SimParams,
}

/// Strategy keeping colony populations in line with the graph.
pub trait PopulationPolicy<D: Mergeable = ()>: Send {
    /// Forget all cached state. Called by `init`.
    fn reset(&mut self);

    /// Global ant count as tracked by the policy.
    fn ant_count(&self) -> usize;

    fn node_added(&mut self, scope: &mut PolicyScope<'_, D>, node: NodeId);

    /// Called while the node is still in the graph.
    fn node_removed(&mut self, scope: &mut PolicyScope<'_, D>, node: NodeId);

    /// Called once the colony holds its slot in the arena.
    fn colony_added(&mut self, scope: &mut PolicyScope<'_, D>, colony: ColonyIndex);

    /// Called before the colony is torn down, while it still has members.
    fn colony_removed(&mut self, colony: &Colony<D>);

    /// End-of-tick census.
    fn step(&mut self, colonies: &ColonyArena<D>);
}

/// Keeps every colony proportionally represented on every node.
///
/// Colony count here is the arena's slot count, tombstones included, so
/// the round-robin window lines up with colony indices.
#[derive(Debug, Clone, Default)]
pub struct ProportionalPolicy {
    cursor: usize,
    ant_count: usize,
}

impl ProportionalPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next colony index to receive an ant in the round-robin regime.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Ants of each colony placed on a new node, 0 meaning round-robin.
    fn share(params: &SimParams, colonies: usize) -> usize {
        if params.ants_per_vertex_per_colony > 0 {
            params.ants_per_vertex_per_colony
        } else {
            params.ants_per_vertex / colonies
        }
    }

    fn add<D: Mergeable>(&mut self, colony: &mut Colony<D>, node: NodeId) {
        colony.add_ant(None, Some(node));
        self.ant_count += 1;
    }

    fn remove<D: Mergeable>(&mut self, colony: &mut Colony<D>, n: usize) {
        let staged = colony.remove_ants(n);
        self.ant_count = self.ant_count.saturating_sub(staged);
    }

    /// Colony indices of the round-robin window starting at the cursor.
    fn window(&self, width: usize, colonies: usize) -> impl Iterator<Item = ColonyIndex> {
        let start = self.cursor;
        (0..width).map(move |k| (start + k) % colonies)
    }
}

impl<D: Mergeable> PopulationPolicy<D> for ProportionalPolicy {
    fn reset(&mut self) {
        self.cursor = 0;
        self.ant_count = 0;
    }

    fn ant_count(&self) -> usize {
        self.ant_count
    }

    fn node_added(&mut self, scope: &mut PolicyScope<'_, D>, node: NodeId) {
        let colonies = scope.colonies.slot_count();
        if colonies == 0 {
            return;
        }

        let per_vertex = scope.params.ants_per_vertex;
        let share = Self::share(scope.params, colonies);

        if share > 0 {
            for colony in scope.colonies.iter_mut() {
                for _ in 0..share {
                    self.add(colony, node);
                }
            }
        } else {
            let window: Vec<_> = self.window(per_vertex, colonies).collect();
            for index in window {
                if let Some(colony) = scope.colonies.get_mut(index) {
                    self.add(colony, node);
                }
            }
        }

        self.cursor = (self.cursor + per_vertex) % colonies;
        debug!(?node, share, cursor = self.cursor, "Allocated ants on new node");
    }

    fn node_removed(&mut self, scope: &mut PolicyScope<'_, D>, node: NodeId) {
        let colonies = scope.colonies.slot_count();
        if colonies == 0 {
            return;
        }

        let per_vertex = scope.params.ants_per_vertex;
        let share = Self::share(scope.params, colonies);

        if share > 0 {
            let indices: Vec<_> = scope.colonies.iter().map(Colony::index).collect();
            for index in indices {
                if let Some(colony) = scope.colonies.get_mut(index) {
                    self.remove(colony, share);
                }
            }
        } else {
            // Undo the most recent window so the next node reuses it.
            self.cursor = (self.cursor + colonies - per_vertex % colonies) % colonies;
            let window: Vec<_> = self.window(per_vertex, colonies).collect();
            for index in window {
                if let Some(colony) = scope.colonies.get_mut(index) {
                    self.remove(colony, 1);
                }
            }
        }

        debug!(?node, share, cursor = self.cursor, "Released ants of removed node");
    }

    fn colony_added(&mut self, scope: &mut PolicyScope<'_, D>, colony: ColonyIndex) {
        let nodes = scope.graph.node_ids();
        if nodes.is_empty() {
            return;
        }

        let colonies = scope.colonies.slot_count();
        let average = self.ant_count / colonies;
        let to_remove = if colonies > 1 {
            average / (colonies - 1)
        } else {
            0
        };

        let others: Vec<_> = scope
            .colonies
            .iter()
            .map(Colony::index)
            .filter(|&i| i != colony)
            .collect();
        for index in others {
            if let Some(other) = scope.colonies.get_mut(index) {
                self.remove(other, to_remove);
            }
        }

        let Some(target) = scope.colonies.get_mut(colony) else {
            return;
        };

        let per_node = average / nodes.len();
        let mut added = 0;
        for &node in &nodes {
            for _ in 0..per_node {
                self.add(target, node);
                added += 1;
            }
        }

        // Integer division loses at most one ant per node.
        let remains = average - added;
        for &node in nodes.iter().take(remains) {
            self.add(target, node);
            added += 1;
        }

        debug!(colony, average, to_remove, added, "Populated new colony");
    }

    fn colony_removed(&mut self, colony: &Colony<D>) {
        self.ant_count = self.ant_count.saturating_sub(colony.ant_count());
    }

    fn step(&mut self, colonies: &ColonyArena<D>) {
        self.ant_count = colonies.ant_count();
    }
}
