//! The internal ant graph, backed by petgraph.
//!
//! Mirrors the topology of the external graph. Each node carries a staged
//! census of the ants standing on it, each edge a weight, and either may
//! carry a [`PheromoneStore`] depending on the simulation's drop target.
//! A `StableGraph` keeps indices valid across removals, with HashMap indices
//! from the external string keys for O(1) lookup.

use std::collections::HashMap;

use formica_core::error::{Result, SimError};
use formica_core::params::DropTarget;
use formica_core::pheromone::{Mergeable, Pheromone, PheromoneStore};
use formica_core::staged::{Shadowed, Stage};
use formica_core::types::ColonyIndex;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// Handle of a node in the internal graph.
pub type NodeId = NodeIndex;

/// Handle of an edge in the internal graph.
pub type EdgeId = EdgeIndex;

/// Population of a node, in total and per colony.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Census {
    total: usize,
    per_colony: Vec<usize>,
}

impl Census {
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn for_colony(&self, colony: ColonyIndex) -> usize {
        self.per_colony.get(colony).copied().unwrap_or(0)
    }

    /// Per-colony counts, indexed by colony. Grown on demand, never shrunk.
    pub fn per_colony(&self) -> &[usize] {
        &self.per_colony
    }

    fn slot(&mut self, colony: ColonyIndex) -> &mut usize {
        if colony >= self.per_colony.len() {
            self.per_colony.resize(colony + 1, 0);
        }
        &mut self.per_colony[colony]
    }
}

/// A graph vertex ants can stand on.
#[derive(Debug, Clone)]
pub struct AntNode<D = ()> {
    key: String,
    value: f64,
    census: Shadowed<Census>,
    pheromones: Option<PheromoneStore<D>>,
}

impl<D: Mergeable> AntNode<D> {
    pub fn new(key: impl Into<String>, drop_target: DropTarget) -> Self {
        let mut node = Self {
            key: key.into(),
            value: 0.0,
            census: Shadowed::default(),
            pheromones: None,
        };
        node.reset(drop_target);
        node
    }

    /// Forget every ant and every pheromone.
    pub fn reset(&mut self, drop_target: DropTarget) {
        self.census.reset(Census::default());
        self.pheromones = drop_target.on_nodes().then(PheromoneStore::new);
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    /// Ants on this node as of the last commit.
    pub fn total_ant_count(&self) -> usize {
        self.census.committed().total()
    }

    /// Ants of one colony on this node as of the last commit.
    pub fn ant_count_for_colony(&self, colony: ColonyIndex) -> usize {
        self.census.committed().for_colony(colony)
    }

    pub fn census(&self) -> &Census {
        self.census.committed()
    }

    /// Total including arrivals and departures staged during this tick.
    pub fn staged_total_ant_count(&self) -> usize {
        self.census.staged().total()
    }

    /// An ant arrived. Only the staged census changes.
    pub fn register_ant(&mut self, colony: ColonyIndex) {
        let census = self.census.staged_mut();
        census.total += 1;
        *census.slot(colony) += 1;
    }

    /// An ant left. Only the staged census changes.
    ///
    /// Every departure must match an earlier arrival of the same colony.
    /// Debug builds panic on an unmatched one.
    pub fn unregister_ant(&mut self, colony: ColonyIndex) {
        let census = self.census.staged_mut();
        debug_assert!(
            census.for_colony(colony) > 0,
            "node '{}': colony {colony} has no ant to unregister",
            self.key
        );
        census.total = census.total.saturating_sub(1);
        let slot = census.slot(colony);
        *slot = slot.saturating_sub(1);
    }

    pub fn needs_commit(&self) -> bool {
        self.census.needs_commit()
    }

    /// Publish the staged census.
    pub fn commit(&mut self) {
        self.census.commit();
    }

    /// End-of-tick update: evaporate and commit pheromone, then publish the
    /// census.
    pub fn step(&mut self, rho: f64) {
        if let Some(store) = self.pheromones.as_mut() {
            store.step(rho);
        }
        self.commit();
    }

    pub fn pheromones(&self) -> Option<&PheromoneStore<D>> {
        self.pheromones.as_ref()
    }

    pub fn pheromones_mut(&mut self) -> Option<&mut PheromoneStore<D>> {
        self.pheromones.as_mut()
    }
}

/// A weighted connection ants can cross.
#[derive(Debug, Clone)]
pub struct AntEdge<D = ()> {
    key: String,
    weight: f64,
    directed: bool,
    pheromones: Option<PheromoneStore<D>>,
}

impl<D: Mergeable> AntEdge<D> {
    /// A zero weight is coerced to 1.
    pub fn new(key: impl Into<String>, weight: f64, directed: bool, drop_target: DropTarget) -> Self {
        let mut edge = Self {
            key: key.into(),
            weight: non_zero(weight),
            directed,
            pheromones: None,
        };
        edge.reset(drop_target);
        edge
    }

    pub fn reset(&mut self, drop_target: DropTarget) {
        self.pheromones = drop_target.on_edges().then(PheromoneStore::new);
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: f64) {
        self.weight = non_zero(weight);
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn step(&mut self, rho: f64) {
        if let Some(store) = self.pheromones.as_mut() {
            store.step(rho);
        }
    }

    pub fn pheromones(&self) -> Option<&PheromoneStore<D>> {
        self.pheromones.as_ref()
    }

    pub fn pheromones_mut(&mut self) -> Option<&mut PheromoneStore<D>> {
        self.pheromones.as_mut()
    }
}

fn non_zero(weight: f64) -> f64 {
    if weight == 0.0 {
        1.0
    } else {
        weight
    }
}

/// A way out of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exit {
    pub edge: EdgeId,
    pub to: NodeId,
    pub weight: f64,
}

/// The simulation's internal graph.
#[derive(Debug)]
pub struct AntGraph<D = ()> {
    graph: StableGraph<AntNode<D>, AntEdge<D>>,
    node_index: HashMap<String, NodeId>,
    edge_index: HashMap<String, EdgeId>,
    drop_target: DropTarget,
    inert: PheromoneStore<D>,
}

impl<D: Mergeable> Default for AntGraph<D> {
    fn default() -> Self {
        Self::new(DropTarget::Edges)
    }
}

impl<D: Mergeable> AntGraph<D> {
    pub fn new(drop_target: DropTarget) -> Self {
        Self {
            graph: StableGraph::new(),
            node_index: HashMap::new(),
            edge_index: HashMap::new(),
            drop_target,
            inert: PheromoneStore::inert(),
        }
    }

    pub fn drop_target(&self) -> DropTarget {
        self.drop_target
    }

    pub fn add_node(&mut self, key: &str) -> Result<NodeId> {
        if self.node_index.contains_key(key) {
            return Err(SimError::DuplicateNode(key.to_string()));
        }
        let id = self.graph.add_node(AntNode::new(key, self.drop_target));
        self.node_index.insert(key.to_string(), id);
        Ok(id)
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<AntNode<D>> {
        let incident: Vec<EdgeId> = self
            .graph
            .edges_directed(id, Direction::Outgoing)
            .chain(self.graph.edges_directed(id, Direction::Incoming))
            .map(|e| e.id())
            .collect();
        for edge in incident {
            if let Some(removed) = self.graph.remove_edge(edge) {
                self.edge_index.remove(removed.key());
            }
        }

        let node = self.graph.remove_node(id)?;
        self.node_index.remove(node.key());
        Some(node)
    }

    pub fn add_edge(&mut self, key: &str, from: &str, to: &str, directed: bool) -> Result<EdgeId> {
        if self.edge_index.contains_key(key) {
            return Err(SimError::DuplicateEdge(key.to_string()));
        }
        let from_id = self.require_node(from)?;
        let to_id = self.require_node(to)?;

        let edge = AntEdge::new(key, 1.0, directed, self.drop_target);
        let id = self.graph.add_edge(from_id, to_id, edge);
        self.edge_index.insert(key.to_string(), id);
        Ok(id)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<AntEdge<D>> {
        let edge = self.graph.remove_edge(id)?;
        self.edge_index.remove(edge.key());
        Some(edge)
    }

    pub fn set_edge_weight(&mut self, id: EdgeId, weight: f64) -> bool {
        match self.graph.edge_weight_mut(id) {
            Some(edge) => {
                edge.set_weight(weight);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.node_index.clear();
        self.edge_index.clear();
    }

    pub fn node_id(&self, key: &str) -> Option<NodeId> {
        self.node_index.get(key).copied()
    }

    pub fn edge_id(&self, key: &str) -> Option<EdgeId> {
        self.edge_index.get(key).copied()
    }

    fn require_node(&self, key: &str) -> Result<NodeId> {
        self.node_id(key)
            .ok_or_else(|| SimError::UnknownNode(key.to_string()))
    }

    pub fn node(&self, id: NodeId) -> Option<&AntNode<D>> {
        self.graph.node_weight(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut AntNode<D>> {
        self.graph.node_weight_mut(id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&AntEdge<D>> {
        self.graph.edge_weight(id)
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut AntEdge<D>> {
        self.graph.edge_weight_mut(id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.graph.contains_node(id)
    }

    pub fn endpoints(&self, id: EdgeId) -> Option<(NodeId, NodeId)> {
        self.graph.edge_endpoints(id)
    }

    /// Node handles in ascending index order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.graph.node_indices().collect()
    }

    /// Edge handles in ascending index order.
    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.graph.edge_indices().collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Edges an ant standing on `node` may cross: outgoing directed edges
    /// and every undirected edge touching it.
    pub fn exits(&self, node: NodeId) -> Vec<Exit> {
        let outgoing = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| Exit {
                edge: e.id(),
                to: e.target(),
                weight: e.weight().weight(),
            });

        let incoming = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .filter(|e| !e.weight().is_directed() && e.source() != node)
            .map(|e| Exit {
                edge: e.id(),
                to: e.source(),
                weight: e.weight().weight(),
            });

        outgoing.chain(incoming).collect()
    }

    /// Pheromone on a node. Nodes without a store answer with the inert store.
    pub fn node_pheromones(&self, id: NodeId) -> &PheromoneStore<D> {
        self.node(id)
            .and_then(AntNode::pheromones)
            .unwrap_or(&self.inert)
    }

    /// Pheromone on an edge. Edges without a store answer with the inert store.
    pub fn edge_pheromones(&self, id: EdgeId) -> &PheromoneStore<D> {
        self.edge(id)
            .and_then(AntEdge::pheromones)
            .unwrap_or(&self.inert)
    }

    /// Queue a deposit on a node. Returns false when the node carries no store.
    pub fn deposit_on_node(&mut self, id: NodeId, pheromone: Pheromone<D>) -> bool {
        match self.node_mut(id).and_then(AntNode::pheromones_mut) {
            Some(store) => {
                store.deposit(pheromone);
                true
            }
            None => false,
        }
    }

    /// Queue a deposit on an edge. Returns false when the edge carries no store.
    pub fn deposit_on_edge(&mut self, id: EdgeId, pheromone: Pheromone<D>) -> bool {
        match self.edge_mut(id).and_then(AntEdge::pheromones_mut) {
            Some(store) => {
                store.deposit(pheromone);
                true
            }
            None => false,
        }
    }

    /// Sum of the committed pheromone of every edge touching `node`.
    pub fn incident_load(&self, node: NodeId) -> f64 {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .chain(
                self.graph
                    .edges_directed(node, Direction::Incoming)
                    .filter(|e| e.source() != node),
            )
            .map(|e| self.edge_pheromones(e.id()).total_load())
            .sum()
    }

    /// Empty every census and pheromone store, switching to `drop_target`.
    pub fn reset_all(&mut self, drop_target: DropTarget) {
        self.drop_target = drop_target;
        for node in self.graph.node_weights_mut() {
            node.reset(drop_target);
        }
        for edge in self.graph.edge_weights_mut() {
            edge.reset(drop_target);
        }
    }

    pub fn step_edges(&mut self, rho: f64) {
        for edge in self.graph.edge_weights_mut() {
            edge.step(rho);
        }
    }

    pub fn step_nodes(&mut self, rho: f64) {
        for node in self.graph.node_weights_mut() {
            node.step(rho);
        }
    }

    /// Committed pheromone summed over every node and every edge.
    pub fn total_loads(&self) -> (f64, f64) {
        let nodes = self
            .graph
            .node_weights()
            .filter_map(AntNode::pheromones)
            .map(PheromoneStore::total_load)
            .sum();
        let edges = self
            .graph
            .edge_weights()
            .filter_map(AntEdge::pheromones)
            .map(PheromoneStore::total_load)
            .sum();
        (nodes, edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(target: DropTarget) -> AntGraph {
        let mut g = AntGraph::new(target);
        g.add_node("a").unwrap();
        g.add_node("b").unwrap();
        g.add_node("c").unwrap();
        g.add_edge("ab", "a", "b", false).unwrap();
        g.add_edge("bc", "b", "c", true).unwrap();
        g.add_edge("ca", "c", "a", false).unwrap();
        g
    }

    #[test]
    fn staged_counts_are_invisible_until_commit() {
        let mut node: AntNode = AntNode::new("n", DropTarget::Edges);
        node.register_ant(0);
        node.register_ant(2);
        node.register_ant(2);
        node.unregister_ant(0);

        assert_eq!(node.total_ant_count(), 0);
        assert_eq!(node.ant_count_for_colony(2), 0);
        assert_eq!(node.staged_total_ant_count(), 2);

        node.commit();
        assert_eq!(node.total_ant_count(), 2);
        assert_eq!(node.ant_count_for_colony(0), 0);
        assert_eq!(node.ant_count_for_colony(2), 2);
        assert_eq!(node.ant_count_for_colony(9), 0);
        assert_eq!(node.census().per_colony().len(), 3);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "has no ant to unregister")]
    fn unmatched_departure_is_a_defect() {
        let mut node: AntNode = AntNode::new("n", DropTarget::Edges);
        node.register_ant(1);
        node.unregister_ant(0);
    }

    #[test]
    fn node_commit_is_idempotent() {
        let mut node: AntNode = AntNode::new("n", DropTarget::Edges);
        node.register_ant(1);
        node.commit();
        assert!(!node.needs_commit());
        node.commit();
        assert_eq!(node.total_ant_count(), 1);
    }

    #[test]
    fn zero_weight_is_coerced() {
        let mut edge: AntEdge = AntEdge::new("e", 0.0, false, DropTarget::Edges);
        assert_eq!(edge.weight(), 1.0);
        edge.set_weight(0.0);
        assert_eq!(edge.weight(), 1.0);
        edge.set_weight(2.5);
        assert_eq!(edge.weight(), 2.5);
    }

    #[test]
    fn drop_target_decides_store_presence() {
        let g = triangle(DropTarget::Nodes);
        let a = g.node_id("a").unwrap();
        let ab = g.edge_id("ab").unwrap();
        assert!(g.node(a).unwrap().pheromones().is_some());
        assert!(g.edge(ab).unwrap().pheromones().is_none());
        assert!(g.edge_pheromones(ab).is_inert());
    }

    #[test]
    fn deposit_without_store_is_ignored() {
        let mut g = triangle(DropTarget::Edges);
        let a = g.node_id("a").unwrap();
        assert!(!g.deposit_on_node(a, Pheromone::new(0, 1.0)));
        g.step_nodes(0.5);
        assert_eq!(g.node_pheromones(a).total_load(), 0.0);
        assert!(g.node_pheromones(a).get(0).is_vacant());
    }

    #[test]
    fn exits_respect_direction() {
        let g = triangle(DropTarget::Edges);
        let a = g.node_id("a").unwrap();
        let b = g.node_id("b").unwrap();
        let c = g.node_id("c").unwrap();

        let mut from_b: Vec<_> = g.exits(b).into_iter().map(|e| e.to).collect();
        from_b.sort();
        assert_eq!(from_b, vec![a, c]);

        // bc is directed b -> c, so c only leaves through ca.
        let from_c: Vec<_> = g.exits(c).into_iter().map(|e| e.to).collect();
        assert_eq!(from_c, vec![a]);
    }

    #[test]
    fn removing_node_drops_incident_edges() {
        let mut g = triangle(DropTarget::Edges);
        let b = g.node_id("b").unwrap();
        g.remove_node(b).unwrap();

        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert!(g.edge_id("ab").is_none());
        assert!(g.edge_id("bc").is_none());
        assert!(g.edge_id("ca").is_some());
        assert!(g.node_id("b").is_none());
    }

    #[test]
    fn duplicate_and_dangling_keys_are_rejected() {
        let mut g = triangle(DropTarget::Edges);
        assert_eq!(g.add_node("a"), Err(SimError::DuplicateNode("a".into())));
        assert_eq!(
            g.add_edge("ab", "a", "b", false),
            Err(SimError::DuplicateEdge("ab".into()))
        );
        assert_eq!(
            g.add_edge("ax", "a", "x", false),
            Err(SimError::UnknownNode("x".into()))
        );
    }

    #[test]
    fn incident_load_sums_edges() {
        let mut g = triangle(DropTarget::Edges);
        let a = g.node_id("a").unwrap();
        let ab = g.edge_id("ab").unwrap();
        let ca = g.edge_id("ca").unwrap();
        g.deposit_on_edge(ab, Pheromone::new(0, 1.0));
        g.deposit_on_edge(ca, Pheromone::new(1, 2.0));
        g.step_edges(0.5);
        assert_eq!(g.incident_load(a), 3.0);
        assert_eq!(g.total_loads(), (0.0, 3.0));
    }

    #[test]
    fn reset_all_forgets_state() {
        let mut g = triangle(DropTarget::Edges);
        let a = g.node_id("a").unwrap();
        let ab = g.edge_id("ab").unwrap();
        g.node_mut(a).unwrap().register_ant(0);
        g.deposit_on_edge(ab, Pheromone::new(0, 1.0));
        g.step_edges(1.0);
        g.step_nodes(1.0);

        g.reset_all(DropTarget::NodesAndEdges);
        assert_eq!(g.node(a).unwrap().total_ant_count(), 0);
        assert_eq!(g.edge_pheromones(ab).total_load(), 0.0);
        assert!(g.node(a).unwrap().pheromones().is_some());
    }
}
