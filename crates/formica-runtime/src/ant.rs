//! The agent contract.
//!
//! An ant owns an [`AntBody`] (identity and position) and a behaviour that
//! runs once per tick through [`Ant::step`]. The behaviour sees the world
//! through a [`TickScope`]: the graph, the parameters, the simulation's
//! random generator and its bookkeeping counters. Every census change it
//! makes goes through the nodes' staged buffers, so other ants deciding in
//! the same tick still read the pre-tick state.

use formica_core::error::Result;
use formica_core::params::SimParams;
use formica_core::pheromone::{Mergeable, Pheromone};
use formica_core::types::{AntId, ColonyIndex};
use rand_chacha::ChaCha8Rng;

use crate::context::TickCounters;
use crate::graph::{AntGraph, EdgeId, NodeId};

/// Identity and position shared by every ant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AntBody {
    id: AntId,
    colony: ColonyIndex,
    location: Option<NodeId>,
    start: Option<NodeId>,
}

impl AntBody {
    /// A body that is nowhere yet and will be placed on `start` when its
    /// colony admits it.
    pub fn new(id: AntId, colony: ColonyIndex, start: Option<NodeId>) -> Self {
        Self {
            id,
            colony,
            location: None,
            start,
        }
    }

    pub fn id(&self) -> &AntId {
        &self.id
    }

    pub fn colony(&self) -> ColonyIndex {
        self.colony
    }

    pub fn location(&self) -> Option<NodeId> {
        self.location
    }

    pub fn start(&self) -> Option<NodeId> {
        self.start
    }

    /// Leave the current node and enter `target`.
    ///
    /// Both sides go through the staged census. A target that is not in the
    /// graph leaves the ant nowhere. Ants move through
    /// [`TickScope::move_body`].
    pub(crate) fn go_to<D: Mergeable>(&mut self, target: Option<NodeId>, graph: &mut AntGraph<D>) {
        if let Some(current) = self.location.take() {
            if let Some(node) = graph.node_mut(current) {
                node.unregister_ant(self.colony);
            }
        }

        if let Some(target) = target {
            if let Some(node) = graph.node_mut(target) {
                node.register_ant(self.colony);
                self.location = Some(target);
            }
        }
    }

    /// Drop every reference to `node`, which is about to leave the graph.
    /// The census is not touched since the node goes with it.
    pub fn forget(&mut self, node: NodeId) {
        if self.location == Some(node) {
            self.location = None;
        }
        if self.start == Some(node) {
            self.start = None;
        }
    }
}

/// A mobile agent.
pub trait Ant<D: Mergeable = ()>: Send {
    fn body(&self) -> &AntBody;

    fn body_mut(&mut self) -> &mut AntBody;

    /// Run the behaviour once. Called by the owning colony during the tick.
    fn step(&mut self, scope: &mut TickScope<'_, D>) -> Result<()>;

    fn id(&self) -> &AntId {
        self.body().id()
    }

    fn colony(&self) -> ColonyIndex {
        self.body().colony()
    }

    fn location(&self) -> Option<NodeId> {
        self.body().location()
    }
}

/// Builds the ants of a colony.
pub trait AntFactory<D: Mergeable = ()>: Send + Sync {
    fn new_ant(&self, id: AntId, colony: ColonyIndex, start: Option<NodeId>) -> Box<dyn Ant<D>>;
}

impl<D, F> AntFactory<D> for F
where
    D: Mergeable,
    F: Fn(AntId, ColonyIndex, Option<NodeId>) -> Box<dyn Ant<D>> + Send + Sync,
{
    fn new_ant(&self, id: AntId, colony: ColonyIndex, start: Option<NodeId>) -> Box<dyn Ant<D>> {
        self(id, colony, start)
    }
}

/// What an ant may touch while its colony steps.
///
/// The graph is only readable through [`TickScope::graph`]. The only
/// writes an ant may make are moving its own body and depositing
/// pheromone, both staged until the end of the tick, so the topology never
/// changes while ants run.
///
/// ```compile_fail
/// use formica_runtime::ant::TickScope;
/// use formica_runtime::graph::NodeId;
///
/// fn vandal(scope: &mut TickScope<'_>, node: NodeId) {
///     scope.graph().remove_node(node);
/// }
/// ```
pub struct TickScope<'a, D = ()> {
    graph: &'a mut AntGraph<D>,
    pub params: &'a SimParams,
    pub rng: &'a mut ChaCha8Rng,
    counters: &'a mut TickCounters,
}

impl<'a, D: Mergeable> TickScope<'a, D> {
    pub fn new(
        graph: &'a mut AntGraph<D>,
        params: &'a SimParams,
        rng: &'a mut ChaCha8Rng,
        counters: &'a mut TickCounters,
    ) -> Self {
        Self {
            graph,
            params,
            rng,
            counters,
        }
    }

    /// Read-only view of the graph as of the start of the tick.
    pub fn graph(&self) -> &AntGraph<D> {
        self.graph
    }

    /// Move `body` to `target` through the staged census.
    pub fn move_body(&mut self, body: &mut AntBody, target: Option<NodeId>) {
        body.go_to(target, self.graph);
    }

    /// Stage a deposit on a node. False when the node carries no pheromone.
    pub fn deposit_on_node(&mut self, node: NodeId, pheromone: Pheromone<D>) -> bool {
        self.graph.deposit_on_node(node, pheromone)
    }

    /// Stage a deposit on an edge. False when the edge carries no pheromone.
    pub fn deposit_on_edge(&mut self, edge: EdgeId, pheromone: Pheromone<D>) -> bool {
        self.graph.deposit_on_edge(edge, pheromone)
    }

    /// An ant of `colony` jumped.
    pub fn incr_jumps(&mut self, colony: ColonyIndex) {
        self.counters.record_jump(colony);
    }

    /// An ant arrived on an over-populated node.
    pub fn incr_over_populated(&mut self) {
        self.counters.over_populated += 1;
    }

    /// An ant moved into another colony's territory.
    pub fn incr_migrations(&mut self) {
        self.counters.migrations += 1;
    }

    pub fn counters(&self) -> &TickCounters {
        self.counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formica_core::params::DropTarget;
    use rand::SeedableRng;

    fn line() -> (AntGraph, NodeId, NodeId) {
        let mut graph = AntGraph::new(DropTarget::Edges);
        let a = graph.add_node("a").unwrap();
        let b = graph.add_node("b").unwrap();
        (graph, a, b)
    }

    #[test]
    fn go_to_moves_staged_census() {
        let (mut graph, a, b) = line();
        let mut body = AntBody::new(AntId::new("x"), 1, Some(a));
        assert_eq!(body.location(), None);

        body.go_to(Some(a), &mut graph);
        graph.step_nodes(1.0);
        assert_eq!(graph.node(a).unwrap().ant_count_for_colony(1), 1);

        body.go_to(Some(b), &mut graph);
        assert_eq!(body.location(), Some(b));
        // Nothing visible before the nodes commit.
        assert_eq!(graph.node(a).unwrap().total_ant_count(), 1);
        assert_eq!(graph.node(b).unwrap().total_ant_count(), 0);

        graph.step_nodes(1.0);
        assert_eq!(graph.node(a).unwrap().total_ant_count(), 0);
        assert_eq!(graph.node(b).unwrap().ant_count_for_colony(1), 1);
    }

    #[test]
    fn go_to_missing_node_leaves_ant_nowhere() {
        let (mut graph, a, b) = line();
        let mut body = AntBody::new(AntId::new("x"), 0, None);
        body.go_to(Some(a), &mut graph);
        graph.remove_node(b);

        body.go_to(Some(b), &mut graph);
        assert_eq!(body.location(), None);
        graph.step_nodes(1.0);
        assert_eq!(graph.node(a).unwrap().total_ant_count(), 0);
    }

    #[test]
    fn forget_clears_references() {
        let (mut graph, a, _) = line();
        let mut body = AntBody::new(AntId::new("x"), 0, Some(a));
        body.go_to(Some(a), &mut graph);
        body.forget(a);
        assert_eq!(body.location(), None);
        assert_eq!(body.start(), None);
    }

    #[test]
    fn scope_effects_are_staged() {
        let mut graph: AntGraph = AntGraph::new(DropTarget::NodesAndEdges);
        let a = graph.add_node("a").unwrap();
        let b = graph.add_node("b").unwrap();
        let ab = graph.add_edge("ab", "a", "b", false).unwrap();
        let params = SimParams::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut counters = TickCounters::default();
        let mut body = AntBody::new(AntId::new("x"), 0, None);

        {
            let mut scope = TickScope::new(&mut graph, &params, &mut rng, &mut counters);
            scope.move_body(&mut body, Some(a));
            assert!(scope.deposit_on_node(b, Pheromone::new(0, 1.0)));
            assert!(scope.deposit_on_edge(ab, Pheromone::new(0, 1.0)));

            // Reads see the state the tick started from.
            assert_eq!(scope.graph().node(a).unwrap().total_ant_count(), 0);
            assert_eq!(scope.graph().node_pheromones(b).total_load(), 0.0);
            assert_eq!(scope.graph().node_count(), 2);
        }

        assert_eq!(body.location(), Some(a));
        graph.step_edges(1.0);
        graph.step_nodes(1.0);
        assert_eq!(graph.node(a).unwrap().total_ant_count(), 1);
        assert_eq!(graph.node_pheromones(b).load(0), 1.0);
        assert_eq!(graph.edge_pheromones(ab).load(0), 1.0);
    }

    #[test]
    fn scope_counts_jumps_per_colony() {
        let (mut graph, _, _) = line();
        let params = SimParams::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut counters = TickCounters::default();

        let mut scope = TickScope::new(&mut graph, &params, &mut rng, &mut counters);
        scope.incr_jumps(2);
        scope.incr_jumps(2);
        scope.incr_over_populated();
        scope.incr_migrations();

        assert_eq!(counters.jumps, 2);
        assert_eq!(counters.jumps_per_colony, vec![0, 0, 2]);
        assert_eq!(counters.over_populated, 1);
        assert_eq!(counters.migrations, 1);
    }
}
