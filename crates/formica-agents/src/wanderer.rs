//! Wanderer: a reference ant that walks the graph by edge weight.
//!
//! The Wanderer exercises every effect an ant may have on the world without
//! any pheromone-driven decision making:
//!
//! - unplaced, it jumps onto a random node
//! - otherwise it crosses an exit chosen with probability proportional to
//!   the edge weight, and marks what it crossed with its colony's marker
//! - on an over-populated node, or with no way out, it jumps according to
//!   the jump mode
//!
//! It counts over-population when it lands on a crowded node and migration
//! when it lands on a node another colony dominates.

use std::sync::Arc;

use formica_core::error::Result;
use formica_core::params::JumpMode;
use formica_core::pheromone::{Mergeable, Pheromone};
use formica_core::types::{AntId, ColonyIndex, Marker};
use formica_runtime::ant::{Ant, AntBody, AntFactory, TickScope};
use formica_runtime::graph::{AntGraph, Exit, NodeId};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::trace;

/// The reference ant.
#[derive(Debug, Clone)]
pub struct Wanderer {
    body: AntBody,
    moves: u64,
    jumps: u64,
}

impl Wanderer {
    pub fn new(id: AntId, colony: ColonyIndex, start: Option<NodeId>) -> Self {
        Self {
            body: AntBody::new(id, colony, start),
            moves: 0,
            jumps: 0,
        }
    }

    /// Edges crossed so far.
    pub fn moves(&self) -> u64 {
        self.moves
    }

    /// Jumps taken so far.
    pub fn jumps(&self) -> u64 {
        self.jumps
    }

    fn marker(&self) -> Marker {
        self.body.colony()
    }

    /// Land on a uniformly chosen node. Nothing happens on an empty graph.
    fn jump<D: Mergeable>(&mut self, scope: &mut TickScope<'_, D>) {
        let nodes = scope.graph().node_ids();
        let Some(&target) = nodes.choose(&mut *scope.rng) else {
            return;
        };

        scope.move_body(&mut self.body, Some(target));
        self.jumps += 1;
        scope.incr_jumps(self.body.colony());
        trace!(ant = %self.body.id(), ?target, "Jumped");
    }

    /// Take `hops` uniformly chosen exits, leaving no pheromone behind.
    fn flee<D: Mergeable>(&mut self, hops: u32, scope: &mut TickScope<'_, D>) {
        let Some(mut here) = self.body.location() else {
            self.jump(scope);
            return;
        };

        for _ in 0..hops {
            let exits = scope.graph().exits(here);
            match exits.choose(&mut *scope.rng) {
                Some(exit) => here = exit.to,
                None => break,
            }
        }

        scope.move_body(&mut self.body, Some(here));
        self.jumps += 1;
        scope.incr_jumps(self.body.colony());
    }

    /// Leave the neighbourhood as the jump mode says. Returns false when the
    /// ant stays put.
    fn escape<D: Mergeable>(&mut self, scope: &mut TickScope<'_, D>) -> bool {
        match scope.params.jump_mode() {
            JumpMode::Never => false,
            JumpMode::Random => {
                self.jump(scope);
                true
            }
            JumpMode::Flee(hops) => {
                self.flee(hops, scope);
                true
            }
        }
    }

    fn cross<D: Mergeable>(&mut self, exit: Exit, scope: &mut TickScope<'_, D>) {
        let marker = self.marker();
        let drop = scope.params.pheromone_drop;
        let target = scope.params.drop_target;

        if target.on_edges() {
            scope.deposit_on_edge(exit.edge, Pheromone::new(marker, drop));
        }
        scope.move_body(&mut self.body, Some(exit.to));
        if target.on_nodes() {
            scope.deposit_on_node(exit.to, Pheromone::new(marker, drop));
        }
        self.moves += 1;

        if let Some(node) = scope.graph().node(exit.to) {
            if node.total_ant_count() >= scope.params.over_populated {
                scope.incr_over_populated();
            }
        }
        if territory(scope.graph(), exit.to).is_some_and(|owner| owner != marker) {
            scope.incr_migrations();
        }
    }
}

/// Pick an exit with probability proportional to its weight, uniformly when
/// the weights cannot be used.
fn pick<'e, R: Rng + ?Sized>(exits: &'e [Exit], rng: &mut R) -> Option<&'e Exit> {
    match WeightedIndex::new(exits.iter().map(|e| e.weight.abs())) {
        Ok(dist) => exits.get(dist.sample(rng)),
        Err(_) => exits.choose(rng),
    }
}

/// The colony whose pheromone dominates a node: read from the node when it
/// carries pheromone, otherwise from the edges around it.
fn territory<D: Mergeable>(graph: &AntGraph<D>, node: NodeId) -> Option<Marker> {
    let store = graph.node_pheromones(node);
    if !store.is_inert() {
        return store.strongest_marker();
    }

    let mut loads: Vec<f64> = Vec::new();
    for exit in graph.exits(node) {
        for pheromone in graph.edge_pheromones(exit.edge).iter() {
            let marker = pheromone.marker();
            if marker >= loads.len() {
                loads.resize(marker + 1, 0.0);
            }
            loads[marker] += pheromone.load();
        }
    }

    let mut best: Option<(Marker, f64)> = None;
    for (marker, &load) in loads.iter().enumerate() {
        if load > best.map_or(0.0, |(_, l)| l) {
            best = Some((marker, load));
        }
    }
    best.map(|(marker, _)| marker)
}

impl<D: Mergeable> Ant<D> for Wanderer {
    fn body(&self) -> &AntBody {
        &self.body
    }

    fn body_mut(&mut self) -> &mut AntBody {
        &mut self.body
    }

    fn step(&mut self, scope: &mut TickScope<'_, D>) -> Result<()> {
        let Some(here) = self.body.location() else {
            self.jump(scope);
            return Ok(());
        };

        let crowded = scope
            .graph()
            .node(here)
            .is_some_and(|n| n.total_ant_count() >= scope.params.over_populated);
        if crowded && self.escape(scope) {
            return Ok(());
        }

        let exits = scope.graph().exits(here);
        match pick(&exits, &mut *scope.rng) {
            Some(&exit) => self.cross(exit, scope),
            None => {
                self.escape(scope);
            }
        }
        Ok(())
    }
}

/// Factory building Wanderers, for `SimulationBuilder::new` or
/// `add_colony_with`.
pub fn wanderer_factory<D: Mergeable>() -> Arc<dyn AntFactory<D>> {
    Arc::new(|id: AntId, colony: ColonyIndex, start: Option<NodeId>| {
        Box::new(Wanderer::new(id, colony, start)) as Box<dyn Ant<D>>
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use formica_core::params::{DropTarget, SimParams};
    use formica_runtime::context::TickCounters;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct World {
        graph: AntGraph,
        params: SimParams,
        rng: ChaCha8Rng,
        counters: TickCounters,
    }

    impl World {
        fn new(params: SimParams) -> Self {
            Self {
                graph: AntGraph::new(params.drop_target),
                params,
                rng: ChaCha8Rng::seed_from_u64(42),
                counters: TickCounters::default(),
            }
        }

        fn place(&mut self, ant: &mut Wanderer, node: NodeId) {
            let mut scope =
                TickScope::new(&mut self.graph, &self.params, &mut self.rng, &mut self.counters);
            scope.move_body(&mut ant.body, Some(node));
        }

        fn step(&mut self, ant: &mut Wanderer) {
            let mut scope =
                TickScope::new(&mut self.graph, &self.params, &mut self.rng, &mut self.counters);
            Ant::<()>::step(ant, &mut scope).unwrap();
            self.graph.step_edges(self.params.rho);
            self.graph.step_nodes(self.params.rho);
        }
    }

    fn pair(params: SimParams) -> (World, NodeId, NodeId) {
        let mut world = World::new(params);
        let a = world.graph.add_node("a").unwrap();
        let b = world.graph.add_node("b").unwrap();
        world.graph.add_edge("ab", "a", "b", false).unwrap();
        (world, a, b)
    }

    #[test]
    fn unplaced_ant_jumps_in() {
        let (mut world, _, _) = pair(SimParams::default());
        let mut ant = Wanderer::new(AntId::new("w"), 0, None);
        world.step(&mut ant);

        assert!(ant.body.location().is_some());
        assert_eq!(ant.jumps(), 1);
        assert_eq!(world.counters.jumps_for_colony(0), 1);
    }

    #[test]
    fn empty_graph_keeps_ant_unplaced() {
        let mut world = World::new(SimParams::default());
        let mut ant = Wanderer::new(AntId::new("w"), 0, None);
        world.step(&mut ant);
        assert_eq!(ant.body.location(), None);
        assert_eq!(world.counters.jumps, 0);
    }

    #[test]
    fn crossing_marks_the_edge() {
        let (mut world, a, b) = pair(SimParams::default().with_rho(1.0));
        let mut ant = Wanderer::new(AntId::new("w"), 3, Some(a));
        world.place(&mut ant, a);

        world.step(&mut ant);
        assert_eq!(ant.body.location(), Some(b));
        assert_eq!(ant.moves(), 1);

        let ab = world.graph.edge_id("ab").unwrap();
        assert_eq!(world.graph.edge_pheromones(ab).load(3), 0.1);
        assert_eq!(world.graph.node(b).unwrap().ant_count_for_colony(3), 1);
        assert_eq!(world.graph.node(a).unwrap().total_ant_count(), 0);
    }

    #[test]
    fn node_drop_target_marks_destination() {
        let params = SimParams::default()
            .with_rho(1.0)
            .with_drop_target(DropTarget::Nodes);
        let (mut world, a, b) = pair(params);
        let mut ant = Wanderer::new(AntId::new("w"), 1, Some(a));
        world.place(&mut ant, a);

        world.step(&mut ant);
        assert_eq!(world.graph.node_pheromones(b).load(1), 0.1);
        let ab = world.graph.edge_id("ab").unwrap();
        assert!(world.graph.edge_pheromones(ab).is_inert());
    }

    #[test]
    fn dead_end_respects_jump_mode() {
        let mut world = World::new(SimParams::default().with_jump(0));
        let a = world.graph.add_node("a").unwrap();
        let mut ant = Wanderer::new(AntId::new("w"), 0, Some(a));
        world.place(&mut ant, a);

        world.step(&mut ant);
        assert_eq!(ant.body.location(), Some(a));
        assert_eq!(ant.jumps(), 0);

        world.params = world.params.clone().with_jump(1);
        world.step(&mut ant);
        assert_eq!(ant.jumps(), 1);
    }

    #[test]
    fn foreign_territory_counts_migration() {
        let (mut world, a, b) = pair(SimParams::default().with_rho(1.0));
        let ab = world.graph.edge_id("ab").unwrap();
        world.graph.deposit_on_edge(ab, Pheromone::new(0, 5.0));
        world.graph.step_edges(1.0);

        let mut ant = Wanderer::new(AntId::new("w"), 1, Some(a));
        world.place(&mut ant, a);
        world.step(&mut ant);

        assert_eq!(ant.body.location(), Some(b));
        assert_eq!(world.counters.migrations, 1);
    }

    #[test]
    fn crowded_destination_counts_over_population() {
        let params = SimParams::default()
            .with_ants_per_vertex(1)
            .with_over_populated(1)
            .with_jump(0);
        let (mut world, a, b) = pair(params);
        world.graph.node_mut(b).unwrap().register_ant(2);
        world.graph.step_nodes(1.0);

        let mut ant = Wanderer::new(AntId::new("w"), 0, Some(a));
        world.place(&mut ant, a);
        world.graph.step_nodes(1.0);
        world.step(&mut ant);

        assert_eq!(world.counters.over_populated, 1);
    }

    #[test]
    fn crowded_ant_flees() {
        let params = SimParams::default()
            .with_ants_per_vertex(1)
            .with_over_populated(1)
            .with_jump(3);
        let (mut world, a, _) = pair(params);
        let mut ant = Wanderer::new(AntId::new("w"), 0, Some(a));
        world.place(&mut ant, a);
        world.graph.step_nodes(1.0);

        world.step(&mut ant);
        assert_eq!(ant.jumps(), 1);
        assert_eq!(ant.moves(), 0);
        let ab = world.graph.edge_id("ab").unwrap();
        assert_eq!(world.graph.edge_pheromones(ab).total_load(), 0.0);
    }

    #[test]
    fn pick_follows_weights() {
        let exits = [
            Exit {
                edge: petgraph_edge(0),
                to: NodeId::new(1),
                weight: 1e-9,
            },
            Exit {
                edge: petgraph_edge(1),
                to: NodeId::new(2),
                weight: 1e9,
            },
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(pick(&exits, &mut rng).unwrap().to, NodeId::new(2));
        }
        assert!(pick(&[], &mut rng).is_none());
    }

    fn petgraph_edge(i: usize) -> formica_runtime::graph::EdgeId {
        formica_runtime::graph::EdgeId::new(i)
    }
}
