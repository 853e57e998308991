//! Colonies and the arena that holds them.
//!
//! A colony is a named, indexed population of ants built by one factory.
//! Membership changes are staged: `add_ant` and `remove_ants` only record
//! intent, and the ants enter or leave the world when the colony commits at
//! the start of the next tick.

use std::fmt;
use std::sync::Arc;

use formica_core::error::Result;
use formica_core::pheromone::Mergeable;
use formica_core::staged::{Roster, Stage};
use formica_core::types::{AntId, ColonyIndex};
use tracing::debug;

use crate::ant::{Ant, AntFactory, TickScope};
use crate::graph::{AntGraph, NodeId};
use crate::stats::ColonyInfo;

/// A named population of ants.
pub struct Colony<D = ()> {
    name: String,
    index: ColonyIndex,
    factory: Arc<dyn AntFactory<D>>,
    roster: Roster<AntId, Box<dyn Ant<D>>>,
    next_seq: u64,
}

impl<D: Mergeable> Colony<D> {
    pub fn new(name: impl Into<String>, index: ColonyIndex, factory: Arc<dyn AntFactory<D>>) -> Self {
        Self {
            name: name.into(),
            index,
            factory,
            roster: Roster::new(),
            next_seq: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> ColonyIndex {
        self.index
    }

    /// The marker this colony's ants deposit.
    pub fn marker(&self) -> usize {
        self.index
    }

    pub fn factory(&self) -> &Arc<dyn AntFactory<D>> {
        &self.factory
    }

    /// Live members, as of the last commit.
    pub fn ant_count(&self) -> usize {
        self.roster.len()
    }

    pub fn pending_additions(&self) -> usize {
        self.roster.pending_additions()
    }

    pub fn pending_removals(&self) -> usize {
        self.roster.pending_removals()
    }

    pub fn needs_commit(&self) -> bool {
        self.roster.needs_commit()
    }

    /// Live members in ascending id order.
    pub fn ants(&self) -> impl Iterator<Item = &dyn Ant<D>> {
        self.roster.iter().map(|(_, ant)| ant.as_ref())
    }

    pub fn ant(&self, id: &AntId) -> Option<&dyn Ant<D>> {
        self.roster.get(id).map(|ant| ant.as_ref())
    }

    pub fn info(&self) -> ColonyInfo {
        ColonyInfo {
            name: self.name.clone(),
            index: self.index,
            ant_count: self.ant_count(),
        }
    }

    /// Stage a new ant starting on `start`.
    ///
    /// Without an id one is synthesized from the colony name and a sequence
    /// counter. An id currently staged for removal has the removal cancelled
    /// and keeps its existing ant. Returns the id used.
    pub fn add_ant(&mut self, id: Option<AntId>, start: Option<NodeId>) -> AntId {
        let id = match id {
            Some(id) => id,
            None => {
                let id = AntId::synthesize(&self.name, self.next_seq);
                self.next_seq += 1;
                id
            }
        };

        let factory = &self.factory;
        let index = self.index;
        self.roster
            .stage_add(id.clone(), |id| factory.new_ant(id.clone(), index, start));
        id
    }

    /// Stage up to `n` live members for removal. Returns how many were
    /// staged, which is fewer than `n` when the colony runs out.
    pub fn remove_ants(&mut self, n: usize) -> usize {
        self.roster.stage_removals(n)
    }

    /// Apply staged membership changes.
    ///
    /// Retired ants leave their node and admitted ants enter their start
    /// node, both through the staged census. Fails without touching anything
    /// when the staged changes are inconsistent with the members.
    pub fn commit(&mut self, graph: &mut AntGraph<D>) -> Result<()> {
        if !self.roster.needs_commit() {
            return Ok(());
        }

        let outcome = self.roster.commit()?;
        let (retired, admitted) = (outcome.retired.len(), outcome.admitted.len());

        for (_, mut ant) in outcome.retired {
            ant.body_mut().go_to(None, graph);
        }

        for id in &outcome.admitted {
            if let Some(ant) = self.roster.get_mut(id) {
                let start = ant.body().start();
                ant.body_mut().go_to(start, graph);
            }
        }

        if retired + admitted > 0 {
            debug!(
                colony = %self.name,
                retired,
                admitted,
                members = self.roster.len(),
                "Colony committed"
            );
        }
        Ok(())
    }

    /// Run every live member once, in ascending id order.
    pub fn step(&mut self, scope: &mut TickScope<'_, D>) -> Result<()> {
        for ant in self.roster.values_mut() {
            ant.step(scope)?;
        }
        Ok(())
    }

    /// Tear the colony down: every live ant leaves its node and anything
    /// staged is discarded.
    pub fn removed(&mut self, graph: &mut AntGraph<D>) {
        for (_, mut ant) in self.roster.drain() {
            ant.body_mut().go_to(None, graph);
        }
    }

    /// Drop references to a node about to leave the graph, from live and
    /// pending ants alike.
    pub fn evict(&mut self, node: NodeId) {
        for ant in self.roster.values_mut() {
            ant.body_mut().forget(node);
        }
        for ant in self.roster.pending_values_mut() {
            ant.body_mut().forget(node);
        }
    }
}

impl<D> fmt::Debug for Colony<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Colony")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("next_seq", &self.next_seq)
            .finish_non_exhaustive()
    }
}

/// Slot-indexed colony storage.
///
/// Removing a colony leaves a tombstone so the indices of the others never
/// change. A new colony takes the first free slot, scanning from index 0.
pub struct ColonyArena<D = ()> {
    slots: Vec<Option<Colony<D>>>,
}

impl<D> Default for ColonyArena<D> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<D: Mergeable> ColonyArena<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next inserted colony will get.
    pub fn next_index(&self) -> ColonyIndex {
        self.slots
            .iter()
            .position(Option::is_none)
            .unwrap_or(self.slots.len())
    }

    /// Insert a colony built for the next free index.
    pub fn insert_with(&mut self, make: impl FnOnce(ColonyIndex) -> Colony<D>) -> ColonyIndex {
        let index = self.next_index();
        let colony = make(index);
        if index == self.slots.len() {
            self.slots.push(Some(colony));
        } else {
            self.slots[index] = Some(colony);
        }
        index
    }

    /// Take a colony out, leaving a tombstone.
    pub fn remove(&mut self, index: ColonyIndex) -> Option<Colony<D>> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    pub fn get(&self, index: ColonyIndex) -> Option<&Colony<D>> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: ColonyIndex) -> Option<&mut Colony<D>> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    pub fn find(&self, name: &str) -> Option<ColonyIndex> {
        self.iter().find(|c| c.name() == name).map(Colony::index)
    }

    /// Number of slots, tombstones included.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.live_count() == 0
    }

    /// Live colonies in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Colony<D>> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Colony<D>> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    /// Sum of the live members of every colony.
    pub fn ant_count(&self) -> usize {
        self.iter().map(Colony::ant_count).sum()
    }

    /// Empty the arena, handing back every live colony.
    pub fn take_all(&mut self) -> Vec<Colony<D>> {
        std::mem::take(&mut self.slots).into_iter().flatten().collect()
    }
}

impl<D> fmt::Debug for ColonyArena<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.slots.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::idle_factory;
    use formica_core::error::SimError;
    use formica_core::params::DropTarget;

    fn setup() -> (Colony, AntGraph, NodeId) {
        let mut graph = AntGraph::new(DropTarget::Edges);
        let node = graph.add_node("n").unwrap();
        (Colony::new("red", 0, idle_factory()), graph, node)
    }

    #[test]
    fn additions_wait_for_commit() {
        let (mut colony, mut graph, node) = setup();
        let first = colony.add_ant(None, Some(node));
        let second = colony.add_ant(None, Some(node));
        assert_eq!(first.as_str(), "red_00000");
        assert_eq!(second.as_str(), "red_00001");
        assert_eq!(colony.ant_count(), 0);
        assert_eq!(colony.pending_additions(), 2);

        colony.commit(&mut graph).unwrap();
        assert_eq!(colony.ant_count(), 2);
        assert_eq!(colony.ants().next().unwrap().location(), Some(node));

        // Placement is staged on the node too.
        assert_eq!(graph.node(node).unwrap().total_ant_count(), 0);
        graph.step_nodes(1.0);
        assert_eq!(graph.node(node).unwrap().ant_count_for_colony(0), 2);
    }

    #[test]
    fn second_commit_changes_nothing() {
        let (mut colony, mut graph, node) = setup();
        colony.add_ant(None, Some(node));
        colony.commit(&mut graph).unwrap();
        assert!(!colony.needs_commit());
        colony.commit(&mut graph).unwrap();
        assert_eq!(colony.ant_count(), 1);
        graph.step_nodes(1.0);
        assert_eq!(graph.node(node).unwrap().total_ant_count(), 1);
    }

    #[test]
    fn removal_detaches_from_node() {
        let (mut colony, mut graph, node) = setup();
        for _ in 0..3 {
            colony.add_ant(None, Some(node));
        }
        colony.commit(&mut graph).unwrap();
        graph.step_nodes(1.0);

        assert_eq!(colony.remove_ants(2), 2);
        assert_eq!(colony.remove_ants(5), 1);
        colony.commit(&mut graph).unwrap();
        graph.step_nodes(1.0);

        assert_eq!(colony.ant_count(), 0);
        assert_eq!(graph.node(node).unwrap().total_ant_count(), 0);
    }

    #[test]
    fn explicit_id_cancels_pending_removal() {
        let (mut colony, mut graph, node) = setup();
        let id = colony.add_ant(Some(AntId::new("keeper")), Some(node));
        colony.commit(&mut graph).unwrap();

        colony.remove_ants(1);
        colony.add_ant(Some(id.clone()), Some(node));
        colony.commit(&mut graph).unwrap();

        assert_eq!(colony.ant_count(), 1);
        assert!(colony.ant(&id).is_some());
    }

    #[test]
    fn duplicate_addition_is_a_defect() {
        let (mut colony, mut graph, node) = setup();
        colony.add_ant(Some(AntId::new("x")), Some(node));
        colony.commit(&mut graph).unwrap();

        colony.add_ant(Some(AntId::new("x")), Some(node));
        let err = colony.commit(&mut graph).unwrap_err();
        assert_eq!(err, SimError::DuplicateMember("x".into()));
        assert!(err.is_consistency_defect());
    }

    #[test]
    fn teardown_empties_node() {
        let (mut colony, mut graph, node) = setup();
        colony.add_ant(None, Some(node));
        colony.add_ant(None, Some(node));
        colony.commit(&mut graph).unwrap();
        graph.step_nodes(1.0);

        colony.removed(&mut graph);
        graph.step_nodes(1.0);
        assert_eq!(colony.ant_count(), 0);
        assert_eq!(graph.node(node).unwrap().total_ant_count(), 0);
    }

    #[test]
    fn evicted_start_leaves_ant_unplaced() {
        let (mut colony, mut graph, node) = setup();
        colony.add_ant(None, Some(node));
        colony.evict(node);
        graph.remove_node(node);

        colony.commit(&mut graph).unwrap();
        assert_eq!(colony.ant_count(), 1);
        assert_eq!(colony.ants().next().unwrap().location(), None);
    }

    #[test]
    fn arena_reuses_first_free_slot() {
        let mut arena: ColonyArena = ColonyArena::new();
        for name in ["a", "b", "c"] {
            arena.insert_with(|i| Colony::new(name, i, idle_factory()));
        }
        arena.remove(0);
        arena.remove(1);
        assert_eq!(arena.slot_count(), 3);
        assert_eq!(arena.live_count(), 1);
        assert!(arena.get(1).is_none());

        let index = arena.insert_with(|i| Colony::new("d", i, idle_factory()));
        assert_eq!(index, 0);
        assert_eq!(arena.get(0).unwrap().index(), 0);
        assert_eq!(arena.find("c"), Some(2));
        assert_eq!(arena.find("b"), None);

        let index = arena.insert_with(|i| Colony::new("e", i, idle_factory()));
        assert_eq!(index, 1);
        let index = arena.insert_with(|i| Colony::new("f", i, idle_factory()));
        assert_eq!(index, 3);
    }
}
