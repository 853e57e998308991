//! Simulation context: the world, its exclusive section and the tick loop.
//!
//! Each tick, under one lock:
//! 1. Every colony commits the membership changes staged since last tick
//! 2. Every colony runs its ants once
//! 3. Every edge evaporates and commits its pheromone
//! 4. Every node evaporates and commits its pheromone, then its census
//! 5. The population policy recounts the ants
//!
//! The lock is then released and listeners are notified in registration
//! order. Topology events are applied by [`SimulationContext::pump`], which
//! only ever runs between ticks.
//!
//! # Example
//!
//! ```rust,ignore
//! use formica_runtime::prelude::*;
//!
//! let sim = SimulationBuilder::new(wanderer_factory())
//!     .params(SimParams::default().with_seed(7))
//!     .build()?;
//!
//! let feed = sim.topology_sender();
//! feed.node_added("a")?;
//! feed.node_added("b")?;
//! feed.edge_added("ab", "a", "b", false)?;
//!
//! sim.add_colony("red")?;
//! sim.run(100)?;
//! println!("{:?}", sim.stats()?);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use formica_core::error::{Result, SimError};
use formica_core::params::SimParams;
use formica_core::pheromone::Mergeable;
use formica_core::types::{ColonyIndex, Tick};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::ant::{AntFactory, TickScope};
use crate::colony::{Colony, ColonyArena};
use crate::feed::{TopologyEvent, TopologyFeed, TopologySender};
use crate::graph::{AntGraph, NodeId};
use crate::listener::{ListenerId, SimulationListener};
use crate::policy::{PolicyScope, PopulationPolicy, ProportionalPolicy};
use crate::stats::{ColonyInfo, SimStats};

/// Default number of topology events applied per pump.
pub const DEFAULT_PUMP_LIMIT: usize = 10_000;

/// Bookkeeping counters, reset by `init`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickCounters {
    /// Ticks completed since the last `init`.
    pub tick: Tick,
    pub jumps: u64,
    pub over_populated: u64,
    pub migrations: u64,
    /// Jumps per colony index. Grown on demand, never shrunk.
    pub jumps_per_colony: Vec<u64>,
}

impl TickCounters {
    pub fn jumps_for_colony(&self, colony: ColonyIndex) -> u64 {
        self.jumps_per_colony.get(colony).copied().unwrap_or(0)
    }

    pub(crate) fn record_jump(&mut self, colony: ColonyIndex) {
        self.jumps += 1;
        if colony >= self.jumps_per_colony.len() {
            self.jumps_per_colony.resize(colony + 1, 0);
        }
        self.jumps_per_colony[colony] += 1;
    }
}

/// Outcome of draining the topology feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpReport {
    pub applied: usize,
    /// Events naming a duplicate or unknown node or edge.
    pub skipped: usize,
}

impl PumpReport {
    pub fn merge(self, other: PumpReport) -> PumpReport {
        PumpReport {
            applied: self.applied + other.applied,
            skipped: self.skipped + other.skipped,
        }
    }
}

/// Everything guarded by the exclusive section.
pub struct World<D = ()> {
    graph: AntGraph<D>,
    colonies: ColonyArena<D>,
    policy: Box<dyn PopulationPolicy<D>>,
    params: SimParams,
    rng: ChaCha8Rng,
    counters: TickCounters,
    factory: Arc<dyn AntFactory<D>>,
    /// Set when a tick fails part way, cleared by `init`.
    failed: Option<SimError>,
}

impl<D: Mergeable> World<D> {
    fn new(
        params: SimParams,
        policy: Box<dyn PopulationPolicy<D>>,
        factory: Arc<dyn AntFactory<D>>,
    ) -> Self {
        Self {
            graph: AntGraph::new(params.drop_target),
            colonies: ColonyArena::new(),
            policy,
            rng: ChaCha8Rng::seed_from_u64(params.random_seed),
            params,
            counters: TickCounters::default(),
            factory,
            failed: None,
        }
    }

    pub fn graph(&self) -> &AntGraph<D> {
        &self.graph
    }

    pub fn colonies(&self) -> &ColonyArena<D> {
        &self.colonies
    }

    pub fn policy(&self) -> &dyn PopulationPolicy<D> {
        self.policy.as_ref()
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn counters(&self) -> &TickCounters {
        &self.counters
    }

    /// The failure that halted the run, if any.
    pub fn failure(&self) -> Option<&SimError> {
        self.failed.as_ref()
    }

    fn ensure_running(&self) -> Result<()> {
        match &self.failed {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }

    pub fn colony(&self, name: &str) -> Option<&Colony<D>> {
        self.colonies.find(name).and_then(|i| self.colonies.get(i))
    }

    pub fn stats(&self) -> SimStats {
        let (node_load, edge_load) = self.graph.total_loads();
        SimStats {
            tick: self.counters.tick,
            ant_count: self.policy.ant_count(),
            colonies: self.colonies.iter().map(Colony::info).collect(),
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            counters: self.counters.clone(),
            node_load,
            edge_load,
        }
    }

    /// Back to a fresh simulation over the same topology.
    fn reset(&mut self, params: SimParams) {
        for mut colony in self.colonies.take_all() {
            colony.removed(&mut self.graph);
        }
        self.graph.reset_all(params.drop_target);
        self.policy.reset();
        self.rng = ChaCha8Rng::seed_from_u64(params.random_seed);
        self.counters = TickCounters::default();
        self.failed = None;
        self.params = params;
    }

    /// Run one tick. A failure part way leaves the world half-ticked, so it
    /// halts the run: this and every later operation report it until `init`.
    fn tick(&mut self) -> Result<()> {
        self.ensure_running()?;
        if let Err(cause) = self.run_tick() {
            let tick = self.counters.tick;
            warn!(tick, error = %cause, "Tick failed, run halted");
            let failure = SimError::RunFailed {
                tick,
                cause: Box::new(cause),
            };
            self.failed = Some(failure.clone());
            return Err(failure);
        }
        Ok(())
    }

    fn run_tick(&mut self) -> Result<()> {
        for colony in self.colonies.iter_mut() {
            colony.commit(&mut self.graph)?;
        }

        {
            let mut scope = TickScope::new(
                &mut self.graph,
                &self.params,
                &mut self.rng,
                &mut self.counters,
            );
            for colony in self.colonies.iter_mut() {
                colony.step(&mut scope)?;
            }
        }

        let rho = self.params.rho;
        self.graph.step_edges(rho);
        self.graph.step_nodes(rho);
        self.policy.step(&self.colonies);

        self.counters.tick += 1;
        Ok(())
    }

    fn add_colony(&mut self, name: &str, factory: Arc<dyn AntFactory<D>>) -> Result<ColonyInfo> {
        self.ensure_running()?;
        if self.colonies.find(name).is_some() {
            return Err(SimError::DuplicateColony(name.to_string()));
        }

        let index = self
            .colonies
            .insert_with(|index| Colony::new(name, index, factory));

        let mut scope = PolicyScope {
            colonies: &mut self.colonies,
            graph: &self.graph,
            params: &self.params,
        };
        self.policy.colony_added(&mut scope, index);

        debug!(colony = name, index, "Colony added");
        self.colonies
            .get(index)
            .map(Colony::info)
            .ok_or_else(|| SimError::UnknownColony(name.to_string()))
    }

    fn remove_colony(&mut self, name: &str) -> Result<ColonyInfo> {
        self.ensure_running()?;
        let mut colony = self
            .colonies
            .find(name)
            .and_then(|index| self.colonies.remove(index))
            .ok_or_else(|| SimError::UnknownColony(name.to_string()))?;

        self.policy.colony_removed(&colony);
        let info = colony.info();
        colony.removed(&mut self.graph);

        debug!(colony = name, index = info.index, "Colony removed");
        Ok(info)
    }

    fn apply(&mut self, event: TopologyEvent) -> Result<()> {
        match event {
            TopologyEvent::NodeAdded { key } => {
                let node = self.graph.add_node(&key)?;
                let mut scope = PolicyScope {
                    colonies: &mut self.colonies,
                    graph: &self.graph,
                    params: &self.params,
                };
                self.policy.node_added(&mut scope, node);
                debug!(node = %key, "Node added");
            }
            TopologyEvent::NodeRemoved { key } => {
                let node = self
                    .graph
                    .node_id(&key)
                    .ok_or_else(|| SimError::UnknownNode(key.clone()))?;
                self.remove_node(node);
                debug!(node = %key, "Node removed");
            }
            TopologyEvent::EdgeAdded {
                key,
                from,
                to,
                directed,
            } => {
                self.graph.add_edge(&key, &from, &to, directed)?;
                debug!(edge = %key, %from, %to, directed, "Edge added");
            }
            TopologyEvent::EdgeRemoved { key } => {
                let edge = self
                    .graph
                    .edge_id(&key)
                    .ok_or_else(|| SimError::UnknownEdge(key.clone()))?;
                self.graph.remove_edge(edge);
                debug!(edge = %key, "Edge removed");
            }
            TopologyEvent::EdgeWeightChanged { key, weight } => {
                let edge = self
                    .graph
                    .edge_id(&key)
                    .ok_or_else(|| SimError::UnknownEdge(key.clone()))?;
                self.graph.set_edge_weight(edge, weight);
            }
            TopologyEvent::GraphCleared => {
                let nodes = self.graph.node_ids();
                let count = nodes.len();
                for node in nodes {
                    self.remove_node(node);
                }
                self.graph.clear();
                debug!(nodes = count, "Graph cleared");
            }
        }
        Ok(())
    }

    /// Policy first, while the node still exists, then the colonies drop
    /// their references, then the graph lets go of it.
    fn remove_node(&mut self, node: NodeId) {
        let mut scope = PolicyScope {
            colonies: &mut self.colonies,
            graph: &self.graph,
            params: &self.params,
        };
        self.policy.node_removed(&mut scope, node);

        for colony in self.colonies.iter_mut() {
            colony.evict(node);
        }
        self.graph.remove_node(node);
    }
}

type Listeners<D> = Vec<(ListenerId, Arc<dyn SimulationListener<D>>)>;

/// A running multi-colony simulation.
pub struct SimulationContext<D = ()> {
    world: Mutex<World<D>>,
    listeners: Mutex<Listeners<D>>,
    next_listener: AtomicU64,
    feed: TopologyFeed,
    pump_limit: usize,
}

impl<D: Mergeable> SimulationContext<D> {
    /// A simulation with the proportional policy. Fails on invalid params.
    pub fn new(params: SimParams, factory: Arc<dyn AntFactory<D>>) -> Result<Self> {
        SimulationBuilder::new(factory).params(params).build()
    }

    fn world(&self) -> Result<MutexGuard<'_, World<D>>> {
        self.world.lock().map_err(|_| SimError::SectionPoisoned)
    }

    fn listeners(&self) -> Result<Listeners<D>> {
        self.listeners
            .lock()
            .map(|l| l.clone())
            .map_err(|_| SimError::SectionPoisoned)
    }

    /// Reset ticking state with new parameters.
    ///
    /// Parameters are validated before anything is touched. Colonies are
    /// dropped, every node and edge loses its ants and pheromone, the random
    /// generator is reseeded and the counters start over. The topology
    /// survives.
    pub fn init(&self, params: SimParams) -> Result<()> {
        params.validate()?;
        self.world()?.reset(params);
        debug!("Simulation initialised");
        Ok(())
    }

    /// Run one tick, then notify listeners.
    ///
    /// A failure inside the tick halts the run: it comes back as
    /// [`SimError::RunFailed`], listeners are not notified, and every later
    /// `step`, `pump` or colony change returns the same error until
    /// [`init`](Self::init).
    pub fn step(&self) -> Result<()> {
        {
            let mut world = self.world()?;
            world.tick()?;
            trace!(
                tick = world.counters.tick,
                ants = world.policy.ant_count(),
                "Tick complete"
            );
        }

        for (_, listener) in self.listeners()? {
            listener.step(self);
        }
        Ok(())
    }

    /// Apply pending topology events, at most the pump limit.
    ///
    /// Events naming a duplicate or unknown element are skipped and counted.
    /// Nothing is drained once the run has failed.
    pub fn pump(&self) -> Result<PumpReport> {
        let mut world = self.world()?;
        world.ensure_running()?;

        let mut report = PumpReport::default();
        for event in self.feed.drain(self.pump_limit)? {
            match world.apply(event.clone()) {
                Ok(()) => report.applied += 1,
                Err(err @ (SimError::DuplicateNode(_)
                | SimError::UnknownNode(_)
                | SimError::DuplicateEdge(_)
                | SimError::UnknownEdge(_))) => {
                    warn!(?event, error = %err, "Skipping topology event");
                    report.skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(report)
    }

    /// Pump, step, pump.
    pub fn tick(&self) -> Result<PumpReport> {
        let before = self.pump()?;
        self.step()?;
        let after = self.pump()?;
        Ok(before.merge(after))
    }

    /// Run `ticks` ticks, stopping at the first error.
    pub fn run(&self, ticks: u64) -> Result<PumpReport> {
        let mut report = PumpReport::default();
        for _ in 0..ticks {
            report = report.merge(self.tick()?);
        }
        Ok(report)
    }

    /// Add a colony built by the default factory.
    pub fn add_colony(&self, name: &str) -> Result<ColonyInfo> {
        let factory = Arc::clone(&self.world()?.factory);
        self.add_colony_with(name, factory)
    }

    pub fn add_colony_with(&self, name: &str, factory: Arc<dyn AntFactory<D>>) -> Result<ColonyInfo> {
        let info = self.world()?.add_colony(name, factory)?;
        for (_, listener) in self.listeners()? {
            listener.colony_added(&info);
        }
        Ok(info)
    }

    /// Remove a colony. Its ants leave the graph immediately.
    pub fn remove_colony(&self, name: &str) -> Result<ColonyInfo> {
        let info = self.world()?.remove_colony(name)?;
        for (_, listener) in self.listeners()? {
            listener.colony_removed(&info);
        }
        Ok(info)
    }

    pub fn add_listener(&self, listener: Arc<dyn SimulationListener<D>>) -> Result<ListenerId> {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .map_err(|_| SimError::SectionPoisoned)?
            .push((id, listener));
        Ok(id)
    }

    pub fn remove_listener(&self, id: ListenerId) -> Result<bool> {
        let mut listeners = self.listeners.lock().map_err(|_| SimError::SectionPoisoned)?;
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        Ok(listeners.len() != before)
    }

    /// A producer handle for the topology feed.
    pub fn topology_sender(&self) -> TopologySender {
        self.feed.sender()
    }

    /// Read the world under the exclusive section.
    pub fn inspect<R>(&self, f: impl FnOnce(&World<D>) -> R) -> Result<R> {
        Ok(f(&*self.world()?))
    }

    pub fn stats(&self) -> Result<SimStats> {
        self.inspect(World::stats)
    }

    pub fn ant_count(&self) -> Result<usize> {
        self.inspect(|w| w.policy.ant_count())
    }

    pub fn current_tick(&self) -> Result<Tick> {
        self.inspect(|w| w.counters.tick)
    }
}

/// Builder for a [`SimulationContext`].
pub struct SimulationBuilder<D = ()> {
    params: SimParams,
    factory: Arc<dyn AntFactory<D>>,
    policy: Option<Box<dyn PopulationPolicy<D>>>,
    listeners: Vec<Arc<dyn SimulationListener<D>>>,
    pump_limit: usize,
}

impl<D: Mergeable> SimulationBuilder<D> {
    /// `factory` builds the ants of colonies added without their own.
    pub fn new(factory: Arc<dyn AntFactory<D>>) -> Self {
        Self {
            params: SimParams::default(),
            factory,
            policy: None,
            listeners: Vec::new(),
            pump_limit: DEFAULT_PUMP_LIMIT,
        }
    }

    pub fn params(mut self, params: SimParams) -> Self {
        self.params = params;
        self
    }

    /// Replace the proportional policy.
    pub fn policy(mut self, policy: Box<dyn PopulationPolicy<D>>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn SimulationListener<D>>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Events applied per pump. Zero is raised to one.
    pub fn pump_limit(mut self, limit: usize) -> Self {
        self.pump_limit = limit.max(1);
        self
    }

    pub fn build(self) -> Result<SimulationContext<D>> {
        self.params.validate()?;

        let policy = self
            .policy
            .unwrap_or_else(|| Box::new(ProportionalPolicy::new()));
        let listeners: Listeners<D> = self
            .listeners
            .into_iter()
            .enumerate()
            .map(|(i, l)| (ListenerId(i as u64), l))
            .collect();

        Ok(SimulationContext {
            world: Mutex::new(World::new(self.params, policy, self.factory)),
            next_listener: AtomicU64::new(listeners.len() as u64),
            listeners: Mutex::new(listeners),
            feed: TopologyFeed::new(),
            pump_limit: self.pump_limit,
        })
    }
}
