//! Pheromones: decaying, mergeable markers left on nodes and edges.
//!
//! An ant marks the element it traverses with an accumulator carrying its
//! colony's marker. Deposits queue up in the element's [`PheromoneStore`]
//! and are fused into the committed accumulators at the end of the tick,
//! after the pheromone already present has evaporated.

use std::collections::{BTreeMap, VecDeque};

use crate::error::{Result, SimError};
use crate::staged::Stage;
use crate::types::Marker;

/// Payload carried by a pheromone alongside its load.
///
/// `merge` is called when two accumulators of the same marker fuse and both
/// carry a payload. The default keeps the payload already committed.
pub trait Mergeable: Clone + Send + Sync + 'static {
    fn merge(&mut self, _incoming: &Self) {}
}

macro_rules! keep_own_payload {
    ($($ty:ty),* $(,)?) => {
        $(impl Mergeable for $ty {})*
    };
}

keep_own_payload!((), u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64, String);

/// A single marker's decaying load, with an optional payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Pheromone<D = ()> {
    marker: Marker,
    load: f64,
    data: Option<D>,
}

impl<D: Mergeable> Pheromone<D> {
    pub fn new(marker: Marker, load: f64) -> Self {
        Self {
            marker,
            load,
            data: None,
        }
    }

    /// The "no pheromone here" value: zero load and no payload.
    ///
    /// Its marker is always 0 and means nothing. Check
    /// [`is_vacant`](Self::is_vacant) before reading it.
    pub fn empty() -> Self {
        Self::new(0, 0.0)
    }

    pub fn with_data(mut self, data: D) -> Self {
        self.data = Some(data);
        self
    }

    pub fn marker(&self) -> Marker {
        self.marker
    }

    pub fn load(&self) -> f64 {
        self.load
    }

    pub fn data(&self) -> Option<&D> {
        self.data.as_ref()
    }

    /// Zero load and no payload.
    pub fn is_vacant(&self) -> bool {
        self.load == 0.0 && self.data.is_none()
    }

    /// Fold `other` into this accumulator.
    ///
    /// Both accumulators are left unchanged when the markers differ.
    pub fn fuse(&mut self, other: &Pheromone<D>) -> Result<()> {
        if other.marker != self.marker {
            return Err(SimError::MarkerMismatch {
                expected: self.marker,
                found: other.marker,
            });
        }
        self.absorb(other);
        Ok(())
    }

    /// Multiply the load by the persistence factor `rho`.
    pub fn evaporate(&mut self, rho: f64) {
        self.load *= rho;
    }

    fn absorb(&mut self, other: &Pheromone<D>) {
        if let (Some(mine), Some(theirs)) = (self.data.as_mut(), other.data.as_ref()) {
            mine.merge(theirs);
        }
        self.load += other.load;
    }
}

/// Committed accumulators of one graph element, keyed by marker, plus the
/// queue of deposits awaiting fusion.
///
/// An inert store (see [`PheromoneStore::inert`]) stands for an element that
/// carries no pheromone at all: every lookup returns the empty accumulator
/// and every mutation is ignored.
#[derive(Debug, Clone)]
pub struct PheromoneStore<D = ()> {
    committed: BTreeMap<Marker, Pheromone<D>>,
    pending: VecDeque<Pheromone<D>>,
    vacant: Pheromone<D>,
    inert: bool,
}

impl<D: Mergeable> Default for PheromoneStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Mergeable> PheromoneStore<D> {
    pub fn new() -> Self {
        Self {
            committed: BTreeMap::new(),
            pending: VecDeque::new(),
            vacant: Pheromone::empty(),
            inert: false,
        }
    }

    /// A store that never holds anything.
    pub fn inert() -> Self {
        Self {
            inert: true,
            ..Self::new()
        }
    }

    pub fn is_inert(&self) -> bool {
        self.inert
    }

    /// Queue a deposit. Lookups do not see it until the next commit.
    pub fn deposit(&mut self, pheromone: Pheromone<D>) {
        if !self.inert {
            self.pending.push_back(pheromone);
        }
    }

    /// Evaporate what is committed, then fold in this tick's deposits.
    ///
    /// Deposits made during the tick that just ended are never evaporated
    /// by that same tick.
    pub fn step(&mut self, rho: f64) {
        if self.inert {
            return;
        }
        for pheromone in self.committed.values_mut() {
            pheromone.evaporate(rho);
        }
        self.commit();
    }

    /// The committed accumulator for `marker`, or the shared empty
    /// accumulator, whose marker is 0 whatever `marker` was asked for.
    pub fn get(&self, marker: Marker) -> &Pheromone<D> {
        self.committed.get(&marker).unwrap_or(&self.vacant)
    }

    pub fn load(&self, marker: Marker) -> f64 {
        self.get(marker).load()
    }

    /// Sum of the committed loads across all markers.
    pub fn total_load(&self) -> f64 {
        self.committed.values().map(Pheromone::load).sum()
    }

    /// The marker with the largest committed load, lowest marker on ties.
    pub fn strongest_marker(&self) -> Option<Marker> {
        let mut best: Option<&Pheromone<D>> = None;
        for pheromone in self.committed.values() {
            if best.map_or(true, |b| pheromone.load > b.load) {
                best = Some(pheromone);
            }
        }
        best.filter(|p| p.load > 0.0).map(Pheromone::marker)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of committed markers.
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    /// Committed accumulators in ascending marker order.
    pub fn iter(&self) -> impl Iterator<Item = &Pheromone<D>> {
        self.committed.values()
    }

    /// Drop every accumulator, committed or pending.
    pub fn clear(&mut self) {
        self.committed.clear();
        self.pending.clear();
    }
}

impl<D: Mergeable + PartialOrd> PheromoneStore<D> {
    /// Smallest payload across committed accumulators, scanning markers in
    /// ascending order. The first payload seen wins ties.
    pub fn minimum_data(&self) -> Option<&D> {
        let mut min: Option<&D> = None;
        for data in self.committed.values().filter_map(Pheromone::data) {
            if min.map_or(true, |m| data < m) {
                min = Some(data);
            }
        }
        min
    }
}

impl<D: Mergeable> Stage for PheromoneStore<D> {
    type Outcome = ();

    fn needs_commit(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drain pending deposits in FIFO order, fusing each into the committed
    /// accumulator of its marker or inserting it as a new one.
    fn commit(&mut self) {
        while let Some(pheromone) = self.pending.pop_front() {
            match self.committed.get_mut(&pheromone.marker) {
                Some(existing) => existing.absorb(&pheromone),
                None => {
                    self.committed.insert(pheromone.marker, pheromone);
                }
            }
        }
    }
}
