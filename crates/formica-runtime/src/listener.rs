//! Observers notified after each tick.
//!
//! Listeners run outside the exclusive section, in registration order, so
//! they may call back into the context (inspect it, add colonies) without
//! deadlocking.

use formica_core::pheromone::Mergeable;

use crate::context::SimulationContext;
use crate::stats::ColonyInfo;

/// Handle returned by `add_listener`, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Observer of a simulation. Every callback defaults to doing nothing.
pub trait SimulationListener<D: Mergeable = ()>: Send + Sync {
    fn colony_added(&self, _colony: &ColonyInfo) {}

    fn colony_removed(&self, _colony: &ColonyInfo) {}

    /// A tick completed and its section has been released.
    fn step(&self, _context: &SimulationContext<D>) {}
}
