//! # Formica Runtime
//!
//! The simulation engine: internal graph, colonies, population policy and
//! the tick loop.
//!
//! A [`SimulationContext`](context::SimulationContext) owns the world. Its
//! topology arrives through a thread-safe feed, its colonies are rebalanced
//! by a [`PopulationPolicy`](policy::PopulationPolicy) as nodes and colonies
//! come and go, and each tick runs every ant once under a single exclusive
//! section before listeners are told about it.

pub mod ant;
pub mod colony;
pub mod context;
pub mod feed;
pub mod graph;
pub mod listener;
pub mod policy;
pub mod prelude;
pub mod stats;

#[cfg(test)]
mod testing;
