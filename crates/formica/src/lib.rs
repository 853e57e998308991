//! # Formica
//!
//! Multi-colony ant simulations over live, externally mutated graphs.
//!
//! Colonies of ants walk a weighted graph, drop decaying pheromone on nodes
//! and edges, and are kept proportionally spread over the graph by a
//! population policy as nodes and colonies come and go. Every write an ant
//! makes during a tick is staged and only becomes visible at the tick
//! boundary.
//!
//! ## Quick Start
//!
//! ```rust
//! use formica::prelude::*;
//!
//! let sim: SimulationContext = SimulationContext::new(SimParams::default(), wanderer_factory())?;
//! sim.add_colony("red")?;
//!
//! let feed = sim.topology_sender();
//! for key in ["a", "b", "c"] {
//!     feed.node_added(key)?;
//! }
//! feed.edge_added("ab", "a", "b", false)?;
//! feed.edge_added("bc", "b", "c", false)?;
//!
//! sim.run(10)?;
//!
//! let stats = sim.stats()?;
//! assert_eq!(stats.node_count, 3);
//! assert_eq!(stats.live_ants(), 24);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! Formica is organized into several crates:
//!
//! - [`formica_core`] - Parameters, errors, staged buffers and pheromones
//! - [`formica_runtime`] - Graph, colonies, population policy, simulation context
//! - [`formica_agents`] - Reference ants
//!
//! ## Key Concepts
//!
//! ### The tick
//!
//! | Phase | What happens |
//! |-------|--------------|
//! | commit colonies | ants added or removed last tick enter or leave the world |
//! | step colonies | every ant acts once, against the pre-tick state |
//! | step edges | edge pheromone evaporates, then this tick's deposits land |
//! | step nodes | same for nodes, then arrivals and departures are counted |
//! | policy step | the global ant count is recomputed |
//!
//! ### Pheromone
//!
//! Persistence `rho` multiplies every committed load each tick. A deposit is
//! never evaporated by the tick it was dropped in.

// Re-export all subcrates
pub use formica_agents as agents;
pub use formica_core as core;
pub use formica_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust
/// use formica::prelude::*;
/// ```
pub mod prelude {
    pub use formica_agents::prelude::*;
}
