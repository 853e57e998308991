//! Formica Runtime Prelude: convenient imports for common usage.
//!
//! ```rust
//! use formica_runtime::prelude::*;
//! ```

// Re-export the engine
pub use crate::ant::{Ant, AntBody, AntFactory, TickScope};
pub use crate::colony::{Colony, ColonyArena};
pub use crate::context::{
    PumpReport, SimulationBuilder, SimulationContext, TickCounters, World, DEFAULT_PUMP_LIMIT,
};
pub use crate::graph::{AntEdge, AntGraph, AntNode, Census, EdgeId, Exit, NodeId};
pub use crate::policy::{PolicyScope, PopulationPolicy, ProportionalPolicy};

// Re-export the topology feed and observers
pub use crate::feed::{FeedClosed, TopologyEvent, TopologySender};
pub use crate::listener::{ListenerId, SimulationListener};
pub use crate::stats::{ColonyInfo, SimStats};

// Re-export from core
pub use formica_core::prelude::*;
