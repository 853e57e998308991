//! Formica Core Prelude: convenient imports for common usage.
//!
//! ```rust
//! use formica_core::prelude::*;
//! ```

pub use crate::types::{AntId, ColonyIndex, Marker, Tick};

pub use crate::params::{DropTarget, JumpMode, SimParams};

pub use crate::pheromone::{Mergeable, Pheromone, PheromoneStore};

pub use crate::staged::{Roster, RosterCommit, Shadowed, Stage};

pub use crate::error::{ConfigError, ParamViolation, Result, SimError};
