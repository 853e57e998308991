//! Formica Agents Prelude: convenient imports for common usage.
//!
//! ```rust
//! use formica_agents::prelude::*;
//! ```

// Re-export agent types
pub use crate::wanderer::{wanderer_factory, Wanderer};

// Re-export from the runtime
pub use formica_runtime::prelude::*;
