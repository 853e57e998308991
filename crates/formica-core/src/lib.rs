//! # Formica Core
//!
//! Core types for Formica multi-colony ant simulations.
//!
//! This crate holds the pieces every other Formica crate builds on:
//!
//! - **Parameters**: a validated, serde-friendly [`SimParams`](params::SimParams)
//! - **Staged mutation**: the [`Stage`](staged::Stage) contract and its
//!   [`Shadowed`](staged::Shadowed) / [`Roster`](staged::Roster) buffers
//! - **Pheromones**: decaying, mergeable accumulators and the per-element
//!   [`PheromoneStore`](pheromone::PheromoneStore)
//! - **Errors**: [`SimError`](error::SimError) and [`ConfigError`](error::ConfigError)
//!
//! ## Quick Start
//!
//! ```rust
//! use formica_core::prelude::*;
//!
//! let mut store: PheromoneStore = PheromoneStore::new();
//! store.deposit(Pheromone::new(0, 1.0));
//! assert_eq!(store.total_load(), 0.0); // not yet committed
//!
//! store.step(0.9);
//! assert_eq!(store.total_load(), 1.0);
//! ```

pub mod error;
pub mod params;
pub mod pheromone;
pub mod prelude;
pub mod staged;
pub mod types;
