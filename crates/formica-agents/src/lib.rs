//! # Formica Agents
//!
//! Reference ant implementations for Formica simulations.
//!
//! - **Wanderer**: walks by edge weight, marks what it crosses, jumps when
//!   crowded or stuck

pub mod prelude;
pub mod wanderer;
