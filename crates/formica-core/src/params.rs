//! Simulation parameters.
//!
//! A flat, validated parameter set read once at `init()` and never mutated
//! by the running simulation. Every field has a documented default; use
//! [`SimParams::validate`] (or let the context do it) to get a single error
//! listing every out-of-range value.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ParamViolation};

/// Where ants drop pheromone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropTarget {
    Nodes,
    Edges,
    NodesAndEdges,
}

impl DropTarget {
    pub fn on_nodes(self) -> bool {
        matches!(self, DropTarget::Nodes | DropTarget::NodesAndEdges)
    }

    pub fn on_edges(self) -> bool {
        matches!(self, DropTarget::Edges | DropTarget::NodesAndEdges)
    }
}

/// How an ant jumps when it must leave its neighbourhood.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpMode {
    /// The ant never jumps.
    Never,
    /// The ant jumps to a random node.
    Random,
    /// The ant flees this many hops ignoring pheromone and weights.
    Flee(u32),
}

/// Parameters of a colony simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Pheromone persistence factor in [0, 1]. Evaporation is `1 - rho`
    /// (default: 0.86).
    pub rho: f64,
    /// Exponent applied to pheromone as perceived by ants (default: 1.0).
    pub alpha: f64,
    /// Exponent applied to edge weights as perceived by ants (default: 3.0).
    pub beta: f64,
    /// Jump behaviour: 0 never, 1 random node, n > 1 flee n hops (default: 1).
    pub jump: u32,
    /// Population at or above which a node counts as over-populated
    /// (default: 16).
    pub over_populated: usize,
    /// Minimal share of own-colony pheromone in [0, 1] below which an ant
    /// becomes agoraphobic (default: 0.2).
    pub agoraphobia: f64,
    /// Ants created when a node appears, removed when it disappears
    /// (default: 8).
    pub ants_per_vertex: usize,
    /// Ants per colony created on each new node; 0 splits `ants_per_vertex`
    /// between colonies instead (default: 8).
    pub ants_per_vertex_per_colony: usize,
    /// Which graph elements carry pheromone (default: edges).
    pub drop_target: DropTarget,
    /// Seed of the simulation's random generator (default: 0x5EED).
    pub random_seed: u64,
    /// Quantity of pheromone an ant drops per traversal (default: 0.1).
    pub pheromone_drop: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            rho: 0.86,
            alpha: 1.0,
            beta: 3.0,
            jump: 1,
            over_populated: 16,
            agoraphobia: 0.2,
            ants_per_vertex: 8,
            ants_per_vertex_per_colony: 8,
            drop_target: DropTarget::Edges,
            random_seed: 0x5EED,
            pheromone_drop: 0.1,
        }
    }
}

impl SimParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with the decay rate and both exponents drawn from `seed`:
    /// `rho` in (0.75, 1], `alpha` and `beta` in [0, 5). The seed also
    /// becomes the simulation's seed.
    pub fn randomized(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Self {
            rho: 1.0 - rng.gen::<f64>() * 0.25,
            alpha: rng.gen_range(0.0..5.0),
            beta: rng.gen_range(0.0..5.0),
            random_seed: seed,
            ..Self::default()
        }
    }

    pub fn with_rho(mut self, rho: f64) -> Self {
        self.rho = rho;
        self
    }

    pub fn with_exponents(mut self, alpha: f64, beta: f64) -> Self {
        self.alpha = alpha;
        self.beta = beta;
        self
    }

    pub fn with_ants_per_vertex(mut self, ants_per_vertex: usize) -> Self {
        self.ants_per_vertex = ants_per_vertex;
        self
    }

    pub fn with_ants_per_vertex_per_colony(mut self, per_colony: usize) -> Self {
        self.ants_per_vertex_per_colony = per_colony;
        self
    }

    pub fn with_over_populated(mut self, threshold: usize) -> Self {
        self.over_populated = threshold;
        self
    }

    pub fn with_drop_target(mut self, target: DropTarget) -> Self {
        self.drop_target = target;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_jump(mut self, jump: u32) -> Self {
        self.jump = jump;
        self
    }

    pub fn jump_mode(&self) -> JumpMode {
        match self.jump {
            0 => JumpMode::Never,
            1 => JumpMode::Random,
            n => JumpMode::Flee(n),
        }
    }

    /// Check every constraint, collecting all violations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut violations = Vec::new();

        unit_interval("rho", self.rho, &mut violations);
        unit_interval("agoraphobia", self.agoraphobia, &mut violations);
        non_negative("alpha", self.alpha, &mut violations);
        non_negative("beta", self.beta, &mut violations);

        if !(self.pheromone_drop.is_finite() && self.pheromone_drop > 0.0) {
            violations.push(ParamViolation::new(
                "pheromone_drop",
                self.pheromone_drop,
                "finite and > 0",
            ));
        }

        if self.over_populated < self.ants_per_vertex {
            violations.push(ParamViolation::new(
                "over_populated",
                self.over_populated,
                ">= ants_per_vertex",
            ));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { violations })
        }
    }
}

fn unit_interval(field: &'static str, value: f64, out: &mut Vec<ParamViolation>) {
    if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
        out.push(ParamViolation::new(field, value, "in [0, 1]"));
    }
}

fn non_negative(field: &'static str, value: f64, out: &mut Vec<ParamViolation>) {
    if !(value.is_finite() && value >= 0.0) {
        out.push(ParamViolation::new(field, value, "finite and >= 0"));
    }
}
