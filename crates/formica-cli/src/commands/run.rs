//! Run a simulation over a generated graph.

use std::path::Path;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;
use formica::prelude::*;
use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::config::Config;

/// Command-line values taking precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub ticks: Option<u64>,
    pub nodes: Option<usize>,
    pub degree: Option<usize>,
    pub colonies: Option<Vec<String>>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(ticks) = self.ticks {
            config.run.ticks = ticks;
        }
        if let Some(nodes) = self.nodes {
            config.run.nodes = nodes;
        }
        if let Some(degree) = self.degree {
            config.run.degree = degree;
        }
        if let Some(colonies) = self.colonies {
            config.run.colonies = colonies;
        }
    }
}

pub fn run(config_path: Option<&Path>, overrides: Overrides, json: bool) -> Result<()> {
    let mut config = Config::load(config_path)?;
    overrides.apply(&mut config);

    if config.run.colonies.is_empty() {
        bail!("At least one colony is required");
    }

    let sim: SimulationContext = SimulationContext::new(config.params.clone(), wanderer_factory())
        .context("Invalid simulation parameters")?;

    for name in &config.run.colonies {
        sim.add_colony(name)
            .with_context(|| format!("Failed to add colony {name}"))?;
    }

    let producer = spawn_topology(
        sim.topology_sender(),
        config.run.nodes,
        config.run.degree,
        config.params.random_seed,
    );

    let ticks = config.run.ticks;
    if !json {
        println!(
            "{} Running {} ticks with {} colonies over {} nodes...",
            "→".blue(),
            ticks.to_string().cyan(),
            config.run.colonies.len().to_string().cyan(),
            config.run.nodes.to_string().cyan()
        );
    }

    let pb = if json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(ticks)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ticks")?
            .progress_chars("#>-"),
    );

    let mut skipped = 0;
    for _ in 0..ticks {
        let report = sim.tick()?;
        skipped += report.skipped;
        pb.inc(1);
    }
    pb.finish_and_clear();

    producer
        .join()
        .map_err(|_| anyhow!("Topology producer panicked"))?
        .context("Topology feed closed early")?;
    // Anything the producer sent after the last tick.
    skipped += sim.pump()?.skipped;

    let stats = sim.stats()?;
    info!(tick = stats.tick, ants = stats.ant_count, "Simulation finished");

    if json {
        println!("{}", stats.to_json()?);
    } else {
        print_summary(&stats, skipped);
    }
    Ok(())
}

/// Stream a ring of `nodes` nodes plus `degree` random chords per node from
/// a separate thread.
fn spawn_topology(
    feed: TopologySender,
    nodes: usize,
    degree: usize,
    seed: u64,
) -> JoinHandle<std::result::Result<(), FeedClosed>> {
    thread::spawn(move || {
        let mut rng = ChaCha8Rng::seed_from_u64(seed.rotate_left(17));

        for i in 0..nodes {
            feed.node_added(format!("n{i}"))?;
        }
        if nodes < 2 {
            return Ok(());
        }

        for i in 0..nodes {
            feed.edge_added(format!("r{i}"), format!("n{i}"), format!("n{}", (i + 1) % nodes), false)?;
        }
        for i in 0..nodes {
            for k in 0..degree {
                let j = (i + rng.gen_range(1..nodes)) % nodes;
                let key = format!("c{i}_{k}");
                feed.edge_added(key.clone(), format!("n{i}"), format!("n{j}"), false)?;
                feed.edge_weight_changed(key, rng.gen_range(0.5..2.0))?;
            }
        }
        Ok(())
    })
}

fn print_summary(stats: &SimStats, skipped: usize) {
    println!();
    println!("{} Simulation complete!", "✓".green().bold());
    println!("{}", "═".repeat(40).dimmed());
    println!("  Ticks:          {}", stats.tick.to_string().cyan());
    println!(
        "  Graph:          {} nodes, {} edges",
        stats.node_count.to_string().cyan(),
        stats.edge_count.to_string().cyan()
    );
    println!("  Ants:           {}", stats.ant_count.to_string().cyan());
    println!();

    println!("{}", "Colonies".blue().bold());
    for colony in &stats.colonies {
        println!(
            "  [{}] {:<12} {} ants, {} jumps",
            colony.index,
            colony.name,
            colony.ant_count.to_string().green(),
            stats.counters.jumps_for_colony(colony.index).to_string().yellow()
        );
    }
    println!();

    println!("{}", "Activity".blue().bold());
    println!("  Jumps:          {}", stats.counters.jumps.to_string().yellow());
    println!(
        "  Over-populated: {}",
        stats.counters.over_populated.to_string().yellow()
    );
    println!("  Migrations:     {}", stats.counters.migrations.to_string().yellow());
    println!(
        "  Pheromone:      {:.3} on nodes, {:.3} on edges",
        stats.node_load, stats.edge_load
    );
    if skipped > 0 {
        println!("  Skipped events: {}", skipped.to_string().red());
    }
}
