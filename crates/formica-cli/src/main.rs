//! Formica CLI - run multi-colony ant simulations from the command line.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "formica")]
#[command(author, version, about = "Formica - multi-colony ant simulations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation over a generated graph
    Run {
        /// Parameter file (default: formica.toml in this or a parent directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of ticks to run
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Number of nodes in the generated graph
        #[arg(short, long)]
        nodes: Option<usize>,

        /// Random chords per node on top of the ring
        #[arg(short, long)]
        degree: Option<usize>,

        /// Comma-separated colony names
        #[arg(long, value_delimiter = ',')]
        colonies: Option<Vec<String>>,

        /// Print the final statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default parameter file
    Params,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            ticks,
            nodes,
            degree,
            colonies,
            json,
        } => {
            let overrides = commands::run::Overrides {
                ticks,
                nodes,
                degree,
                colonies,
            };
            commands::run::run(config.as_deref(), overrides, json)
        }
        Commands::Params => commands::params::run(),
    }
}
