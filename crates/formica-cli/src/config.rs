//! Configuration management for the Formica CLI.

use anyhow::{Context, Result};
use formica::prelude::SimParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Contents of `formica.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub params: SimParams,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    #[serde(default = "default_nodes")]
    pub nodes: usize,
    /// Random chords per node on top of the ring.
    #[serde(default = "default_degree")]
    pub degree: usize,
    #[serde(default = "default_colonies")]
    pub colonies: Vec<String>,
}

// Default value functions
fn default_ticks() -> u64 { 100 }
fn default_nodes() -> usize { 64 }
fn default_degree() -> usize { 2 }
fn default_colonies() -> Vec<String> { vec!["red".into(), "blue".into()] }

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: default_ticks(),
            nodes: default_nodes(),
            degree: default_degree(),
            colonies: default_colonies(),
        }
    }
}

impl Config {
    /// Load from `path`, or from formica.toml in the current or a parent
    /// directory, or fall back to the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path.map(Path::to_path_buf).or_else(find_config_file) {
            Some(path) => {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config: {}", path.display()))?;
                Self::parse(&content)
                    .with_context(|| format!("Failed to parse config: {}", path.display()))
            }
            None => Ok(Config::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Generate default config as TOML string.
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Config::default()).context("Failed to serialize config")
    }
}

/// Find formica.toml in current or parent directories.
fn find_config_file() -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    loop {
        let config_path = dir.join("formica.toml");
        if config_path.exists() {
            return Some(config_path);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}
