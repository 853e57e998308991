//! Print the default parameter file.

use anyhow::Result;

use crate::config::Config;

pub fn run() -> Result<()> {
    print!("{}", Config::default_toml()?);
    Ok(())
}
