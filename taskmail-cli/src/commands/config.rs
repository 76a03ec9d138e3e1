//! Config command implementation

use crate::config::{save_config, DemoConfig};
use anyhow::Result;
use std::path::Path;

/// Print the effective configuration, or write it to `output`
pub fn show_config(config: &DemoConfig, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            save_config(config, path)?;
            println!("Configuration written to {}", path.display());
        }
        None => print!("{}", toml::to_string_pretty(config)?),
    }
    Ok(())
}
