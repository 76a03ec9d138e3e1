//! Configuration handling for the taskmail CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use taskmail_core::{CommandConfig, MailboxConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_controller")]
    pub controller: MailboxConfig,

    #[serde(default = "default_device")]
    pub device: MailboxConfig,

    #[serde(default)]
    pub command: CommandConfig,

    #[serde(default)]
    pub demo: DemoSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoSettings {
    /// Number of controller cycles that issue requests
    #[serde(default = "default_requests")]
    pub requests: usize,

    /// Period of both task loops, in milliseconds
    #[serde(default = "default_cycle_ms")]
    pub cycle_ms: u64,

    /// Distance the device moves per step
    #[serde(default = "default_max_step")]
    pub max_step: f64,
}

impl DemoSettings {
    pub fn cycle_period(&self) -> Duration {
        Duration::from_millis(self.cycle_ms)
    }
}

impl DemoConfig {
    /// Check every section before any task is started
    pub fn validate(&self) -> Result<()> {
        self.controller.validate().context("invalid [controller] section")?;
        self.device.validate().context("invalid [device] section")?;
        self.command.validate().context("invalid [command] section")?;
        anyhow::ensure!(
            self.demo.max_step > 0.0,
            "demo.max_step must be positive, got {}",
            self.demo.max_step
        );
        Ok(())
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            controller: default_controller(),
            device: default_device(),
            command: CommandConfig::default(),
            demo: DemoSettings::default(),
        }
    }
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            requests: default_requests(),
            cycle_ms: default_cycle_ms(),
            max_step: default_max_step(),
        }
    }
}

fn default_controller() -> MailboxConfig { MailboxConfig::new("controller") }
fn default_device() -> MailboxConfig { MailboxConfig::new("device") }
fn default_requests() -> usize { 20 }
fn default_cycle_ms() -> u64 { 5 }
fn default_max_step() -> f64 { 0.5 }

/// Load configuration from file or use defaults
pub fn load_config(path: Option<&Path>) -> Result<DemoConfig> {
    let config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => DemoConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &DemoConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}
