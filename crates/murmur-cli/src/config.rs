//! Configuration management for the Murmur CLI.

use anyhow::{Context, Result};
use murmur::prelude::{KnowledgeMap, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name searched for in the current and parent directories.
pub const CONFIG_FILE: &str = "murmur.toml";

/// Murmur swarm configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub swarm: SwarmConfig,
    #[serde(default = "default_platform")]
    pub platform: FactoryConfig,
    #[serde(default = "default_algorithm")]
    pub algorithm: FactoryConfig,
    #[serde(default)]
    pub accents: Vec<FactoryConfig>,
    #[serde(default = "default_groups")]
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmConfig {
    #[serde(default = "default_agents")]
    pub agents: usize,
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    /// Tick rate per agent; zero runs unthrottled.
    #[serde(default = "default_hz")]
    pub hz: f64,
    #[serde(default = "default_send_hz")]
    pub send_hz: f64,
}

/// A factory name plus its arguments. An empty name means "none".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactoryConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKindConfig {
    #[default]
    Fixed,
    Transient,
}

/// A group written into the store before the first tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub prefix: String,
    #[serde(default)]
    pub kind: GroupKindConfig,
    /// Member ids; empty means every agent in the swarm.
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_debug_level")]
    pub debug_level: i64,
    #[serde(default = "default_store_debug_level")]
    pub store_debug_level: i64,
}

// Default value functions
fn default_agents() -> usize { 3 }
fn default_ticks() -> u64 { 40 }
fn default_hz() -> f64 { 20.0 }
fn default_send_hz() -> f64 { -1.0 }
fn default_debug_level() -> i64 { 3 }
fn default_store_debug_level() -> i64 { 2 }

fn default_platform() -> FactoryConfig {
    FactoryConfig {
        name: "simulated".into(),
        args: BTreeMap::from([("speed".into(), "2.0".into())]),
    }
}

fn default_algorithm() -> FactoryConfig {
    FactoryConfig {
        name: "formation sync".into(),
        args: BTreeMap::from([
            ("group".into(), "group.all".into()),
            ("start".into(), "(0,0)".into()),
            ("end".into(), "(20,0)".into()),
            ("formation".into(), "line".into()),
            ("steps".into(), "4".into()),
        ]),
    }
}

fn default_groups() -> Vec<GroupConfig> {
    vec![GroupConfig {
        prefix: "group.all".into(),
        kind: GroupKindConfig::Fixed,
        members: Vec::new(),
    }]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            swarm: SwarmConfig::default(),
            platform: default_platform(),
            algorithm: default_algorithm(),
            accents: Vec::new(),
            groups: default_groups(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            agents: default_agents(),
            ticks: default_ticks(),
            hz: default_hz(),
            send_hz: default_send_hz(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            debug_level: default_debug_level(),
            store_debug_level: default_store_debug_level(),
        }
    }
}

impl FactoryConfig {
    pub fn is_set(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// Arguments as store values.
    pub fn knowledge(&self) -> KnowledgeMap {
        self.args
            .iter()
            .map(|(k, v)| (k.clone(), parse_value(v)))
            .collect()
    }
}

/// Integers and reals become numbers; anything else stays a string.
pub fn parse_value(text: &str) -> Value {
    let trimmed = text.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        Value::from(i)
    } else if let Ok(d) = trimmed.parse::<f64>() {
        Value::from(d)
    } else {
        Value::from(text)
    }
}

impl Config {
    /// Load config from murmur.toml in the current or parent directories.
    pub fn load() -> Result<(Self, Option<PathBuf>)> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        match find_config_file(&cwd) {
            Some(path) => Ok((Self::load_from(&path)?, Some(path))),
            None => Ok((Config::default(), None)),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Save config to the specified path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Generate default config as TOML string.
    pub fn default_toml() -> Result<String> {
        Config::default().to_toml()
    }
}

/// Find murmur.toml in `start` or its parent directories.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}
