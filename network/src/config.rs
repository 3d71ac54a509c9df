// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session configuration and its TOML persistence

use anyhow::{Context, Result};
use directories::ProjectDirs;
use onitama_core::agents::{Agent, Difficulty};
use onitama_core::GameSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Immutable configuration handed to a session at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Overrides the agent the difficulty picks; the difficulty still sets
    /// the search depth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<Agent>,
    /// Relay address for remote play, `host:port` with an optional `tcp://`
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default)]
    pub game: GameSettings,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

/// Keep-alive timing for remote connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Time between probes
    #[serde(with = "humantime_serde", default = "default_interval")]
    pub interval: Duration,
    /// Silence after which the connection counts as lost
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

fn default_server_url() -> String {
    "tcp://127.0.0.1:7878".to_string()
}

fn default_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_timeout() -> Duration {
    Duration::from_secs(90)
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            timeout: default_timeout(),
        }
    }
}

impl SessionConfig {
    /// Agent the AI opponent plays with
    pub fn agent(&self) -> Agent {
        self.agent.unwrap_or_else(|| self.difficulty.agent())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            agent: None,
            server_url: default_server_url(),
            game: GameSettings::default(),
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

/// Default location of the config file
pub fn default_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("app", "onitama", "onitama")
        .context("Failed to determine config directory")?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

/// Load the config at `path`, writing the defaults there if it does not exist
pub fn load_config(path: &Path) -> Result<SessionConfig> {
    if !path.exists() {
        tracing::info!("Config file not found, creating default at: {}", path.display());
        let default_config = SessionConfig::default();
        save_config(path, &default_config)?;
        return Ok(default_config);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    toml::from_str::<SessionConfig>(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Write `config` to `path`, creating parent directories as needed
pub fn save_config(path: &Path, config: &SessionConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    let toml_content = toml::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(path, toml_content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    tracing::info!("Saved config to: {}", path.display());
    Ok(())
}
