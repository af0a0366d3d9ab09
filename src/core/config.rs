//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.threadview/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::core::collaborators::{StaticMetadata, StreamInfo};
use crate::core::time::LocalClock;
use crate::core::view::ViewSettings;
use crate::core::window::{RenderWindow, DEFAULT_THRESHOLD, DEFAULT_WINDOW_SIZE};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ThreadviewConfig {
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub streams: Vec<StreamEntry>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ViewConfig {
    pub collapse_messages: Option<bool>,
    pub render_window_size: Option<usize>,
    pub render_threshold: Option<usize>,
    pub autoscroll_forever: Option<bool>,
    pub twenty_four_hour_time: Option<bool>,
    pub utc_offset_minutes: Option<i32>,
    pub home_view: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct IdentityConfig {
    pub email: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamEntry {
    pub name: String,
    pub color: Option<String>,
    #[serde(default)]
    pub invite_only: bool,
}

/// Values given on the command line; `None` means not specified.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub collapse_messages: Option<bool>,
    pub render_window_size: Option<usize>,
    pub render_threshold: Option<usize>,
    pub autoscroll_forever: Option<bool>,
    pub home_view: Option<bool>,
    pub email: Option<String>,
}

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub view: ViewSettings,
    pub twenty_four_hour_time: bool,
    pub utc_offset_minutes: i32,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub streams: Vec<StreamEntry>,
}

impl ResolvedConfig {
    pub fn clock(&self) -> LocalClock {
        LocalClock::new(self.utc_offset_minutes, self.twenty_four_hour_time)
    }

    pub fn metadata(&self) -> StaticMetadata {
        let mut metadata = StaticMetadata {
            my_email: self.email.clone(),
            ..Default::default()
        };
        for entry in &self.streams {
            metadata = metadata.with_stream(
                &entry.name,
                StreamInfo {
                    color: entry.color.clone(),
                    invite_only: entry.invite_only,
                },
            );
        }
        metadata
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.threadview/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".threadview").join("config.toml"))
}

/// Load config from `~/.threadview/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `ThreadviewConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<ThreadviewConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(ThreadviewConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(ThreadviewConfig::default());
    }

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config: ThreadviewConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

const DEFAULT_CONFIG: &str = r##"# threadview configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [view]
# collapse_messages = true           # Or set THREADVIEW_COLLAPSE=0
# render_window_size = 400           # Messages rendered at a time
# render_threshold = 50              # Must be less than half the window
# autoscroll_forever = false
# twenty_four_hour_time = false
# utc_offset_minutes = 60            # Defaults to the host's offset
# home_view = false                  # Combined feed: no subscription markers

# [identity]
# email = "you@example.com"          # Or set THREADVIEW_EMAIL
# full_name = "You"

# [[streams]]
# name = "general"
# color = "#76ce90"
# invite_only = false
"##;

fn generate_default_config(path: &PathBuf) {
    let default_content = DEFAULT_CONFIG;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &ThreadviewConfig, cli: &CliOverrides) -> Result<ResolvedConfig, ConfigError> {
    resolve_with_env(config, cli, |key| std::env::var(key).ok())
}

pub fn resolve_with_env(
    config: &ThreadviewConfig,
    cli: &CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig, ConfigError> {
    // Collapsing: CLI → env → config → default
    let collapse_messages = cli
        .collapse_messages
        .or_else(|| env("THREADVIEW_COLLAPSE").and_then(|v| parse_flag("THREADVIEW_COLLAPSE", &v)))
        .or(config.view.collapse_messages)
        .unwrap_or(true);

    let window_size = cli
        .render_window_size
        .or(config.view.render_window_size)
        .unwrap_or(DEFAULT_WINDOW_SIZE);
    let threshold = cli
        .render_threshold
        .or(config.view.render_threshold)
        .unwrap_or(DEFAULT_THRESHOLD);
    RenderWindow::new(window_size, threshold).map_err(|e| ConfigError::Invalid(e.to_string()))?;

    // Email: CLI → env → config
    let email = cli
        .email
        .clone()
        .or_else(|| env("THREADVIEW_EMAIL"))
        .or_else(|| config.identity.email.clone());

    let view = ViewSettings {
        collapse_messages,
        home_view: cli.home_view.or(config.view.home_view).unwrap_or(false),
        autoscroll_forever: cli
            .autoscroll_forever
            .or(config.view.autoscroll_forever)
            .unwrap_or(false),
        window_size,
        threshold,
    };

    Ok(ResolvedConfig {
        view,
        twenty_four_hour_time: config.view.twenty_four_hour_time.unwrap_or(false),
        utc_offset_minutes: config
            .view
            .utc_offset_minutes
            .unwrap_or_else(LocalClock::host_offset_minutes),
        email,
        full_name: config.identity.full_name.clone(),
        streams: config.streams.clone(),
    })
}

fn parse_flag(key: &str, value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            warn!("Ignoring {key}={other}: expected a boolean");
            None
        }
    }
}
