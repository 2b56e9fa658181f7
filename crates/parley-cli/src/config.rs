//! Configuration management for Parley CLI
//!
//! Capabilities are read from ~/.config/parley/config.toml, an optional
//! capability file, and `DIALOGFLOW_*` environment variables, in that
//! order; later sources win.

use anyhow::{bail, Context, Result};
use parley::Capabilities;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "parley";
const CONFIG_FILE: &str = "config.toml";

/// Prefix of capabilities picked up from the environment
pub const ENV_PREFIX: &str = "DIALOGFLOW_";

const SECRET_MARKERS: [&str; 3] = ["PRIVATE_KEY", "ACCESS_TOKEN", "SECRET"];

/// CLI Configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub capabilities: Capabilities,
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join(CONFIG_DIR);
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Load config from the default location, or fall back to defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from a file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        toml::from_str(&content).with_context(|| format!("Failed to parse config file {:?}", path))
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save config to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory {:?}", dir))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).with_context(|| format!("Failed to write config to {:?}", path))?;

        Ok(())
    }

    /// Store a `KEY=VALUE` assignment
    ///
    /// Values that parse as JSON (numbers, booleans, objects) keep their
    /// type; anything else is stored as a string.
    pub fn set_capability(&mut self, assignment: &str) -> Result<()> {
        let (key, raw) = assignment
            .split_once('=')
            .with_context(|| format!("Invalid setting '{}', expected KEY=VALUE", assignment))?;
        let key = key.trim();
        if key.is_empty() {
            bail!("Invalid setting '{}', key is empty", assignment);
        }

        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        self.capabilities.insert(key, value);
        Ok(())
    }

    /// Remove a stored capability; returns whether it was present
    pub fn unset_capability(&mut self, key: &str) -> bool {
        self.capabilities.remove(key.trim()).is_some()
    }
}

/// Read capabilities from a TOML or JSON file
///
/// A `[capabilities]` table (or `"capabilities"` object) is used when
/// present, otherwise the top-level keys.
pub fn load_caps_file(path: &Path) -> Result<Capabilities> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read capabilities from {:?}", path))?;

    let value: Value = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON capabilities {:?}", path))?,
        Some("toml") | None => toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML capabilities {:?}", path))?,
        Some(other) => bail!(
            "Unsupported capabilities file type '.{}' (use .toml or .json)",
            other
        ),
    };

    let table = match value {
        Value::Object(mut map) => match map.remove("capabilities") {
            Some(inner) => inner,
            None => Value::Object(map),
        },
        _ => bail!("Capabilities file {:?} must contain a table", path),
    };

    serde_json::from_value(table).with_context(|| format!("Invalid capabilities in {:?}", path))
}

/// Merge config file, capability file and environment
pub fn resolve_capabilities(
    config: &Config,
    caps_file: Option<&Path>,
    env: Capabilities,
) -> Result<Capabilities> {
    let mut caps = config.capabilities.clone();
    if let Some(path) = caps_file {
        caps.merge(load_caps_file(path)?);
    }
    caps.merge(env);
    Ok(caps)
}

pub fn is_secret(key: &str) -> bool {
    SECRET_MARKERS.iter().any(|marker| key.contains(marker))
}

/// Render a capability value for display, hiding secrets
pub fn display_value(key: &str, value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if !is_secret(key) {
        return text;
    }
    let visible: String = text.chars().take(4).collect();
    if text.chars().count() <= 8 {
        "********".to_string()
    } else {
        format!("{}********", visible)
    }
}
