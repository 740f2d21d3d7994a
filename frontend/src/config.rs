//! Optional TOML configuration, read from the platform config directory.
//! CLI flags always win over config values.

use std::path::PathBuf;

use log::warn;
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Default cycle budget for `run` and `sim`.
    pub max_cycles: u64,
    /// Default watch list for `sim`.
    pub watch: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_cycles: 1_000_000,
            watch: Vec::new(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        match Self::path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => Self::default(),
        }
    }

    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wirepulse").join("config.toml"))
    }

    fn load_from(path: &std::path::Path) -> Self {
        let Ok(text) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring malformed config {}: {e}", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_missing_fields() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_config_overrides_only_named_fields() {
        let config: Config = toml::from_str("max_cycles = 42").unwrap();
        assert_eq!(config.max_cycles, 42);
        assert!(config.watch.is_empty());
    }

    #[test]
    fn watch_list_parses() {
        let config: Config = toml::from_str("watch = [\"q\", \"alu.z\"]").unwrap();
        assert_eq!(config.watch, vec!["q".to_string(), "alu.z".to_string()]);
    }
}
