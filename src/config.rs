//! Optional user config for the CLI, loaded from
//! `~/.config/alpacalert/config.toml`. Flags always win over the file.

use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// "all" or "only-failing"; overridden by --show.
    pub show: Option<String>,
    pub symbols: Option<SymbolsConfig>,
    pub grafana: Option<GrafanaConfig>,
}

/// Overrides for the state symbols the console renders.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SymbolsConfig {
    pub passing: Option<String>,
    pub failing: Option<String>,
    pub unknown: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrafanaConfig {
    pub base_url: Option<String>,
}

impl Config {
    /// Load the config file if present. A missing file is the default
    /// config; a malformed one is reported and ignored.
    pub fn load() -> Self {
        let Some(path) = dirs::config_dir().map(|d| d.join("alpacalert/config.toml")) else {
            return Self::default();
        };
        let Ok(raw) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        match toml::from_str(&raw) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), %err, "ignoring malformed config file");
                Self::default()
            }
        }
    }
}
