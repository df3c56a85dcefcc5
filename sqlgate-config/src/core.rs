use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::Path;
use tracing::{info, warn};

use super::error::Error;
use super::general::General;

/// sqlgate.toml
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: General,
}

impl Config {
    /// Load configuration from disk or use defaults.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let config = if let Ok(raw) = read_to_string(path) {
            let config: Config = toml::from_str(&raw)?;
            info!("loaded \"{}\"", path.display());
            config
        } else {
            warn!(
                "\"{}\" doesn't exist, loading defaults instead",
                path.display()
            );
            Config::default()
        };

        Ok(config)
    }

    /// Statement caching is enabled.
    pub fn statement_cache_enabled(&self) -> bool {
        self.general.query_cache_size > 0
    }
}
