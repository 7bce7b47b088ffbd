use std::path::PathBuf;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

use crate::catalog::DEFAULT_CATALOG_PATH;
use crate::gateway::IPFS_GATEWAY;

/// Import settings. Precedence: defaults, `cousinfm.toml`, `COUSINFM_*` env, CLI flags.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub catalog_path: PathBuf,
    pub validate: bool,
    pub gateway_url: String,
    pub timeout_secs: u64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        defaults()?
            .add_source(File::with_name("cousinfm").required(false))
            .add_source(Environment::with_prefix("COUSINFM").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("catalog_path", DEFAULT_CATALOG_PATH)?
        .set_default("validate", true)?
        .set_default("gateway_url", IPFS_GATEWAY)?
        .set_default("timeout_secs", 5_i64)
}
