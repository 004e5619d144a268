use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tether::{RelayConfig, SessionConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub session: SessionConfig,
    pub relay: RelayConfig,
}

impl SimConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}
