use serde::{Deserialize, Serialize};

use crate::hold::HoldConfig;
use crate::interp::InterpolationConfig;
use crate::net::SyncConfig;
use crate::physics::WorldConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub world: WorldConfig,
    pub hold: HoldConfig,
    pub sync: SyncConfig,
    pub interpolation: InterpolationConfig,
    /// Commands buffered between frames before the oldest are dropped.
    pub command_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            hold: HoldConfig::default(),
            sync: SyncConfig::default(),
            interpolation: InterpolationConfig::default(),
            command_capacity: 64,
        }
    }
}
