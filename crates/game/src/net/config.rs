use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub snapshot_interval_ms: u64,
    /// Idle bodies still go out with every broadcast when set.
    pub broadcast_sleeping: bool,
    pub queue_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            snapshot_interval_ms: 100,
            broadcast_sleeping: true,
            queue_capacity: 256,
        }
    }
}
