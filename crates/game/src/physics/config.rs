use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub gravity: f32,
    pub max_substeps: u32,
    /// Height of the floor slab; `None` leaves the world open.
    pub ground_height: Option<f32>,
    pub ground_half_size: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            max_substeps: 5,
            ground_height: Some(0.0),
            ground_half_size: 50.0,
        }
    }
}
