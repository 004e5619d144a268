use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldConfig {
    pub held_mass: f32,
    pub k_p: f32,
    pub k_d: f32,
    pub k_p_rot: f32,
    pub k_d_rot: f32,
    pub max_torque: f32,
    pub ray_length: f32,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            held_mass: 0.1,
            k_p: 12.0,
            k_d: 2.2,
            k_p_rot: 0.5,
            k_d_rot: 0.1,
            max_torque: 1.0,
            ray_length: 50.0,
        }
    }
}
