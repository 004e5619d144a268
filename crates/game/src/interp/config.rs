use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    /// Each advance covers `min(delta * rate, 1)` of the remaining gap.
    pub rate: f32,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self { rate: 10.0 }
    }
}
