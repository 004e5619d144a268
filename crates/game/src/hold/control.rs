use glam::{Quat, Vec3};

use super::HoldConfig;

const AXIS_EPSILON: f32 = 1e-4;

pub fn spring_force(config: &HoldConfig, target: Vec3, position: Vec3, velocity: Vec3) -> Vec3 {
    let force = (target - position) * config.k_p - velocity * config.k_d;
    if force.is_finite() { force } else { Vec3::ZERO }
}

/// Corrective torque that turns `current` toward `target` along the shortest
/// arc. Zero when already aligned.
pub fn alignment_torque(
    config: &HoldConfig,
    current: Quat,
    target: Quat,
    angular_velocity: Vec3,
) -> Vec3 {
    let mut error = target * current.inverse();
    if error.w < 0.0 {
        error = -error;
    }

    let axis = Vec3::new(error.x, error.y, error.z);
    let sin_half = axis.length();
    if !sin_half.is_finite() || sin_half < AXIS_EPSILON {
        return Vec3::ZERO;
    }

    let angle = 2.0 * sin_half.atan2(error.w);
    let torque = axis / sin_half * angle * config.k_p_rot - angular_velocity * config.k_d_rot;
    if !torque.is_finite() {
        return Vec3::ZERO;
    }
    torque.clamp_length_max(config.max_torque)
}
