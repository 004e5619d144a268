use glam::{Quat, Vec3};

use crate::context::PhysicsContext;
use crate::error::{ForceError, PickupError};
use crate::ids::BodyId;
use crate::ownership::{ClaimOutcome, Holder, Ownership};
use crate::physics::Transform;

use super::{HoldConfig, control};

const RAY_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub enum PickupSelector {
    Id(BodyId),
    Ray { origin: Vec3, direction: Vec3 },
}

pub struct HeldObjectController {
    config: HoldConfig,
}

impl Default for HeldObjectController {
    fn default() -> Self {
        Self::new(HoldConfig::default())
    }
}

impl HeldObjectController {
    pub fn new(config: HoldConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HoldConfig {
        &self.config
    }

    pub fn held(&self, ctx: &PhysicsContext) -> Option<BodyId> {
        ctx.arbiter.held_by(&Holder::Local).cloned()
    }

    pub fn pickup(
        &self,
        ctx: &mut PhysicsContext,
        selector: PickupSelector,
    ) -> Result<BodyId, PickupError> {
        if let Some(current) = ctx.arbiter.held_by(&Holder::Local) {
            return Err(PickupError::AlreadyHolding(current.clone()));
        }

        let id = match selector {
            PickupSelector::Id(id) => id,
            PickupSelector::Ray { origin, direction } => {
                self.resolve_ray(ctx, origin, direction)?
            }
        };

        let Some(body) = ctx.registry.get(&id) else {
            return Err(PickupError::UnknownBody(id));
        };
        if body.is_static() {
            return Err(PickupError::StaticBody(id));
        }
        if let Ownership::HeldByRemote(holder) = ctx.ownership(&id) {
            return Err(PickupError::HeldByRemote { body: id, holder });
        }

        match ctx.begin_hold(&id, Holder::Local) {
            Some(ClaimOutcome::Granted { .. }) => {
                log::debug!("picked up {}", id);
                Ok(id)
            }
            Some(ClaimOutcome::Rejected { current }) => {
                Err(PickupError::Contended { body: id, holder: current })
            }
            None => Err(PickupError::UnknownBody(id)),
        }
    }

    fn resolve_ray(
        &self,
        ctx: &PhysicsContext,
        origin: Vec3,
        direction: Vec3,
    ) -> Result<BodyId, PickupError> {
        if !origin.is_finite() || !direction.is_finite() || direction.length() < RAY_EPSILON {
            return Err(PickupError::DegenerateRay);
        }

        let (handle, _) = ctx
            .world
            .raycast_dynamic(origin, direction.normalize(), self.config.ray_length)
            .ok_or(PickupError::NoHit)?;

        ctx.registry
            .body_for_handle(handle)
            .cloned()
            .ok_or(PickupError::NoHit)
    }

    /// Moves the setpoint only; `tick` does the pulling.
    pub fn update_target(&self, ctx: &mut PhysicsContext, position: Vec3, orientation: Quat) -> bool {
        let target = Transform::new(position, orientation);
        if !target.is_finite() {
            return false;
        }
        match ctx.arbiter.local_hold_mut() {
            Some(hold) => {
                hold.target = Some(target.normalized());
                true
            }
            None => false,
        }
    }

    pub fn tick(&self, ctx: &mut PhysicsContext, delta: f32) {
        if delta <= 0.0 {
            return;
        }
        let Some(hold) = ctx.arbiter.local_hold() else {
            return;
        };
        let id = hold.body.clone();
        let target = hold.target;

        let state = ctx
            .registry
            .handle(&id)
            .and_then(|handle| ctx.world.kinematics(handle).map(|k| (handle, k)));
        let Some((handle, state)) = state else {
            log::debug!("held body {} vanished, clearing hold", id);
            ctx.arbiter.release(&id, &Holder::Local);
            return;
        };

        let Some(target) = target else {
            return;
        };

        let force = control::spring_force(
            &self.config,
            target.position,
            state.position,
            state.linear_velocity,
        );
        let torque = control::alignment_torque(
            &self.config,
            state.orientation,
            target.orientation,
            state.angular_velocity,
        );
        ctx.world.set_control_force(handle, force, torque);
    }

    pub fn drop(&self, ctx: &mut PhysicsContext) -> Option<BodyId> {
        let id = ctx.arbiter.held_by(&Holder::Local)?.clone();
        ctx.end_hold(&id, &Holder::Local);
        log::debug!("dropped {}", id);
        Some(id)
    }

    pub fn throw(&self, ctx: &mut PhysicsContext, impulse: Vec3) -> Option<BodyId> {
        let id = self.drop(ctx)?;
        if impulse.is_finite() {
            if let Some(handle) = ctx.registry.handle(&id) {
                ctx.world.apply_impulse(handle, impulse);
            }
        }
        Some(id)
    }

    pub fn apply_force(
        &self,
        ctx: &mut PhysicsContext,
        id: &BodyId,
        force: Vec3,
    ) -> Result<(), ForceError> {
        if !force.is_finite() {
            return Err(ForceError::NonFinite);
        }
        let Some(body) = ctx.registry.get(id) else {
            return Err(ForceError::UnknownBody(id.clone()));
        };
        if body.is_static() {
            return Err(ForceError::StaticBody(id.clone()));
        }
        if let Ownership::HeldByRemote(holder) = ctx.ownership(id) {
            return Err(ForceError::HeldByRemote {
                body: id.clone(),
                holder,
            });
        }
        let handle = body.handle();
        ctx.world.apply_impulse(handle, force);
        Ok(())
    }
}
