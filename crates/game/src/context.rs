use crate::ids::{BodyId, PlayerId};
use crate::ownership::{ClaimOutcome, HoldState, Holder, Ownership, OwnershipArbiter};
use crate::physics::{PhysicsWorld, WorldConfig};
use crate::registry::BodyRegistry;

pub struct PhysicsContext {
    pub world: PhysicsWorld,
    pub registry: BodyRegistry,
    pub arbiter: OwnershipArbiter,
    held_mass: f32,
}

impl PhysicsContext {
    pub fn new(local_id: PlayerId, world_config: &WorldConfig, held_mass: f32) -> Self {
        Self {
            world: PhysicsWorld::with_config(world_config),
            registry: BodyRegistry::new(&local_id),
            arbiter: OwnershipArbiter::new(local_id),
            held_mass,
        }
    }

    pub fn local_id(&self) -> &PlayerId {
        self.arbiter.local_id()
    }

    pub fn held_mass(&self) -> f32 {
        self.held_mass
    }

    pub fn ownership(&self, body: &BodyId) -> Ownership {
        self.arbiter.ownership(body)
    }

    /// Registers a hold and suspends the body's mass and gravity. `None` when
    /// the body is unknown or static.
    pub fn begin_hold(&mut self, body: &BodyId, holder: Holder) -> Option<ClaimOutcome> {
        let record = self.registry.get(body)?;
        if record.is_static() {
            return None;
        }
        let handle = record.handle();
        let original_mass = record.properties.mass;
        let original_gravity_scale = self.world.gravity_scale(handle)?;

        let outcome = self.arbiter.claim(HoldState::new(
            body.clone(),
            holder.clone(),
            original_mass,
            original_gravity_scale,
        ));

        if let ClaimOutcome::Granted { stale, .. } = &outcome {
            if let Some(stale) = stale {
                self.restore(stale);
            }
            self.world.set_body_mass(handle, self.held_mass);
            self.world.set_gravity_scale(handle, 0.0);
            self.world.clear_forces(handle);
            self.registry.set_holder(body, Some(holder));
        }

        Some(outcome)
    }

    pub fn end_hold(&mut self, body: &BodyId, holder: &Holder) -> Option<HoldState> {
        let state = self.arbiter.release(body, holder)?;
        self.restore(&state);
        Some(state)
    }

    pub fn end_holds_of(&mut self, holder: &Holder) -> Vec<HoldState> {
        let released = self.arbiter.release_all(holder);
        for state in &released {
            self.restore(state);
        }
        released
    }

    pub fn despawn(&mut self, body: &BodyId) -> Option<HoldState> {
        let hold = self.arbiter.forget(body);
        self.registry.remove(&mut self.world, body);
        hold
    }

    pub fn clear(&mut self) {
        self.arbiter.clear();
        self.registry.clear(&mut self.world);
    }

    fn restore(&mut self, state: &HoldState) {
        self.registry.set_holder(&state.body, None);
        let Some(handle) = self.registry.handle(&state.body) else {
            return;
        };
        self.world.set_body_mass(handle, state.original_mass);
        self.world.set_gravity_scale(handle, state.original_gravity_scale);
        self.world.clear_forces(handle);
    }
}
