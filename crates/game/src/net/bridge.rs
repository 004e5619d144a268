use glam::Vec3;

use crate::context::PhysicsContext;
use crate::ids::{BodyId, PlayerId};
use crate::interp::{RemoteEntityInterpolator, TrackedId};
use crate::ownership::{ClaimOutcome, Holder, Ownership};
use crate::physics::{BodyProperties, Transform};

use super::protocol::{BodyState, PhysicsMessage, wire_transform};
use super::queue::{OutboundMessage, OutboundQueue};
use super::SyncConfig;

pub struct NetworkSyncBridge {
    config: SyncConfig,
    local_id: PlayerId,
    queue: OutboundQueue,
    clock_ms: f64,
    since_snapshot_ms: f64,
}

impl NetworkSyncBridge {
    pub fn new(local_id: PlayerId, config: SyncConfig) -> Self {
        Self {
            queue: OutboundQueue::new(config.queue_capacity),
            config,
            local_id,
            clock_ms: 0.0,
            since_snapshot_ms: 0.0,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms as u64
    }

    fn push(&mut self, message: PhysicsMessage) {
        log::trace!("queue {}", message.kind());
        let now = self.clock_ms();
        self.queue.push(now, message);
    }

    pub fn object_created(&mut self, id: BodyId, transform: Transform, properties: BodyProperties) {
        self.push(PhysicsMessage::object_created(id, transform, properties));
    }

    pub fn object_removed(&mut self, id: BodyId) {
        self.push(PhysicsMessage::ObjectRemoved { id });
    }

    pub fn pickup(&mut self, id: BodyId) {
        let player_id = self.local_id.clone();
        self.push(PhysicsMessage::ObjectPickup { id, player_id });
    }

    pub fn drop(&mut self, id: BodyId) {
        let player_id = self.local_id.clone();
        self.push(PhysicsMessage::ObjectDrop { id, player_id });
    }

    pub fn apply_force(&mut self, id: BodyId, force: Vec3) {
        let player_id = self.local_id.clone();
        self.push(PhysicsMessage::ApplyForce {
            id,
            force: force.to_array(),
            player_id,
        });
    }

    pub fn player_move(&mut self, transform: Transform) {
        let player_id = self.local_id.clone();
        self.push(PhysicsMessage::player_move(player_id, transform));
    }

    /// Returns whether a snapshot was queued.
    pub fn tick(&mut self, ctx: &PhysicsContext, delta: f32) -> bool {
        if !delta.is_finite() || delta <= 0.0 {
            return false;
        }
        let delta_ms = f64::from(delta) * 1000.0;
        self.clock_ms += delta_ms;
        self.since_snapshot_ms += delta_ms;
        self.queue.cleanup(self.clock_ms());

        let interval = self.config.snapshot_interval_ms as f64;
        if self.since_snapshot_ms < interval {
            return false;
        }
        // Never burst to catch up after a stall.
        self.since_snapshot_ms = if interval > 0.0 {
            self.since_snapshot_ms % interval
        } else {
            0.0
        };

        match self.snapshot(ctx) {
            Some(message) => {
                self.push(message);
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self, ctx: &PhysicsContext) -> Option<PhysicsMessage> {
        let mut objects = Vec::with_capacity(ctx.registry.len());
        for body in ctx.registry.iter() {
            let handle = body.handle();
            if !self.config.broadcast_sleeping && ctx.world.is_sleeping(handle) {
                continue;
            }
            let Some(state) = ctx.world.kinematics(handle) else {
                continue;
            };
            if !state.is_finite() {
                log::warn!("skipping non-finite state for {}", body.id);
                continue;
            }
            objects.push(BodyState::new(body.id.clone(), &state, body.properties.clone()));
        }

        if objects.is_empty() {
            None
        } else {
            Some(PhysicsMessage::State { objects })
        }
    }

    pub fn drain(&mut self) -> Vec<OutboundMessage> {
        self.queue.drain()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.since_snapshot_ms = 0.0;
    }

    /// Applies one message from `from`. Unknown ids, stale drops and lost
    /// ownership races are logged and skipped.
    pub fn handle_message(
        &mut self,
        ctx: &mut PhysicsContext,
        interp: &mut RemoteEntityInterpolator,
        from: &PlayerId,
        message: PhysicsMessage,
    ) {
        if *from == self.local_id {
            log::trace!("ignoring echo of {}", message.kind());
            return;
        }

        match message {
            PhysicsMessage::ObjectCreated {
                id,
                position,
                rotation,
                properties,
            } => {
                if ctx.registry.contains(&id) {
                    log::trace!("{} already exists", id);
                    return;
                }
                let transform = wire_transform(position, rotation);
                if !transform.is_finite() {
                    log::warn!("ignoring non-finite creation of {}", id);
                    return;
                }
                ctx.registry
                    .create(&mut ctx.world, properties, transform, Some(id));
            }
            PhysicsMessage::ObjectRemoved { id } => {
                interp.remove(&TrackedId::Body(id.clone()));
                if ctx.despawn(&id).is_some() {
                    log::debug!("{} removed {} while it was held", from, id);
                }
            }
            PhysicsMessage::ObjectPickup { id, player_id } => {
                if player_id == self.local_id {
                    return;
                }
                self.remote_pickup(ctx, interp, id, player_id);
            }
            PhysicsMessage::ObjectDrop { id, player_id } => {
                if player_id == self.local_id {
                    return;
                }
                if ctx.end_hold(&id, &Holder::Remote(player_id)).is_some() {
                    interp.remove(&TrackedId::Body(id));
                } else {
                    log::debug!("stale drop of {} from {}", id, from);
                }
            }
            PhysicsMessage::ApplyForce {
                id,
                force,
                player_id,
            } => {
                if player_id == self.local_id {
                    return;
                }
                self.remote_force(ctx, &id, Vec3::from_array(force), &player_id);
            }
            PhysicsMessage::State { objects } => {
                for entry in objects {
                    self.apply_state(ctx, interp, from, entry);
                }
            }
            PhysicsMessage::PlayerMove {
                player_id,
                position,
                rotation,
            } => {
                if player_id == self.local_id {
                    return;
                }
                interp.update_target(
                    TrackedId::Player(player_id),
                    wire_transform(position, rotation),
                );
            }
        }
    }

    fn remote_pickup(
        &mut self,
        ctx: &mut PhysicsContext,
        interp: &mut RemoteEntityInterpolator,
        id: BodyId,
        player_id: PlayerId,
    ) {
        match ctx.begin_hold(&id, Holder::Remote(player_id.clone())) {
            None => log::debug!("pickup of unknown or static {} by {}", id, player_id),
            Some(ClaimOutcome::Rejected { current }) => {
                log::debug!("pickup of {} by {} lost to {}", id, player_id, current);
            }
            Some(ClaimOutcome::Granted { preempted, stale }) => {
                if let Some(stale) = stale {
                    interp.remove(&TrackedId::Body(stale.body));
                }
                if preempted.is_some_and(|hold| hold.holder == Holder::Local) {
                    log::debug!("yielding {} to {}", id, player_id);
                    self.drop(id.clone());
                }
                if let Some(handle) = ctx.registry.handle(&id) {
                    if let Some(pose) = ctx.world.kinematics(handle) {
                        interp.update_target(TrackedId::Body(id), pose.transform());
                    }
                }
            }
        }
    }

    fn remote_force(&self, ctx: &mut PhysicsContext, id: &BodyId, force: Vec3, sender: &PlayerId) {
        if !force.is_finite() {
            log::warn!("ignoring non-finite force on {} from {}", id, sender);
            return;
        }
        let allowed = match ctx.ownership(id) {
            Ownership::Free => true,
            Ownership::HeldByRemote(holder) => holder == *sender,
            Ownership::HeldByLocal => false,
        };
        if !allowed {
            log::debug!("force on {} from {} rejected by ownership", id, sender);
            return;
        }
        match ctx.registry.get(id) {
            Some(body) if !body.is_static() => {
                let handle = body.handle();
                ctx.world.apply_impulse(handle, force);
            }
            Some(_) => log::debug!("force on static {} ignored", id),
            None => log::debug!("force on unknown {} ignored", id),
        }
    }

    fn apply_state(
        &mut self,
        ctx: &mut PhysicsContext,
        interp: &mut RemoteEntityInterpolator,
        from: &PlayerId,
        entry: BodyState,
    ) {
        if !entry.is_finite() {
            log::warn!("ignoring non-finite state for {} from {}", entry.id, from);
            return;
        }
        let mut state = entry.kinematics();
        state.orientation = wire_transform(entry.position, entry.rotation).orientation;

        let Some(body) = ctx.registry.get(&entry.id) else {
            let id = ctx.registry.create(
                &mut ctx.world,
                entry.properties,
                state.transform(),
                Some(entry.id),
            );
            if let Some(handle) = ctx.registry.handle(&id) {
                ctx.world
                    .set_body_velocities(handle, state.linear_velocity, state.angular_velocity);
            }
            return;
        };
        if body.is_static() {
            return;
        }
        let handle = body.handle();

        match ctx.ownership(&entry.id) {
            Ownership::HeldByLocal => {}
            Ownership::HeldByRemote(holder) => {
                if holder != *from {
                    return;
                }
                interp.update_target(TrackedId::Body(entry.id), state.transform());
                ctx.world
                    .set_body_velocities(handle, state.linear_velocity, state.angular_velocity);
            }
            Ownership::Free => ctx.world.overwrite_kinematics(handle, &state),
        }
    }

    pub fn peer_left(
        &mut self,
        ctx: &mut PhysicsContext,
        interp: &mut RemoteEntityInterpolator,
        player: &PlayerId,
    ) {
        for released in ctx.end_holds_of(&Holder::Remote(player.clone())) {
            log::debug!("{} left, freeing {}", player, released.body);
            interp.remove(&TrackedId::Body(released.body));
        }
        interp.remove(&TrackedId::Player(player.clone()));
    }
}
