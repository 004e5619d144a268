use std::collections::HashSet;

use crate::context::PhysicsContext;
use crate::error::PhysicsError;
use crate::hold::HeldObjectController;
use crate::ids::{BodyId, PlayerId};
use crate::interp::{RemoteEntityInterpolator, TrackedId};
use crate::net::{Inbound, NetworkSyncBridge, OutboundMessage, PhysicsMessage};
use crate::ownership::{Holder, Ownership};

use super::{CommandBuffer, PhysicsCommand, SessionConfig};

pub struct PhysicsSession {
    ctx: PhysicsContext,
    controller: HeldObjectController,
    bridge: NetworkSyncBridge,
    interp: RemoteEntityInterpolator,
    commands: CommandBuffer,
    frames: u64,
}

impl PhysicsSession {
    pub fn new(local_id: PlayerId, config: SessionConfig) -> Self {
        Self {
            ctx: PhysicsContext::new(local_id.clone(), &config.world, config.hold.held_mass),
            controller: HeldObjectController::new(config.hold),
            bridge: NetworkSyncBridge::new(local_id, config.sync),
            interp: RemoteEntityInterpolator::new(config.interpolation),
            commands: CommandBuffer::new(config.command_capacity),
            frames: 0,
        }
    }

    pub fn local_id(&self) -> &PlayerId {
        self.ctx.local_id()
    }

    pub fn context(&self) -> &PhysicsContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut PhysicsContext {
        &mut self.ctx
    }

    pub fn interpolator(&self) -> &RemoteEntityInterpolator {
        &self.interp
    }

    pub fn controller(&self) -> &HeldObjectController {
        &self.controller
    }

    pub fn held(&self) -> Option<&BodyId> {
        self.ctx.arbiter.held_by(&Holder::Local)
    }

    pub fn ownership(&self, body: &BodyId) -> Ownership {
        self.ctx.ownership(body)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn queue_command(&mut self, command: PhysicsCommand) {
        self.commands.push(command);
    }

    /// Applies a command now. Returns the body it affected, if any.
    pub fn handle_command(
        &mut self,
        command: PhysicsCommand,
    ) -> Result<Option<BodyId>, PhysicsError> {
        match command {
            PhysicsCommand::Spawn {
                properties,
                transform,
                id,
            } => {
                let existed = id.as_ref().is_some_and(|id| self.ctx.registry.contains(id));
                let id = self.ctx.registry.create(
                    &mut self.ctx.world,
                    properties,
                    transform,
                    id,
                );
                if !existed {
                    if let Some(body) = self.ctx.registry.get(&id) {
                        let transform = body.proxy().transform();
                        let properties = body.properties.clone();
                        self.bridge.object_created(id.clone(), transform, properties);
                    }
                }
                Ok(Some(id))
            }
            PhysicsCommand::Despawn(id) => {
                if !self.ctx.registry.contains(&id) {
                    return Ok(None);
                }
                self.ctx.despawn(&id);
                self.interp.remove(&TrackedId::Body(id.clone()));
                self.bridge.object_removed(id.clone());
                Ok(Some(id))
            }
            PhysicsCommand::Pickup(selector) => {
                let id = self.controller.pickup(&mut self.ctx, selector)?;
                self.bridge.pickup(id.clone());
                Ok(Some(id))
            }
            PhysicsCommand::UpdateTarget(target) => {
                if self.controller.update_target(&mut self.ctx, target.position, target.orientation) {
                    Ok(self.held().cloned())
                } else {
                    Err(PhysicsError::NotHolding)
                }
            }
            PhysicsCommand::Drop => {
                let id = self
                    .controller
                    .drop(&mut self.ctx)
                    .ok_or(PhysicsError::NotHolding)?;
                self.bridge.drop(id.clone());
                Ok(Some(id))
            }
            PhysicsCommand::Throw { impulse } => {
                let id = self
                    .controller
                    .throw(&mut self.ctx, impulse)
                    .ok_or(PhysicsError::NotHolding)?;
                self.bridge.drop(id.clone());
                if impulse.is_finite() {
                    self.bridge.apply_force(id.clone(), impulse);
                }
                Ok(Some(id))
            }
            PhysicsCommand::ApplyForce { id, force } => {
                self.controller.apply_force(&mut self.ctx, &id, force)?;
                self.bridge.apply_force(id.clone(), force);
                Ok(Some(id))
            }
            PhysicsCommand::PublishPose(transform) => {
                if transform.is_finite() {
                    self.bridge.player_move(transform.normalized());
                }
                Ok(None)
            }
        }
    }

    pub fn handle_inbound(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Message { from, message } => {
                self.bridge
                    .handle_message(&mut self.ctx, &mut self.interp, &from, message);
            }
            Inbound::PeerLeft(player) => {
                self.bridge.peer_left(&mut self.ctx, &mut self.interp, &player);
            }
        }
    }

    pub fn snapshot(&self) -> Option<PhysicsMessage> {
        self.bridge.snapshot(&self.ctx)
    }

    pub fn drain_outbound(&mut self) -> Vec<OutboundMessage> {
        self.bridge.drain()
    }

    /// One render frame. Returns the number of physics sub-steps run.
    pub fn frame(&mut self, delta: f32) -> u32 {
        for command in self.commands.drain() {
            if let Err(err) = self.handle_command(command) {
                log::debug!("command rejected: {}", err);
            }
        }

        let steps = self.ctx.world.step(delta);
        self.ctx.registry.sync_render_proxies(&self.ctx.world);
        self.controller.tick(&mut self.ctx, delta);
        self.bridge.tick(&self.ctx, delta);

        self.interp.advance(delta);
        self.apply_remote_holds();

        self.frames += 1;
        log::trace!("frame {} ran {} steps", self.frames, steps);
        steps
    }

    fn apply_remote_holds(&mut self) {
        let poses: Vec<_> = self
            .interp
            .bodies()
            .map(|(id, remote)| (id.clone(), remote.current))
            .collect();

        for (id, pose) in poses {
            if !matches!(self.ctx.ownership(&id), Ownership::HeldByRemote(_)) {
                self.interp.remove(&TrackedId::Body(id));
                continue;
            }
            if let Some(handle) = self.ctx.registry.handle(&id) {
                self.ctx
                    .world
                    .set_body_pose(handle, pose.position, pose.orientation);
                self.ctx.registry.sync_render_proxy(&self.ctx.world, &id);
            }
        }
    }

    /// Implicitly drops holds of players that are gone and forgets their
    /// smoothed poses.
    pub fn set_connected_players(&mut self, players: impl IntoIterator<Item = PlayerId>) {
        let connected: HashSet<PlayerId> = players.into_iter().collect();
        let vanished: Vec<PlayerId> = self
            .ctx
            .arbiter
            .holds()
            .filter_map(|hold| match &hold.holder {
                Holder::Remote(player) if !connected.contains(player) => Some(player.clone()),
                _ => None,
            })
            .collect();

        for player in vanished {
            self.bridge.peer_left(&mut self.ctx, &mut self.interp, &player);
        }
        self.interp.retain_players(&connected);
    }

    pub fn leave_room(&mut self) {
        if let Some(id) = self.controller.drop(&mut self.ctx) {
            log::debug!("left room while holding {}", id);
        }
        self.ctx.clear();
        self.interp.clear();
        self.bridge.clear();
        self.commands.clear();
    }
}
