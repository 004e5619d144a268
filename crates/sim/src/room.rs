use std::f32::consts::TAU;

use anyhow::Result;
use glam::{Quat, Vec3};
use tether::{
    BodyId, BodyProperties, Ownership, PhysicsCommand, PhysicsSession, PickupSelector, PlayerId,
    Relay, RelayStats, Transform,
};

use crate::config::SimConfig;

const HOLD_SECONDS: f32 = 2.0;
const REST_SECONDS: f32 = 1.0;

/// Several sessions sharing one relay, each running a scripted player that
/// grabs a box, swings it around and lets go.
pub struct Room {
    relay: Relay,
    peers: Vec<Peer>,
    boxes: Vec<BodyId>,
    elapsed: f32,
}

struct Peer {
    session: PhysicsSession,
    phase_offset: f32,
    target_box: usize,
}

#[derive(Debug, Default)]
pub struct Report {
    pub frames: u64,
    pub holds: usize,
    pub max_divergence: f32,
    pub relay: RelayStats,
}

impl Room {
    pub fn new(peer_count: usize, box_count: usize, config: &SimConfig) -> Result<Self> {
        let mut relay = Relay::new(config.relay.clone());
        let mut peers = Vec::with_capacity(peer_count);
        for i in 0..peer_count {
            let id = PlayerId::new(format!("p{}", i + 1));
            relay.join(id.clone());
            peers.push(Peer {
                session: PhysicsSession::new(id, config.session.clone()),
                phase_offset: i as f32 * 0.7,
                target_box: if box_count == 0 { 0 } else { i % box_count },
            });
        }

        let mut room = Self {
            relay,
            peers,
            boxes: Vec::new(),
            elapsed: 0.0,
        };
        room.spawn_boxes(box_count)?;
        Ok(room)
    }

    fn spawn_boxes(&mut self, count: usize) -> Result<()> {
        let Some(host) = self.peers.first_mut() else {
            return Ok(());
        };
        for i in 0..count {
            let x = (i as f32 - count as f32 / 2.0) * 1.5;
            let command = PhysicsCommand::Spawn {
                properties: BodyProperties::dynamic_box(Vec3::splat(0.4), 1.0 + i as f32)
                    .with_color(0x3366ff + (i as u32) * 0x1100),
                transform: Transform::from_position(Vec3::new(x, 0.5, -4.0)),
                id: None,
            };
            if let Some(id) = host.session.handle_command(command)? {
                self.boxes.push(id);
            }
        }
        self.pump()?;
        Ok(())
    }

    pub fn frame(&mut self, delta: f32) -> Result<()> {
        self.elapsed += delta;
        let elapsed = self.elapsed;
        let boxes = &self.boxes;

        for peer in &mut self.peers {
            peer.script(boxes, elapsed);
            peer.session.frame(delta);
        }
        self.pump()
    }

    fn pump(&mut self) -> Result<()> {
        for peer in &mut self.peers {
            let from = peer.session.local_id().clone();
            for outbound in peer.session.drain_outbound() {
                self.relay.send(&from, &outbound)?;
            }
        }
        for peer in &mut self.peers {
            let me = peer.session.local_id().clone();
            for inbound in self.relay.receive(&me) {
                peer.session.handle_inbound(inbound);
            }
        }
        Ok(())
    }

    /// Largest distance between the first peer's view of a free body and any
    /// other peer's view of it.
    pub fn divergence(&self) -> f32 {
        let Some((reference, others)) = self.peers.split_first() else {
            return 0.0;
        };
        let mut worst = 0.0f32;
        for id in &self.boxes {
            if reference.session.ownership(id) != Ownership::Free {
                continue;
            }
            let Some(truth) = body_position(&reference.session, id) else {
                continue;
            };
            for peer in others {
                if let Some(seen) = body_position(&peer.session, id) {
                    worst = worst.max((seen - truth).length());
                }
            }
        }
        worst
    }

    pub fn report(&self) -> Report {
        Report {
            frames: self.peers.first().map_or(0, |p| p.session.frames()),
            holds: self
                .peers
                .iter()
                .filter(|p| p.session.held().is_some())
                .count(),
            max_divergence: self.divergence(),
            relay: self.relay.stats().clone(),
        }
    }
}

impl Peer {
    fn script(&mut self, boxes: &[BodyId], elapsed: f32) {
        let Some(target) = boxes.get(self.target_box) else {
            return;
        };
        let cycle = HOLD_SECONDS + REST_SECONDS;
        let local = (elapsed + self.phase_offset) % cycle;
        let eye = Vec3::new(self.phase_offset, 1.7, 0.0);

        let _ = self
            .session
            .handle_command(PhysicsCommand::PublishPose(Transform::from_position(eye)));

        if local < HOLD_SECONDS {
            if self.session.held().is_none() {
                let pickup = PhysicsCommand::Pickup(PickupSelector::Id(target.clone()));
                if let Err(err) = self.session.handle_command(pickup) {
                    log::debug!("{} could not grab {}: {}", self.session.local_id(), target, err);
                    return;
                }
            }
            let angle = local / HOLD_SECONDS * TAU;
            let aim = eye + Vec3::new(angle.cos() * 2.0, 0.5 * angle.sin(), -3.0);
            let _ = self.session.handle_command(PhysicsCommand::UpdateTarget(Transform::new(
                aim,
                Quat::from_rotation_y(angle),
            )));
        } else if self.session.held().is_some() {
            let _ = self.session.handle_command(PhysicsCommand::Throw {
                impulse: Vec3::new(0.0, 0.2, -0.3),
            });
            self.target_box = (self.target_box + 1) % boxes.len();
        }
    }
}

fn body_position(session: &PhysicsSession, id: &BodyId) -> Option<Vec3> {
    let ctx = session.context();
    ctx.world.body_position(ctx.registry.handle(id)?)
}
