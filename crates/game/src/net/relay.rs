use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::ids::PlayerId;

use super::protocol::{CodecError, Inbound, PhysicsMessage};
use super::queue::OutboundMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Relayed, ordered, never lost. Carries JSON text.
    Reliable,
    /// Direct peer link that may drop. Carries the binary encoding.
    Unreliable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn encode(message: &PhysicsMessage, channel: Channel) -> Result<Self, CodecError> {
        match channel {
            Channel::Reliable => message.to_json().map(Self::Text),
            Channel::Unreliable => message.to_bytes().map(Self::Binary),
        }
    }

    pub fn decode(&self) -> Result<PhysicsMessage, CodecError> {
        match self {
            Self::Text(text) => PhysicsMessage::from_json(text),
            Self::Binary(bytes) => PhysicsMessage::from_bytes(bytes),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Chance, in percent, that an unreliable payload is lost.
    pub loss_percent: f32,
    pub seed: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            loss_percent: 0.0,
            seed: 0x5eed,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    pub payloads_sent: u64,
    pub payloads_delivered: u64,
    pub payloads_lost: u64,
    pub bytes_sent: u64,
    pub decode_failures: u64,
}

enum Event {
    Payload { from: PlayerId, payload: Payload },
    PeerLeft(PlayerId),
}

pub struct Relay {
    config: RelayConfig,
    inboxes: BTreeMap<PlayerId, VecDeque<Event>>,
    rng: u64,
    stats: RelayStats,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            rng: config.seed.max(1),
            config,
            inboxes: BTreeMap::new(),
            stats: RelayStats::default(),
        }
    }

    pub fn join(&mut self, player: PlayerId) -> bool {
        if self.inboxes.contains_key(&player) {
            return false;
        }
        log::debug!("{} joined the relay", player);
        self.inboxes.insert(player, VecDeque::new());
        true
    }

    pub fn leave(&mut self, player: &PlayerId) -> bool {
        if self.inboxes.remove(player).is_none() {
            return false;
        }
        log::debug!("{} left the relay", player);
        for inbox in self.inboxes.values_mut() {
            inbox.push_back(Event::PeerLeft(player.clone()));
        }
        true
    }

    pub fn peers(&self) -> impl Iterator<Item = &PlayerId> {
        self.inboxes.keys()
    }

    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    pub fn send(&mut self, from: &PlayerId, outbound: &OutboundMessage) -> Result<(), CodecError> {
        let channel = if outbound.reliability.is_reliable() {
            Channel::Reliable
        } else {
            Channel::Unreliable
        };
        let payload = Payload::encode(&outbound.message, channel)?;
        self.broadcast(from, channel, payload);
        Ok(())
    }

    pub fn broadcast(&mut self, from: &PlayerId, channel: Channel, payload: Payload) {
        let targets: Vec<PlayerId> = self
            .inboxes
            .keys()
            .filter(|peer| *peer != from)
            .cloned()
            .collect();

        self.stats.payloads_sent += 1;
        self.stats.bytes_sent += payload.len() as u64;

        for target in targets {
            if channel == Channel::Unreliable && self.should_drop() {
                self.stats.payloads_lost += 1;
                log::trace!("dropped payload {} -> {}", from, target);
                continue;
            }
            if let Some(inbox) = self.inboxes.get_mut(&target) {
                inbox.push_back(Event::Payload {
                    from: from.clone(),
                    payload: payload.clone(),
                });
            }
        }
    }

    /// Everything waiting for `player`, decoded. Undecodable payloads are
    /// counted and skipped.
    pub fn receive(&mut self, player: &PlayerId) -> Vec<Inbound> {
        let Some(inbox) = self.inboxes.get_mut(player) else {
            return Vec::new();
        };
        let events: Vec<Event> = inbox.drain(..).collect();

        let mut inbound = Vec::with_capacity(events.len());
        for event in events {
            match event {
                Event::Payload { from, payload } => match payload.decode() {
                    Ok(message) => {
                        self.stats.payloads_delivered += 1;
                        inbound.push(Inbound::Message { from, message });
                    }
                    Err(err) => {
                        self.stats.decode_failures += 1;
                        log::warn!("undecodable payload from {}: {}", from, err);
                    }
                },
                Event::PeerLeft(peer) => inbound.push(Inbound::PeerLeft(peer)),
            }
        }
        inbound
    }

    fn should_drop(&mut self) -> bool {
        self.config.loss_percent > 0.0 && self.rand_percent() < self.config.loss_percent
    }

    fn rand_percent(&mut self) -> f32 {
        // xorshift64
        self.rng ^= self.rng << 13;
        self.rng ^= self.rng >> 7;
        self.rng ^= self.rng << 17;
        (self.rng % 10_000) as f32 / 100.0
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(RelayConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::OutboundQueue;
    use crate::physics::Transform;

    fn relay_with(players: &[&str], config: RelayConfig) -> Relay {
        let mut relay = Relay::new(config);
        for player in players {
            relay.join(PlayerId::from(*player));
        }
        relay
    }

    fn outbound(message: PhysicsMessage) -> OutboundMessage {
        let mut queue = OutboundQueue::default();
        queue.push(0, message);
        queue.drain().remove(0)
    }

    #[test]
    fn fans_out_to_everyone_else() {
        let mut relay = relay_with(&["p1", "p2", "p3"], RelayConfig::default());
        let message = PhysicsMessage::ObjectDrop {
            id: "a".into(),
            player_id: "p1".into(),
        };
        relay.send(&"p1".into(), &outbound(message.clone())).unwrap();

        assert!(relay.receive(&"p1".into()).is_empty());
        for peer in ["p2", "p3"] {
            assert_eq!(
                relay.receive(&peer.into()),
                vec![Inbound::Message {
                    from: "p1".into(),
                    message: message.clone()
                }]
            );
        }
    }

    #[test]
    fn loss_only_hits_unreliable_payloads() {
        let config = RelayConfig {
            loss_percent: 100.0,
            ..Default::default()
        };
        let mut relay = relay_with(&["p1", "p2"], config);
        relay
            .send(
                &"p1".into(),
                &outbound(PhysicsMessage::player_move("p1".into(), Transform::IDENTITY)),
            )
            .unwrap();
        relay
            .send(
                &"p1".into(),
                &outbound(PhysicsMessage::ObjectRemoved { id: "a".into() }),
            )
            .unwrap();

        let received = relay.receive(&"p2".into());
        assert_eq!(received.len(), 1);
        assert_eq!(relay.stats().payloads_lost, 1);
    }

    #[test]
    fn leaving_is_announced() {
        let mut relay = relay_with(&["p1", "p2"], RelayConfig::default());
        assert!(relay.leave(&"p1".into()));
        assert!(!relay.leave(&"p1".into()));
        assert_eq!(
            relay.receive(&"p2".into()),
            vec![Inbound::PeerLeft("p1".into())]
        );
    }

    #[test]
    fn corrupt_payload_is_skipped() {
        let mut relay = relay_with(&["p1", "p2"], RelayConfig::default());
        relay.broadcast(
            &"p1".into(),
            Channel::Reliable,
            Payload::Text("{not json".to_owned()),
        );
        assert!(relay.receive(&"p2".into()).is_empty());
        assert_eq!(relay.stats().decode_failures, 1);
    }
}
