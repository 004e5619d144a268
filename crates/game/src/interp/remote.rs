use std::collections::{HashMap, HashSet};

use crate::ids::{BodyId, PlayerId};
use crate::physics::Transform;

use super::InterpolationConfig;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackedId {
    Player(PlayerId),
    Body(BodyId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoteTransform {
    pub current: Transform,
    pub target: Transform,
}

impl RemoteTransform {
    fn snapped(target: Transform) -> Self {
        Self {
            current: target,
            target,
        }
    }

    fn advance(&mut self, t: f32) {
        self.current.position = self.current.position.lerp(self.target.position, t);
        self.current.orientation = self
            .current
            .orientation
            .slerp(self.target.orientation, t)
            .normalize();
    }
}

#[derive(Debug, Default)]
pub struct RemoteEntityInterpolator {
    config: InterpolationConfig,
    entries: HashMap<TrackedId, RemoteTransform>,
}

impl RemoteEntityInterpolator {
    pub fn new(config: InterpolationConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
        }
    }

    /// The first target for a key is adopted as-is so the entity does not
    /// sweep in from the origin.
    pub fn update_target(&mut self, key: TrackedId, target: Transform) -> bool {
        if !target.is_finite() {
            log::warn!("ignoring non-finite target for {:?}", key);
            return false;
        }
        let target = target.normalized();
        self.entries
            .entry(key)
            .and_modify(|entry| entry.target = target)
            .or_insert_with(|| RemoteTransform::snapped(target));
        true
    }

    pub fn advance(&mut self, delta: f32) {
        if !delta.is_finite() || delta <= 0.0 {
            return;
        }
        let t = (delta * self.config.rate).min(1.0);
        for entry in self.entries.values_mut() {
            entry.advance(t);
        }
    }

    pub fn get(&self, key: &TrackedId) -> Option<&RemoteTransform> {
        self.entries.get(key)
    }

    pub fn current(&self, key: &TrackedId) -> Option<Transform> {
        self.entries.get(key).map(|entry| entry.current)
    }

    pub fn remove(&mut self, key: &TrackedId) -> Option<RemoteTransform> {
        self.entries.remove(key)
    }

    pub fn retain_players(&mut self, connected: &HashSet<PlayerId>) {
        self.entries.retain(|key, _| match key {
            TrackedId::Player(player) => connected.contains(player),
            TrackedId::Body(_) => true,
        });
    }

    pub fn players(&self) -> impl Iterator<Item = (&PlayerId, &RemoteTransform)> {
        self.entries.iter().filter_map(|(key, entry)| match key {
            TrackedId::Player(player) => Some((player, entry)),
            TrackedId::Body(_) => None,
        })
    }

    pub fn bodies(&self) -> impl Iterator<Item = (&BodyId, &RemoteTransform)> {
        self.entries.iter().filter_map(|(key, entry)| match key {
            TrackedId::Body(body) => Some((body, entry)),
            TrackedId::Player(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
