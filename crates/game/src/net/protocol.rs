use glam::{Quat, Vec3};
use rkyv::rancor;
use rkyv::util::AlignedVec;
use serde::{Deserialize, Serialize};

use crate::ids::{BodyId, PlayerId};
use crate::physics::{BodyKinematics, BodyProperties, Transform};

use super::queue::ReliabilityMode;

pub const PLAYER_MOVE_TTL_MS: u64 = 250;

/// One body in a `physics:state` broadcast. Orientation is `[x, y, z, w]`.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[serde(rename_all = "camelCase")]
#[rkyv(derive(Debug))]
pub struct BodyState {
    pub id: BodyId,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub velocity: [f32; 3],
    pub angular_velocity: [f32; 3],
    pub properties: BodyProperties,
}

impl BodyState {
    pub fn new(id: BodyId, state: &BodyKinematics, properties: BodyProperties) -> Self {
        Self {
            id,
            position: state.position.to_array(),
            rotation: state.orientation.to_array(),
            velocity: state.linear_velocity.to_array(),
            angular_velocity: state.angular_velocity.to_array(),
            properties,
        }
    }

    pub fn kinematics(&self) -> BodyKinematics {
        BodyKinematics {
            position: Vec3::from_array(self.position),
            orientation: Quat::from_array(self.rotation),
            linear_velocity: Vec3::from_array(self.velocity),
            angular_velocity: Vec3::from_array(self.angular_velocity),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.rotation.iter().all(|v| v.is_finite())
            && self.velocity.iter().all(|v| v.is_finite())
            && self.angular_velocity.iter().all(|v| v.is_finite())
    }
}

#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[serde(tag = "type", content = "data", rename_all_fields = "camelCase")]
#[rkyv(derive(Debug))]
pub enum PhysicsMessage {
    #[serde(rename = "physics:object-created")]
    ObjectCreated {
        id: BodyId,
        position: [f32; 3],
        rotation: [f32; 4],
        properties: BodyProperties,
    },
    #[serde(rename = "physics:object-removed")]
    ObjectRemoved { id: BodyId },
    #[serde(rename = "physics:object-pickup")]
    ObjectPickup { id: BodyId, player_id: PlayerId },
    #[serde(rename = "physics:object-drop")]
    ObjectDrop { id: BodyId, player_id: PlayerId },
    #[serde(rename = "physics:apply-force")]
    ApplyForce {
        id: BodyId,
        force: [f32; 3],
        player_id: PlayerId,
    },
    #[serde(rename = "physics:state", alias = "physics:state-update")]
    State { objects: Vec<BodyState> },
    #[serde(rename = "player:move")]
    PlayerMove {
        player_id: PlayerId,
        position: [f32; 3],
        rotation: [f32; 4],
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("binary serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("binary deserialization failed: {0}")]
    Deserialize(rancor::Error),
}

impl PhysicsMessage {
    pub fn object_created(id: BodyId, transform: Transform, properties: BodyProperties) -> Self {
        Self::ObjectCreated {
            id,
            position: transform.position.to_array(),
            rotation: transform.orientation.to_array(),
            properties,
        }
    }

    pub fn player_move(player_id: PlayerId, transform: Transform) -> Self {
        Self::PlayerMove {
            player_id,
            position: transform.position.to_array(),
            rotation: transform.orientation.to_array(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ObjectCreated { .. } => "physics:object-created",
            Self::ObjectRemoved { .. } => "physics:object-removed",
            Self::ObjectPickup { .. } => "physics:object-pickup",
            Self::ObjectDrop { .. } => "physics:object-drop",
            Self::ApplyForce { .. } => "physics:apply-force",
            Self::State { .. } => "physics:state",
            Self::PlayerMove { .. } => "player:move",
        }
    }

    /// Snapshots and player poses are superseded by the next one, so they may
    /// be lost; ownership and lifecycle changes may not.
    pub fn reliability(&self) -> ReliabilityMode {
        match self {
            Self::State { .. } => ReliabilityMode::Unreliable,
            Self::PlayerMove { .. } => ReliabilityMode::UnreliableExpiring {
                ttl_ms: PLAYER_MOVE_TTL_MS,
            },
            _ => ReliabilityMode::Reliable,
        }
    }

    pub fn to_json(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, CodecError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(CodecError::Serialize)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        let mut aligned = AlignedVec::<16>::with_capacity(data.len());
        aligned.extend_from_slice(data);
        rkyv::from_bytes::<Self, rancor::Error>(&aligned).map_err(CodecError::Deserialize)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Message { from: PlayerId, message: PhysicsMessage },
    PeerLeft(PlayerId),
}

/// Reads a wire pose, falling back to identity rotation for a zero quaternion.
pub fn wire_transform(position: [f32; 3], rotation: [f32; 4]) -> Transform {
    Transform::new(Vec3::from_array(position), Quat::from_array(rotation)).normalized()
}
