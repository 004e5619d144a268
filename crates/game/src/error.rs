use crate::ids::{BodyId, PlayerId};
use crate::ownership::Holder;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PickupError {
    #[error("already holding {0}")]
    AlreadyHolding(BodyId),
    #[error("unknown body {0}")]
    UnknownBody(BodyId),
    #[error("body {0} is static")]
    StaticBody(BodyId),
    #[error("body {body} is held by {holder}")]
    HeldByRemote { body: BodyId, holder: PlayerId },
    #[error("claim on {body} lost to {holder}")]
    Contended { body: BodyId, holder: Holder },
    #[error("pickup ray has no direction")]
    DegenerateRay,
    #[error("pickup ray hit nothing")]
    NoHit,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForceError {
    #[error("unknown body {0}")]
    UnknownBody(BodyId),
    #[error("body {0} is static")]
    StaticBody(BodyId),
    #[error("body {body} is held by {holder}")]
    HeldByRemote { body: BodyId, holder: PlayerId },
    #[error("force is not finite")]
    NonFinite,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PhysicsError {
    #[error(transparent)]
    Pickup(#[from] PickupError),
    #[error(transparent)]
    Force(#[from] ForceError),
    #[error("nothing is held")]
    NotHolding,
}
