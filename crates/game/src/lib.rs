pub mod context;
pub mod error;
pub mod hold;
pub mod ids;
pub mod interp;
pub mod net;
pub mod ownership;
pub mod physics;
pub mod registry;
pub mod session;

pub use context::PhysicsContext;
pub use error::{ForceError, PhysicsError, PickupError};
pub use hold::{HeldObjectController, HoldConfig, PickupSelector};
pub use ids::{BodyId, PlayerId};
pub use interp::{InterpolationConfig, RemoteEntityInterpolator, RemoteTransform, TrackedId};
pub use net::{
    BodyState, Channel, CodecError, Inbound, NetworkSyncBridge, OutboundMessage, OutboundQueue,
    Payload, PhysicsMessage, Relay, RelayConfig, RelayStats, ReliabilityMode, SyncConfig,
};
pub use ownership::{ClaimOutcome, HoldState, Holder, Ownership, OwnershipArbiter};
pub use physics::{
    BodyKinematics, BodyProperties, BodyShape, FixedTimestep, PhysicsWorld, Transform,
    WorldConfig,
};
pub use registry::{BodyRegistry, PhysicsBody, RenderProxy};
pub use session::{CommandBuffer, PhysicsCommand, PhysicsSession, SessionConfig};
