mod bridge;
mod config;
mod protocol;
mod queue;
mod relay;

pub use bridge::NetworkSyncBridge;
pub use config::SyncConfig;
pub use protocol::{BodyState, CodecError, Inbound, PLAYER_MOVE_TTL_MS, PhysicsMessage};
pub use queue::{OutboundMessage, OutboundQueue, ReliabilityMode};
pub use relay::{Channel, Payload, Relay, RelayConfig, RelayStats};
