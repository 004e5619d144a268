mod config;
mod timestep;
mod types;
mod world;

pub use config::WorldConfig;
pub use timestep::FixedTimestep;
pub use types::{BodyKinematics, BodyProperties, BodyShape, Transform};
pub use world::PhysicsWorld;
