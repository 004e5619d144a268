mod command;
mod config;
mod driver;

pub use command::{CommandBuffer, PhysicsCommand};
pub use config::SessionConfig;
pub use driver::PhysicsSession;
