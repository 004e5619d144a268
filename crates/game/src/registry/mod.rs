mod body;
mod store;

pub use body::{PhysicsBody, RenderProxy};
pub use store::BodyRegistry;
