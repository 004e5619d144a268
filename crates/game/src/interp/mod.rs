mod config;
mod remote;

pub use config::InterpolationConfig;
pub use remote::{RemoteEntityInterpolator, RemoteTransform, TrackedId};
