mod config;
mod control;
mod controller;

pub use config::HoldConfig;
pub use control::{alignment_torque, spring_force};
pub use controller::{HeldObjectController, PickupSelector};
