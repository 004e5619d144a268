mod arbiter;

pub use arbiter::{ClaimOutcome, HoldState, Holder, Ownership, OwnershipArbiter};
