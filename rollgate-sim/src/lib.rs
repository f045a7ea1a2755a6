//! Drive-side simulator
//!
//! Plays the bus-master role a real drive controller performs, against a
//! bridge under test: periodic bus scans, status broadcasts, and command
//! polls, backed by a small door physics model. Std-only; this crate exists
//! for integration tests and host-side experiments, not for targets.

mod master;
mod physics;

pub use master::{DriveAction, DriveMaster};
pub use physics::DoorPhysics;
