//! Common functionality shared among other rollgate crates.
//!
//! This crate holds everything that crosses a boundary in the bridge: the code
//! values stored in shared memory and sent on the wire ([`codes`]), the
//! fixed-layout [`SharedState`] block exchanged between the transceiver task
//! and host tasks, the register-frame codec ([`frame`]) used by both the
//! bridge's protocol engine and the drive-side test tooling, and the hardware
//! access traits ([`traits`]) the transport driver is written against.
#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs, missing_copy_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod codes;
pub mod frame;
mod shared_state;
pub mod traits;

pub use codes::{CommandCode, DriveState, Owner};
pub use shared_state::{SharedState, StateGuard, Telemetry};
pub use traits::{BusHal, FlushTimeout};
