//! A library to bridge roller-door drive controllers onto a host automation stack
//!
//! Rollgate-bridge implements the unit side of the half-duplex RS-485 bus a
//! class of roller-shutter and garage-door drives use to talk to wall units.
//! It is intended to run on microcontrollers, is no_std compatible, and
//! performs no heap allocation. The drive is the bus master: it broadcasts
//! status and polls the unit, so the bridge's job is to answer polls within
//! the bus turnaround window while host tasks stage commands and read
//! telemetry concurrently. It provides the following pieces:
//!
//! * A [`Bridge`] transport driver which assembles inactivity-delimited
//!   frames, drives the RS-485 direction line around responses, and hands
//!   each frame to a protocol engine exactly once.
//! * The [`ProtocolEngine`] seam, plus [`DriveProtocol`], the register
//!   protocol engine for the supported drive family.
//! * A [`CommandSender`] for host tasks to stage commands into the shared
//!   state block with a bounded lock-retry budget.
//! * Entity [`adapters`](adapter) mapping telemetry snapshots to cover,
//!   light, and ventilation semantics.
//!
//! # Getting started
//!
//! The platform owns the UART, the direction-control GPIO, and the clock,
//! exposed through the [`BusHal`](common::BusHal) trait, plus one
//! [`SharedState`](common::SharedState) block with process lifetime:
//!
//! ```ignore
//! static SHARED: SharedState = SharedState::new();
//!
//! // On the transceiver task (or coprocessor main loop):
//! let mut bridge = Bridge::new(hal, DriveProtocol::new(), &SHARED);
//! loop {
//!     bridge.poll();
//!     platform::delay_ms(1); // yield so the transport never starves others
//! }
//! ```
//!
//! Host tasks never touch the lock directly; they stage commands through a
//! [`CommandSender`] and read [`SharedState::snapshot`](common::SharedState)
//! for display:
//!
//! ```ignore
//! let mut commands = CommandSender::new(&SHARED, platform::delay());
//! if let Err(e) = commands.set_command(CommandCode::Open) {
//!     // dropped on contention; safe to retry on the next UI event
//!     warn!("open request dropped: {e}");
//! }
//! ```
#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod adapter;
mod command;
mod engine;
mod protocol;
mod transport;

pub use rollgate_common as common;

pub use command::{CommandError, CommandSender, LOCK_RETRY_ATTEMPTS, LOCK_RETRY_DELAY_US};
pub use engine::{DispatchError, ProtocolEngine};
pub use protocol::DriveProtocol;
pub use transport::{Bridge, BridgeCounters, FRAME_GAP_MS, RX_BUFFER_SIZE, TX_SETTLE_DELAY_US};
