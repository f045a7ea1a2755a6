//! Code values crossing the shared-memory and wire boundaries
//!
//! All values here are stable across restarts: the owner tag and command code
//! live in a memory block that may be shared with an independently booted
//! coprocessor, and the drive state codes come straight off the bus.

use int_enum::IntEnum;

/// Tag identifying which execution context currently holds the shared block
#[derive(Copy, Clone, Debug, PartialEq, Eq, IntEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Owner {
    /// Nobody holds the block; the only value a new acquirer may transition from
    Free = 0,
    /// A host task (entity adapters staging commands)
    Host = 1,
    /// The transceiver task
    Transport = 2,
}

/// Command staged by a host task for the drive
///
/// Written into the shared block by the command injection API, consumed and
/// reset to [`CommandCode::None`] by the protocol engine once the drive has
/// been given the full press/release sequence.
#[derive(Copy, Clone, Debug, PartialEq, Eq, IntEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandCode {
    /// No command staged
    None = 0,
    /// Drive fully open
    Open = 1,
    /// Drive fully closed
    Close = 2,
    /// Halt movement
    Stop = 3,
    /// Drive to the half-open position
    HalfOpen = 4,
    /// Drive to the ventilation position
    Vent = 5,
    /// Toggle the drive's light
    ToggleLight = 6,
}

/// Drive state codes as reported in status-update broadcasts
///
/// The drive emits more codes than are listed here; anything unmapped decodes
/// as [`DriveState::Stopped`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DriveState {
    /// Idle, position held
    Stopped = 0x00,
    /// Moving towards open
    Opening = 0x01,
    /// Moving towards closed
    Closing = 0x02,
    /// Moving towards the half-open position
    MoveHalf = 0x05,
    /// Moving towards the ventilation position
    MoveVenting = 0x09,
    /// Ventilation position reached
    VentReached = 0x0A,
    /// Fully open
    Open = 0x20,
    /// Fully closed
    Closed = 0x40,
    /// Half-open position reached
    HalfOpenReached = 0x80,
}

impl From<u8> for DriveState {
    fn from(val: u8) -> Self {
        match val {
            0x01 => DriveState::Opening,
            0x02 => DriveState::Closing,
            0x05 => DriveState::MoveHalf,
            0x09 => DriveState::MoveVenting,
            0x0A => DriveState::VentReached,
            0x20 => DriveState::Open,
            0x40 => DriveState::Closed,
            0x80 => DriveState::HalfOpenReached,
            _ => DriveState::Stopped,
        }
    }
}
