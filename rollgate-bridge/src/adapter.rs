//! Entity adapters over telemetry snapshots
//!
//! Host integrations rarely want raw drive registers. These adapters map
//! [`Telemetry`] snapshots onto cover, light, and ventilation semantics, with
//! change detection so callers only publish when something moved. They hold
//! no reference to the shared block; feed them `SharedState::snapshot()`
//! output from wherever the host task runs.

use rollgate_common::{CommandCode, DriveState, Telemetry};

/// Full travel in drive position units
const FULL_TRAVEL: f32 = 200.0;

/// Whether a snapshot is older than `max_age_ms` at time `now_ms`
///
/// The drive broadcasts status continuously while powered, so a stale
/// snapshot means the bus or the drive is down and entities should report
/// unavailable rather than repeat the last reading.
pub fn is_stale(telemetry: &Telemetry, now_ms: u32, max_age_ms: u32) -> bool {
    now_ms.wrapping_sub(telemetry.last_update_ms) > max_age_ms
}

/// Direction of travel, as a cover entity reports it
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoverOperation {
    /// Travelling towards open
    Opening,
    /// Travelling towards closed
    Closing,
    /// Not moving
    Idle,
}

/// What a host cover entity asks of the drive
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoverRequest {
    /// Halt travel where it is
    Stop,
    /// Travel to a position, 0.0 closed to 1.0 open
    Position(f32),
}

/// Cover entity state derived from one telemetry snapshot
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CoverState {
    /// Position, 0.0 closed to 1.0 open
    pub position: f32,
    /// Current direction of travel
    pub operation: CoverOperation,
}

/// Maps telemetry to cover state and cover requests to drive commands
#[derive(Debug, Default)]
pub struct CoverAdapter {
    last: Option<CoverState>,
}

impl CoverAdapter {
    /// Create an adapter that reports the first snapshot as a change
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Derive cover state; `Some` only when it differs from the last report
    pub fn update(&mut self, telemetry: &Telemetry) -> Option<CoverState> {
        let operation = match telemetry.state {
            DriveState::Opening | DriveState::MoveHalf | DriveState::MoveVenting => {
                CoverOperation::Opening
            }
            DriveState::Closing => CoverOperation::Closing,
            _ => CoverOperation::Idle,
        };
        let state = CoverState {
            position: telemetry.position as f32 / FULL_TRAVEL,
            operation,
        };
        if self.last == Some(state) {
            return None;
        }
        self.last = Some(state);
        Some(state)
    }

    /// Translate a cover request into the drive command that realizes it
    ///
    /// The drive only targets its three built-in stops, so positions snap to
    /// closed, half, or open.
    pub fn command_for(&self, request: CoverRequest) -> CommandCode {
        match request {
            CoverRequest::Stop => CommandCode::Stop,
            CoverRequest::Position(p) if p >= 0.995 => CommandCode::Open,
            CoverRequest::Position(p) if p <= 0.005 => CommandCode::Close,
            CoverRequest::Position(_) => CommandCode::HalfOpen,
        }
    }
}

/// Maps telemetry to the drive's built-in light
///
/// The drive only exposes a toggle, so turning the light to a desired state
/// requires knowing the reported one.
#[derive(Debug, Default)]
pub struct LightAdapter {
    last: Option<bool>,
}

impl LightAdapter {
    /// Create an adapter that reports the first snapshot as a change
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Light state; `Some` only when it differs from the last report
    pub fn update(&mut self, telemetry: &Telemetry) -> Option<bool> {
        if self.last == Some(telemetry.light_on) {
            return None;
        }
        self.last = Some(telemetry.light_on);
        Some(telemetry.light_on)
    }

    /// Command needed to reach `desired`, if the reported state differs
    pub fn command_to_set(&self, telemetry: &Telemetry, desired: bool) -> Option<CommandCode> {
        (telemetry.light_on != desired).then_some(CommandCode::ToggleLight)
    }
}

/// Maps telemetry to the ventilation position as an on/off entity
#[derive(Debug, Default)]
pub struct VentAdapter {
    last: Option<bool>,
}

impl VentAdapter {
    /// Create an adapter that reports the first snapshot as a change
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Whether the drive holds the vent position; `Some` on change only
    pub fn update(&mut self, telemetry: &Telemetry) -> Option<bool> {
        let venting = telemetry.state == DriveState::VentReached;
        if self.last == Some(venting) {
            return None;
        }
        self.last = Some(venting);
        Some(venting)
    }

    /// Command that moves the drive to or away from the vent position
    pub fn command_to_set(&self, enable: bool) -> CommandCode {
        if enable {
            CommandCode::Vent
        } else {
            CommandCode::Close
        }
    }
}
