//! Door travel model

use rollgate_common::DriveState;

/// Fully open position in drive units
pub const POSITION_OPEN: f32 = 200.0;
/// Half-open stop position
pub const POSITION_HALF: f32 = 100.0;
/// Ventilation stop position, a small gap above closed
pub const POSITION_VENT: f32 = 20.0;
/// Travel speed in drive units per millisecond (full travel in 4 seconds)
const SPEED: f32 = 0.05;

#[derive(Copy, Clone, Debug, PartialEq)]
enum Motion {
    Stopped,
    ToOpen,
    ToClosed,
    ToHalf,
    ToVent,
}

/// A door on a constant-speed drive with fixed stop positions
///
/// Positions run 0.0 (closed) to 200.0 (open), matching the byte the drive
/// reports. Time advances only through [`tick`](DoorPhysics::tick).
#[derive(Debug)]
pub struct DoorPhysics {
    position: f32,
    motion: Motion,
    light_on: bool,
}

impl DoorPhysics {
    /// A closed door with the light off
    pub fn new() -> Self {
        Self {
            position: 0.0,
            motion: Motion::Stopped,
            light_on: false,
        }
    }

    /// Advance the model by `dt_ms` milliseconds
    pub fn tick(&mut self, dt_ms: u32) {
        let target = match self.motion {
            Motion::Stopped => return,
            Motion::ToOpen => POSITION_OPEN,
            Motion::ToClosed => 0.0,
            Motion::ToHalf => POSITION_HALF,
            Motion::ToVent => POSITION_VENT,
        };
        let step = SPEED * dt_ms as f32;
        if (self.position - target).abs() <= step {
            self.position = target;
            self.motion = Motion::Stopped;
        } else if target > self.position {
            self.position += step;
        } else {
            self.position -= step;
        }
    }

    /// Start opening fully
    pub fn open(&mut self) {
        self.motion = Motion::ToOpen;
    }

    /// Start closing fully
    pub fn close(&mut self) {
        self.motion = Motion::ToClosed;
    }

    /// Halt where the door is
    pub fn stop(&mut self) {
        self.motion = Motion::Stopped;
    }

    /// Start moving to the half-open stop
    pub fn half_open(&mut self) {
        self.motion = Motion::ToHalf;
    }

    /// Start moving to the ventilation stop
    pub fn vent(&mut self) {
        self.motion = Motion::ToVent;
    }

    /// Toggle the drive's built-in light
    pub fn toggle_light(&mut self) {
        self.light_on = !self.light_on;
    }

    /// Position as the drive reports it, 0 to 200
    pub fn position_byte(&self) -> u8 {
        self.position.round().clamp(0.0, 200.0) as u8
    }

    /// Position the current motion is heading for
    pub fn target_byte(&self) -> u8 {
        let target = match self.motion {
            Motion::Stopped => self.position,
            Motion::ToOpen => POSITION_OPEN,
            Motion::ToClosed => 0.0,
            Motion::ToHalf => POSITION_HALF,
            Motion::ToVent => POSITION_VENT,
        };
        target.round().clamp(0.0, 200.0) as u8
    }

    /// Whether the light is on
    pub fn light_on(&self) -> bool {
        self.light_on
    }

    /// The state code the drive would broadcast right now
    pub fn drive_state(&self) -> DriveState {
        match self.motion {
            Motion::ToOpen => DriveState::Opening,
            Motion::ToClosed => DriveState::Closing,
            Motion::ToHalf => DriveState::MoveHalf,
            Motion::ToVent => DriveState::MoveVenting,
            Motion::Stopped => {
                if self.position >= POSITION_OPEN {
                    DriveState::Open
                } else if self.position <= 0.0 {
                    DriveState::Closed
                } else if self.position == POSITION_HALF {
                    DriveState::HalfOpenReached
                } else if self.position == POSITION_VENT {
                    DriveState::VentReached
                } else {
                    DriveState::Stopped
                }
            }
        }
    }
}

impl Default for DoorPhysics {
    fn default() -> Self {
        Self::new()
    }
}
