//! Bus-master behaviour of a simulated drive controller

use log::{debug, trace};
use rollgate_common::frame::{self, FrameError};

use crate::physics::DoorPhysics;

/// Milliseconds between bus-scan attempts while no unit has answered
const SCAN_INTERVAL_MS: u32 = 1000;
/// Milliseconds between command polls once a unit is on the bus
const POLL_INTERVAL_MS: u32 = 100;
/// Minimum spacing between the master's own transmissions
///
/// The unit delimits frames on a 10 ms inactivity gap; frames sent closer
/// together than that coalesce into one buffer on its side and fail CRC.
const FRAME_SPACING_MS: u32 = 15;

/// A command the drive decoded from a unit's poll response
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DriveAction {
    /// Travel to fully open
    Open,
    /// Travel to fully closed
    Close,
    /// Halt travel
    Stop,
    /// Travel to the half-open stop
    HalfOpen,
    /// Travel to the ventilation stop
    Vent,
    /// Toggle the built-in light
    ToggleLight,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Scanning,
    Announce,
    Polling,
}

/// A simulated drive controller running the master side of the bus
///
/// Drive it from a test loop: call [`poll`](Self::poll) with the virtual
/// clock to obtain the next frame to put on the wire, and feed every unit
/// response to [`handle_response`](Self::handle_response). Until a unit
/// answers a bus scan the master scans once a second; afterwards it
/// broadcasts status on every change and polls for commands at 100ms.
#[derive(Debug)]
pub struct DriveMaster {
    phase: Phase,
    physics: DoorPhysics,
    sync_counter: u8,
    last_tx_ms: Option<u32>,
    last_poll_ms: Option<u32>,
    last_tick_ms: u32,
    last_status: Option<(u8, u8, bool)>,
    last_action_regs: (u16, u16),
}

impl DriveMaster {
    /// A master with a closed door, before any unit has answered
    pub fn new() -> Self {
        Self {
            phase: Phase::Scanning,
            physics: DoorPhysics::new(),
            sync_counter: 0,
            last_tx_ms: None,
            last_poll_ms: None,
            last_tick_ms: 0,
            last_status: None,
            last_action_regs: (0, 0),
        }
    }

    /// The door model behind the drive
    pub fn physics(&self) -> &DoorPhysics {
        &self.physics
    }

    /// Mutable access, for tests that pose the door directly
    pub fn physics_mut(&mut self) -> &mut DoorPhysics {
        &mut self.physics
    }

    /// Advance the clock and return the next frame due, if any
    pub fn poll(&mut self, now_ms: u32) -> Option<Vec<u8>> {
        self.physics.tick(now_ms.wrapping_sub(self.last_tick_ms));
        self.last_tick_ms = now_ms;

        let elapsed = |since: Option<u32>, interval: u32| match since {
            None => true,
            Some(t) => now_ms.wrapping_sub(t) >= interval,
        };

        match self.phase {
            Phase::Scanning => {
                if elapsed(self.last_tx_ms, SCAN_INTERVAL_MS) {
                    self.last_tx_ms = Some(now_ms);
                    trace!("bus scan at {now_ms}ms");
                    return Some(self.scan_frame());
                }
                None
            }
            Phase::Announce => {
                if !elapsed(self.last_tx_ms, FRAME_SPACING_MS) {
                    return None;
                }
                self.phase = Phase::Polling;
                self.last_tx_ms = Some(now_ms);
                self.last_status = Some(self.current_status());
                Some(self.status_frame())
            }
            Phase::Polling => {
                // Leave the unit's inactivity delimiter between frames
                if !elapsed(self.last_tx_ms, FRAME_SPACING_MS) {
                    return None;
                }
                // The command poll runs on its own cadence so a run of
                // status changes during travel cannot starve it
                if elapsed(self.last_poll_ms, POLL_INTERVAL_MS) {
                    self.sync_counter = self.sync_counter.wrapping_add(1);
                    self.last_poll_ms = Some(now_ms);
                    self.last_tx_ms = Some(now_ms);
                    return Some(self.poll_frame());
                }
                let status = self.current_status();
                if self.last_status != Some(status) {
                    self.last_status = Some(status);
                    self.last_tx_ms = Some(now_ms);
                    debug!("status change: {status:?}");
                    return Some(self.status_frame());
                }
                None
            }
        }
    }

    /// Process a unit's response frame
    ///
    /// Returns the action decoded from a command poll, if the response
    /// carried a fresh button press.
    pub fn handle_response(&mut self, response: &[u8]) -> Result<Option<DriveAction>, FrameError> {
        let body = frame::verify(response)?;
        if body.len() < 3
            || body[0] != frame::ADDR_UNIT
            || body[1] != frame::FUNC_READ_WRITE_REGISTERS
        {
            return Ok(None);
        }
        let byte_count = body[2] as usize;
        let mut regs = [0u16; 8];
        let count = frame::decode_registers(&body[3..body.len().min(3 + byte_count)], &mut regs);

        // A five-register response is a unit identifying itself
        if count == 5 && self.phase == Phase::Scanning {
            debug!("unit answered bus scan");
            self.phase = Phase::Announce;
            return Ok(None);
        }

        if count == 8 {
            let pressed = (regs[2], regs[3]);
            if pressed != self.last_action_regs {
                self.last_action_regs = pressed;
                if let Some(action) = decode_press(pressed) {
                    debug!("decoded action {action:?}");
                    self.apply(action);
                    return Ok(Some(action));
                }
            }
        }
        Ok(None)
    }

    fn apply(&mut self, action: DriveAction) {
        match action {
            DriveAction::Open => self.physics.open(),
            DriveAction::Close => self.physics.close(),
            DriveAction::Stop => self.physics.stop(),
            DriveAction::HalfOpen => self.physics.half_open(),
            DriveAction::Vent => self.physics.vent(),
            DriveAction::ToggleLight => self.physics.toggle_light(),
        }
    }

    fn current_status(&self) -> (u8, u8, bool) {
        (
            self.physics.position_byte(),
            self.physics.drive_state() as u8,
            self.physics.light_on(),
        )
    }

    fn scan_frame(&self) -> Vec<u8> {
        let sync = u16::from_be_bytes([self.sync_counter, 0x02]);
        let mut buf = [0u8; 64];
        let len = frame::build_read_write_registers(
            &mut buf,
            frame::ADDR_UNIT,
            frame::REG_POLL,
            5,
            frame::REG_SYNC_COUNTER,
            &[sync, 0x0000, 0x0102],
        )
        .unwrap();
        buf[..len].to_vec()
    }

    fn status_frame(&self) -> Vec<u8> {
        let mut regs = [0u16; 9];
        regs[1] = u16::from_be_bytes([self.physics.target_byte(), self.physics.position_byte()]);
        regs[2] = u16::from_be_bytes([self.physics.drive_state() as u8, 0]);
        regs[6] = if self.physics.light_on() { 0x0010 } else { 0 };

        let mut buf = [0u8; 64];
        let len = frame::build_write_registers(
            &mut buf,
            frame::ADDR_BROADCAST,
            frame::REG_STATUS_UPDATE,
            &regs,
        )
        .unwrap();
        buf[..len].to_vec()
    }

    fn poll_frame(&self) -> Vec<u8> {
        let sync = u16::from_be_bytes([self.sync_counter, 0]);
        let mut buf = [0u8; 64];
        let len = frame::build_read_write_registers(
            &mut buf,
            frame::ADDR_UNIT,
            frame::REG_POLL,
            8,
            frame::REG_SYNC_COUNTER,
            &[sync],
        )
        .unwrap();
        buf[..len].to_vec()
    }
}

impl Default for DriveMaster {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_press(regs: (u16, u16)) -> Option<DriveAction> {
    match regs {
        (0x0210, 0x0000) => Some(DriveAction::Open),
        (0x0220, 0x0000) => Some(DriveAction::Close),
        (0x0240, 0x0000) => Some(DriveAction::Stop),
        (0x0200, 0x0400) => Some(DriveAction::HalfOpen),
        (0x0200, 0x4000) => Some(DriveAction::Vent),
        (0x0100, 0x0200) => Some(DriveAction::ToggleLight),
        _ => None,
    }
}
