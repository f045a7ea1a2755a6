//! Register protocol engine for the supported drive family

use defmt_or_log::debug;
use rollgate_common::{
    codes::{CommandCode, DriveState},
    frame::{self, FrameError},
    StateGuard,
};

use crate::engine::{DispatchError, ProtocolEngine};

/// How long the emulated wall-unit button stays pressed in poll responses
const PRESS_HOLD_MS: u32 = 500;

/// Most registers any supported frame carries
const MAX_FRAME_REGISTERS: usize = 16;

/// Device identity words reported in bus-scan responses
const SCAN_ID_WORDS: [u16; 3] = [0x0430, 0x10FF, 0xA845];

/// Protocol engine for the drive's register protocol
///
/// The drive is the bus master. It broadcasts status updates, keeps a sync
/// counter, and polls the unit; commands are delivered by answering polls
/// with "button" action registers, held pressed for [`PRESS_HOLD_MS`] and
/// then released once, after which the staged command is consumed from the
/// shared block.
#[derive(Debug)]
pub struct DriveProtocol {
    sync_counter: u8,
    command_echo: u8,
    active_command: CommandCode,
    press_start_ms: u32,
}

impl DriveProtocol {
    /// Create an engine with no command active
    pub const fn new() -> Self {
        Self {
            sync_counter: 0,
            command_echo: 0,
            active_command: CommandCode::None,
            press_start_ms: 0,
        }
    }

    fn handle_write(
        &mut self,
        body: &[u8],
        state: &mut StateGuard<'_>,
        now_ms: u32,
    ) -> Result<usize, DispatchError> {
        if body.len() < 7 {
            return Err(DispatchError::Malformed);
        }
        let start = u16::from_be_bytes([body[2], body[3]]);
        let qty = u16::from_be_bytes([body[4], body[5]]) as usize;
        let byte_count = body[6] as usize;
        if body.len() < 7 + byte_count {
            return Err(DispatchError::Malformed);
        }

        let mut regs = [0u16; MAX_FRAME_REGISTERS];
        let count = frame::decode_registers(&body[7..7 + byte_count], &mut regs);
        let regs = &regs[..qty.min(count)];

        match start {
            frame::REG_STATUS_UPDATE => self.handle_status_update(regs, state, now_ms),
            frame::REG_SYNC_COUNTER => self.handle_sync_counter(regs),
            _ => {}
        }
        Ok(0)
    }

    fn handle_read_write(
        &mut self,
        body: &[u8],
        response: &mut [u8],
        state: &mut StateGuard<'_>,
        now_ms: u32,
    ) -> Result<usize, DispatchError> {
        if body.len() < 11 {
            return Err(DispatchError::Malformed);
        }
        let read_start = u16::from_be_bytes([body[2], body[3]]);
        let read_qty = u16::from_be_bytes([body[4], body[5]]) as usize;
        let write_start = u16::from_be_bytes([body[6], body[7]]);
        let write_qty = u16::from_be_bytes([body[8], body[9]]) as usize;
        let byte_count = body[10] as usize;
        if body.len() < 11 + byte_count {
            return Err(DispatchError::Malformed);
        }

        let mut regs = [0u16; MAX_FRAME_REGISTERS];
        let count = frame::decode_registers(&body[11..11 + byte_count], &mut regs);
        if write_start == frame::REG_SYNC_COUNTER {
            self.handle_sync_counter(&regs[..write_qty.min(count)]);
        }

        if read_start == frame::REG_POLL {
            if read_qty > 8 {
                return Err(DispatchError::Malformed);
            }
            let resp_regs = self.prepare_poll_response(read_qty, state, now_ms);
            let len = frame::build_read_response(response, frame::ADDR_UNIT, &resp_regs[..read_qty])
                .map_err(|_| DispatchError::ResponseOverflow)?;
            return Ok(len);
        }
        Ok(0)
    }

    /// Decode a status broadcast into the telemetry fields
    ///
    /// Register 1 carries the position pair (target high, current low),
    /// register 2 the drive state in its high byte, register 6 the light in
    /// bit 0x10. The target half is the drive echoing its own goal; the
    /// shared block's target slot belongs to host commands, so only the
    /// current position is taken.
    fn handle_status_update(&mut self, regs: &[u16], state: &mut StateGuard<'_>, now_ms: u32) {
        if regs.len() < 9 {
            return;
        }
        let position = (regs[1] & 0xFF) as u8;
        let drive_state = DriveState::from((regs[2] >> 8) as u8);
        let light_on = (regs[6] & 0x10) != 0;
        state.set_telemetry(position, drive_state, light_on, now_ms);
    }

    fn handle_sync_counter(&mut self, regs: &[u16]) {
        if regs.is_empty() {
            return;
        }
        self.sync_counter = (regs[0] >> 8) as u8;
        self.command_echo = (regs[0] & 0xFF) as u8;
    }

    fn prepare_poll_response(
        &mut self,
        quantity: usize,
        state: &mut StateGuard<'_>,
        now_ms: u32,
    ) -> [u16; 8] {
        let counter = self.sync_counter as u16;
        let echo = self.command_echo as u16;
        let mut resp = [0u16; 8];
        match quantity {
            // Idle keep-alive
            2 => {
                resp[0] = (counter << 8) | 0x04;
                resp[1] = echo << 8;
            }
            // Bus scan: identify ourselves
            5 => {
                resp[0] = counter << 8;
                resp[1] = (echo << 8) | 0x05;
                resp[2..5].copy_from_slice(&SCAN_ID_WORDS);
            }
            // Command poll: report the emulated button state
            8 => {
                resp[0] = counter << 8;
                resp[1] = (echo << 8) | 0x01;
                let (r2, r3) = self.action_registers(state, now_ms);
                resp[2] = r2;
                resp[3] = r3;
            }
            _ => {}
        }
        resp
    }

    /// Produce the action register pair for the staged command
    ///
    /// A command is reported as pressed for [`PRESS_HOLD_MS`], then released
    /// exactly once, at which point it is consumed: the pending command and
    /// target slots are reset so the command cannot be dispatched twice.
    fn action_registers(&mut self, state: &mut StateGuard<'_>, now_ms: u32) -> (u16, u16) {
        let staged = state.pending_command();
        if staged == CommandCode::None {
            self.active_command = CommandCode::None;
            return (0, 0);
        }

        if self.active_command != staged {
            self.active_command = staged;
            self.press_start_ms = now_ms;
        }
        let pressing = now_ms.wrapping_sub(self.press_start_ms) < PRESS_HOLD_MS;

        let regs = match (staged, pressing) {
            (CommandCode::Open, true) => (0x0210, 0x0000),
            (CommandCode::Open, false) => (0x0110, 0x0000),
            (CommandCode::Close, true) => (0x0220, 0x0000),
            (CommandCode::Close, false) => (0x0120, 0x0000),
            (CommandCode::Stop, true) => (0x0240, 0x0000),
            (CommandCode::Stop, false) => (0x0140, 0x0000),
            (CommandCode::HalfOpen, true) => (0x0200, 0x0400),
            (CommandCode::HalfOpen, false) => (0x0100, 0x0400),
            (CommandCode::Vent, true) => (0x0200, 0x4000),
            (CommandCode::Vent, false) => (0x0100, 0x4000),
            (CommandCode::ToggleLight, true) => (0x0100, 0x0200),
            (CommandCode::ToggleLight, false) => (0x0800, 0x0200),
            (CommandCode::None, _) => (0, 0),
        };

        if !pressing {
            debug!("command released and consumed");
            state.set_pending_command(CommandCode::None);
            state.set_target_position(0);
            self.active_command = CommandCode::None;
        }
        regs
    }
}

impl Default for DriveProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolEngine for DriveProtocol {
    fn dispatch(
        &mut self,
        frame_bytes: &[u8],
        response: &mut [u8],
        state: &mut StateGuard<'_>,
        now_ms: u32,
    ) -> Result<usize, DispatchError> {
        if frame_bytes.len() < frame::MIN_FRAME_LEN {
            return Err(DispatchError::FrameTooShort);
        }
        let addr = frame_bytes[0];
        let func = frame_bytes[1];
        if addr != frame::ADDR_UNIT && addr != frame::ADDR_BROADCAST {
            return Err(DispatchError::UnknownAddress);
        }
        if func != frame::FUNC_WRITE_REGISTERS && func != frame::FUNC_READ_WRITE_REGISTERS {
            return Err(DispatchError::UnknownFunction);
        }
        let body = frame::verify(frame_bytes).map_err(|e| match e {
            FrameError::TooShort => DispatchError::FrameTooShort,
            _ => DispatchError::CrcMismatch,
        })?;

        if func == frame::FUNC_WRITE_REGISTERS {
            self.handle_write(body, state, now_ms)
        } else {
            self.handle_read_write(body, response, state, now_ms)
        }
    }
}
