//! Register-frame codec for the drive's serial protocol
//!
//! The drive speaks a Modbus-RTU flavoured register protocol: one-byte unit
//! address, one-byte function code, big-endian register payload, and a
//! CRC-16/MODBUS trailer transmitted low byte first. Frames carry no length
//! or terminator; they are delimited on the wire by an inactivity gap, which
//! is the transport driver's concern. This module only builds and validates
//! the byte layout, shared between the bridge's protocol engine and the
//! drive-side simulator.

use snafu::Snafu;

/// Address for status broadcasts from the drive
pub const ADDR_BROADCAST: u8 = 0x00;
/// Bus address the bridge answers on
pub const ADDR_UNIT: u8 = 0x02;

/// Write multiple registers
pub const FUNC_WRITE_REGISTERS: u8 = 0x10;
/// Combined read/write multiple registers
pub const FUNC_READ_WRITE_REGISTERS: u8 = 0x17;

/// Register block for drive status broadcasts
pub const REG_STATUS_UPDATE: u16 = 0x9D31;
/// Register block for the drive's sync counter
pub const REG_SYNC_COUNTER: u16 = 0x9C41;
/// Register block polled by the drive for unit responses
pub const REG_POLL: u16 = 0x9CB9;

/// Shortest meaningful frame: address, function, CRC trailer
pub const MIN_FRAME_LEN: usize = 4;

/// Errors from frame validation and construction
#[derive(Copy, Clone, Debug, PartialEq, Eq, Snafu)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Frame shorter than address + function + CRC
    #[snafu(display("frame too short"))]
    TooShort,
    /// CRC trailer does not match the frame body
    #[snafu(display("CRC mismatch"))]
    CrcMismatch,
    /// Output buffer cannot hold the frame being built
    #[snafu(display("output buffer too small"))]
    BufferTooSmall,
}

/// CRC-16/MODBUS over `data`
pub fn crc(data: &[u8]) -> u16 {
    crc16::State::<crc16::MODBUS>::calculate(data)
}

/// Validate the CRC trailer and return the frame body without it
pub fn verify(frame: &[u8]) -> Result<&[u8], FrameError> {
    if frame.len() < MIN_FRAME_LEN {
        return TooShortSnafu.fail();
    }
    let (body, trailer) = frame.split_at(frame.len() - 2);
    let received = u16::from_le_bytes([trailer[0], trailer[1]]);
    if received != crc(body) {
        return CrcMismatchSnafu.fail();
    }
    Ok(body)
}

/// Append the CRC trailer over `buf[..len]`, returning the full frame length
pub fn finish(buf: &mut [u8], len: usize) -> Result<usize, FrameError> {
    if buf.len() < len + 2 {
        return BufferTooSmallSnafu.fail();
    }
    let trailer = crc(&buf[..len]).to_le_bytes();
    buf[len..len + 2].copy_from_slice(&trailer);
    Ok(len + 2)
}

/// Decode big-endian register words from `data`, returning the count stored
pub fn decode_registers(data: &[u8], out: &mut [u16]) -> usize {
    let count = (data.len() / 2).min(out.len());
    for (i, reg) in out.iter_mut().enumerate().take(count) {
        *reg = u16::from_be_bytes([data[i * 2], data[i * 2 + 1]]);
    }
    count
}

fn encode_registers(regs: &[u16], out: &mut [u8]) {
    for (i, &reg) in regs.iter().enumerate() {
        out[i * 2..i * 2 + 2].copy_from_slice(&reg.to_be_bytes());
    }
}

/// Build a write-multiple-registers frame (function 0x10)
pub fn build_write_registers(
    buf: &mut [u8],
    addr: u8,
    start: u16,
    regs: &[u16],
) -> Result<usize, FrameError> {
    let len = 7 + regs.len() * 2;
    if buf.len() < len + 2 {
        return BufferTooSmallSnafu.fail();
    }
    buf[0] = addr;
    buf[1] = FUNC_WRITE_REGISTERS;
    buf[2..4].copy_from_slice(&start.to_be_bytes());
    buf[4..6].copy_from_slice(&(regs.len() as u16).to_be_bytes());
    buf[6] = (regs.len() * 2) as u8;
    encode_registers(regs, &mut buf[7..len]);
    finish(buf, len)
}

/// Build a combined read/write frame (function 0x17)
pub fn build_read_write_registers(
    buf: &mut [u8],
    addr: u8,
    read_start: u16,
    read_qty: u16,
    write_start: u16,
    write_regs: &[u16],
) -> Result<usize, FrameError> {
    let len = 11 + write_regs.len() * 2;
    if buf.len() < len + 2 {
        return BufferTooSmallSnafu.fail();
    }
    buf[0] = addr;
    buf[1] = FUNC_READ_WRITE_REGISTERS;
    buf[2..4].copy_from_slice(&read_start.to_be_bytes());
    buf[4..6].copy_from_slice(&read_qty.to_be_bytes());
    buf[6..8].copy_from_slice(&write_start.to_be_bytes());
    buf[8..10].copy_from_slice(&(write_regs.len() as u16).to_be_bytes());
    buf[10] = (write_regs.len() * 2) as u8;
    encode_registers(write_regs, &mut buf[11..len]);
    finish(buf, len)
}

/// Build a read response frame carrying `regs` (function 0x17 reply)
pub fn build_read_response(buf: &mut [u8], addr: u8, regs: &[u16]) -> Result<usize, FrameError> {
    let len = 3 + regs.len() * 2;
    if buf.len() < len + 2 {
        return BufferTooSmallSnafu.fail();
    }
    buf[0] = addr;
    buf[1] = FUNC_READ_WRITE_REGISTERS;
    buf[2] = (regs.len() * 2) as u8;
    encode_registers(regs, &mut buf[3..len]);
    finish(buf, len)
}

#[cfg(test)]
mod tests {
    use super::*;

    // A bus-scan request captured from a real drive
    const SCAN_REQUEST: [u8; 19] = [
        0x02, 0x17, 0x9C, 0xB9, 0x00, 0x05, 0x9C, 0x41, 0x00, 0x03, 0x06, 0x00, 0x02, 0x00, 0x00,
        0x01, 0x02, 0xF8, 0x35,
    ];

    #[test]
    fn crc_matches_reference_capture() {
        assert_eq!(crc(&SCAN_REQUEST[..17]), 0x35F8);
    }

    #[test]
    fn verify_accepts_valid_trailer() {
        let body = verify(&SCAN_REQUEST).unwrap();
        assert_eq!(body.len(), 17);
        assert_eq!(body[0], ADDR_UNIT);
    }

    #[test]
    fn verify_rejects_corruption() {
        let mut frame = SCAN_REQUEST;
        frame[5] ^= 0x01;
        assert_eq!(verify(&frame), Err(FrameError::CrcMismatch));
        assert_eq!(verify(&frame[..3]), Err(FrameError::TooShort));
    }

    #[test]
    fn read_write_builder_reproduces_capture() {
        let mut buf = [0u8; 32];
        let len = build_read_write_registers(
            &mut buf,
            ADDR_UNIT,
            REG_POLL,
            5,
            REG_SYNC_COUNTER,
            &[0x0002, 0x0000, 0x0102],
        )
        .unwrap();
        assert_eq!(&buf[..len], &SCAN_REQUEST);
    }

    #[test]
    fn write_builder_round_trips() {
        let mut buf = [0u8; 32];
        let regs = [0x0000, 0x1635, 0x0100];
        let len = build_write_registers(&mut buf, ADDR_BROADCAST, REG_STATUS_UPDATE, &regs).unwrap();

        let body = verify(&buf[..len]).unwrap();
        assert_eq!(body[0], ADDR_BROADCAST);
        assert_eq!(body[1], FUNC_WRITE_REGISTERS);
        assert_eq!(u16::from_be_bytes([body[2], body[3]]), REG_STATUS_UPDATE);
        assert_eq!(body[6] as usize, regs.len() * 2);

        let mut decoded = [0u16; 3];
        assert_eq!(decode_registers(&body[7..], &mut decoded), 3);
        assert_eq!(decoded, regs);
    }

    #[test]
    fn builders_reject_small_buffers() {
        let mut buf = [0u8; 8];
        assert_eq!(
            build_write_registers(&mut buf, ADDR_BROADCAST, REG_STATUS_UPDATE, &[0; 4]),
            Err(FrameError::BufferTooSmall)
        );
        assert_eq!(
            build_read_response(&mut buf, ADDR_UNIT, &[0; 8]),
            Err(FrameError::BufferTooSmall)
        );
    }
}
