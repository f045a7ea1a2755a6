//! The protocol engine seam between the transport driver and a drive protocol

use rollgate_common::StateGuard;
use snafu::Snafu;

/// Errors a protocol engine may report for an assembled frame
///
/// All of these are per-frame conditions; the transport driver logs them and
/// returns to receiving.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Snafu)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchError {
    /// Frame shorter than address + function + CRC
    #[snafu(display("frame too short"))]
    FrameTooShort,
    /// Frame addressed to another unit on the bus
    #[snafu(display("frame addressed to another unit"))]
    UnknownAddress,
    /// Function code the engine does not implement
    #[snafu(display("unsupported function code"))]
    UnknownFunction,
    /// CRC trailer mismatch
    #[snafu(display("CRC mismatch"))]
    CrcMismatch,
    /// Frame body inconsistent with its declared lengths
    #[snafu(display("malformed frame body"))]
    Malformed,
    /// The response would not fit the transmit buffer
    #[snafu(display("response exceeds output buffer"))]
    ResponseOverflow,
}

/// A drive protocol implementation, as seen by the transport driver
///
/// The driver guarantees: `dispatch` is called at most once per assembled
/// frame, with exclusive access to the shared block for the whole call, so a
/// command read and a telemetry write are one critical section. The engine's
/// only visible side effects are writes through `state` and the bytes it
/// places in `response`.
pub trait ProtocolEngine {
    /// Process one assembled frame, optionally producing a response
    ///
    /// Returns the number of response bytes written into `response`; 0 means
    /// nothing to transmit. `now_ms` is the monotonic time the frame was
    /// assembled at.
    fn dispatch(
        &mut self,
        frame: &[u8],
        response: &mut [u8],
        state: &mut StateGuard<'_>,
        now_ms: u32,
    ) -> Result<usize, DispatchError>;
}
