//! Hardware access traits

use snafu::Snafu;

/// The transmit-complete wait expired before the line went idle
///
/// Non-fatal: the transport driver still runs the settle delay and returns
/// the direction line to receive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Snafu)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[snafu(display("transmit completion wait expired"))]
pub struct FlushTimeout;

/// Platform access required by the transport driver
///
/// Implementations wrap an already-initialized UART (fixed by the physical
/// bus at 57600 baud, 8 data bits, even parity, 1 stop bit) and the RS-485
/// direction-control output. The driver assumes the direction line starts in
/// receive mode.
pub trait BusHal {
    /// Read whatever bytes are pending, without blocking; returns the count
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Queue bytes for transmission
    fn write(&mut self, buf: &[u8]);

    /// Block until queued bytes have physically left the line
    ///
    /// The wait must be bounded by the implementation (hardware FIFO depth at
    /// a known baud rate gives a hard upper bound).
    fn flush(&mut self) -> Result<(), FlushTimeout>;

    /// Drive the direction-control line; `true` enables the transmitter
    fn set_transmit_enable(&mut self, enable: bool);

    /// Monotonic milliseconds
    fn now_ms(&mut self) -> u32;

    /// Busy-wait for `us` microseconds
    fn delay_us(&mut self, us: u32);
}
