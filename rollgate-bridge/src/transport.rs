//! Half-duplex transport driver
//!
//! Polled from the transceiver task, the driver accumulates received bytes,
//! delimits frames by bus inactivity, and runs the direction line around any
//! response the engine produces.

use defmt_or_log::{debug, warn};
use heapless::Vec;
use rollgate_common::{BusHal, Owner, SharedState};

use crate::engine::ProtocolEngine;

/// Receive buffer capacity in bytes
///
/// The longest frame the drive sends is well under half of this.
pub const RX_BUFFER_SIZE: usize = 128;

/// Transmit buffer capacity in bytes
const TX_BUFFER_SIZE: usize = 128;

/// Bus inactivity that delimits a frame, in milliseconds
pub const FRAME_GAP_MS: u32 = 10;

/// Settle time after transmission before releasing the bus, in microseconds
pub const TX_SETTLE_DELAY_US: u32 = 500;

/// Event counters for bus health monitoring
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BridgeCounters {
    /// Frames handed to the protocol engine
    pub frames_dispatched: u32,
    /// Frames discarded because the receive buffer overflowed
    pub frames_dropped_overflow: u32,
    /// Frames discarded because the shared block was locked by a host task
    pub frames_dropped_contention: u32,
    /// Frames the engine rejected
    pub dispatch_errors: u32,
    /// Responses transmitted onto the bus
    pub responses_sent: u32,
    /// Transmissions where the flush wait expired
    pub flush_timeouts: u32,
}

/// The half-duplex transport driver
///
/// Call [`poll`](Bridge::poll) frequently; every internal operation is
/// non-blocking except the post-transmit settle delay. The drive tolerates a
/// response latency of one frame gap, so a poll interval of a millisecond or
/// two is comfortable.
pub struct Bridge<'a, H, E> {
    hal: H,
    engine: E,
    shared: &'a SharedState,
    rx: Vec<u8, RX_BUFFER_SIZE>,
    last_rx_ms: u32,
    overflowed: bool,
    counters: BridgeCounters,
}

impl<H, E> core::fmt::Debug for Bridge<'_, H, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Bridge")
            .field("shared", self.shared)
            .field("buffered", &self.rx.len())
            .field("last_rx_ms", &self.last_rx_ms)
            .field("counters", &self.counters)
            .finish()
    }
}

impl<'a, H: BusHal, E: ProtocolEngine> Bridge<'a, H, E> {
    /// Create a driver over the given hardware and protocol engine
    pub fn new(hal: H, engine: E, shared: &'a SharedState) -> Self {
        Self {
            hal,
            engine,
            shared,
            rx: Vec::new(),
            last_rx_ms: 0,
            overflowed: false,
            counters: BridgeCounters::default(),
        }
    }

    /// Run one iteration of the receive/dispatch loop
    pub fn poll(&mut self) {
        self.drain_receiver();

        if self.rx.is_empty() && !self.overflowed {
            return;
        }
        let now = self.hal.now_ms();
        if now.wrapping_sub(self.last_rx_ms) <= FRAME_GAP_MS {
            return;
        }
        if self.overflowed {
            // The oversized burst has ended; resync on this gap
            self.overflowed = false;
        } else {
            self.dispatch_frame(now);
        }
        self.rx.clear();
    }

    /// Counters accumulated since construction
    pub fn counters(&self) -> BridgeCounters {
        self.counters
    }

    fn drain_receiver(&mut self) {
        let mut chunk = [0u8; 32];
        loop {
            let n = self.hal.read(&mut chunk);
            if n == 0 {
                break;
            }
            self.last_rx_ms = self.hal.now_ms();
            if self.overflowed {
                // Discard until the bus goes quiet, so the tail of the burst
                // does not masquerade as a fresh frame
                continue;
            }
            if self.rx.extend_from_slice(&chunk[..n]).is_err() {
                warn!("rx overflow, discarding {} buffered bytes", self.rx.len());
                self.counters.frames_dropped_overflow += 1;
                self.rx.clear();
                self.overflowed = true;
            }
        }
    }

    fn dispatch_frame(&mut self, now: u32) {
        // Single attempt: missing one poll is cheaper than stalling the bus
        let Some(mut guard) = self.shared.try_lock(Owner::Transport) else {
            warn!("shared block busy, dropping frame");
            self.counters.frames_dropped_contention += 1;
            return;
        };

        let mut tx = [0u8; TX_BUFFER_SIZE];
        let result = self.engine.dispatch(&self.rx, &mut tx, &mut guard, now);
        drop(guard);

        match result {
            Ok(0) => {
                self.counters.frames_dispatched += 1;
            }
            Ok(len) => {
                self.counters.frames_dispatched += 1;
                self.transmit(&tx[..len]);
            }
            Err(e) => {
                debug!("dispatch rejected {}-byte frame: {}", self.rx.len(), e);
                self.counters.dispatch_errors += 1;
            }
        }
    }

    fn transmit(&mut self, bytes: &[u8]) {
        self.hal.set_transmit_enable(true);
        self.hal.write(bytes);
        if self.hal.flush().is_err() {
            warn!("flush wait expired with transmitter enabled");
            self.counters.flush_timeouts += 1;
        }
        // Let the stop bit clear the transceiver before releasing the bus
        self.hal.delay_us(TX_SETTLE_DELAY_US);
        self.hal.set_transmit_enable(false);
        self.counters.responses_sent += 1;
    }
}
