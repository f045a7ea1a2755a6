//! Simulated bus hardware for driving a bridge from tests
//!
//! [`SimHal`] implements the hardware trait the transport driver is written
//! against; its paired [`SimBusController`] is the test's end of the wire,
//! with a virtual millisecond clock, a byte queue for the receive direction,
//! and an event log recording everything the driver did to the hardware.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use embedded_hal::delay::DelayNs;
use rollgate_common::{BusHal, FlushTimeout};

/// One observable action the bridge took on the bus hardware
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    /// The direction-control line was driven; `true` is transmit
    DirectionSet(bool),
    /// Bytes were queued for transmission
    Write(Vec<u8>),
    /// The driver waited for transmission to complete
    Flush,
    /// The driver busy-waited this many microseconds
    DelayUs(u32),
}

#[derive(Default)]
struct Inner {
    now_ms: u32,
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    events: Vec<BusEvent>,
    flush_fails: bool,
}

/// The bridge's side of a simulated bus
pub struct SimHal {
    inner: Rc<RefCell<Inner>>,
}

/// The test's side of a simulated bus
pub struct SimBusController {
    inner: Rc<RefCell<Inner>>,
}

/// Create a connected hal/controller pair with the clock at zero
pub fn sim_bus() -> (SimHal, SimBusController) {
    let inner = Rc::new(RefCell::new(Inner::default()));
    (
        SimHal {
            inner: inner.clone(),
        },
        SimBusController { inner },
    )
}

impl BusHal for SimHal {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut inner = self.inner.borrow_mut();
        let mut n = 0;
        while n < buf.len() {
            match inner.rx.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }

    fn write(&mut self, buf: &[u8]) {
        let mut inner = self.inner.borrow_mut();
        inner.tx.extend_from_slice(buf);
        inner.events.push(BusEvent::Write(buf.to_vec()));
    }

    fn flush(&mut self) -> Result<(), FlushTimeout> {
        let mut inner = self.inner.borrow_mut();
        inner.events.push(BusEvent::Flush);
        if inner.flush_fails {
            Err(FlushTimeout)
        } else {
            Ok(())
        }
    }

    fn set_transmit_enable(&mut self, enable: bool) {
        self.inner
            .borrow_mut()
            .events
            .push(BusEvent::DirectionSet(enable));
    }

    fn now_ms(&mut self) -> u32 {
        self.inner.borrow().now_ms
    }

    fn delay_us(&mut self, us: u32) {
        self.inner.borrow_mut().events.push(BusEvent::DelayUs(us));
    }
}

impl SimBusController {
    /// Advance the virtual clock
    pub fn advance(&self, ms: u32) {
        let mut inner = self.inner.borrow_mut();
        inner.now_ms = inner.now_ms.wrapping_add(ms);
    }

    /// Current virtual time
    pub fn now_ms(&self) -> u32 {
        self.inner.borrow().now_ms
    }

    /// Put bytes on the wire towards the bridge
    pub fn feed(&self, bytes: &[u8]) {
        self.inner.borrow_mut().rx.extend(bytes.iter().copied());
    }

    /// Take all bytes the bridge has transmitted so far
    pub fn take_tx(&self) -> Vec<u8> {
        std::mem::take(&mut self.inner.borrow_mut().tx)
    }

    /// Take the hardware event log accumulated so far
    pub fn take_events(&self) -> Vec<BusEvent> {
        std::mem::take(&mut self.inner.borrow_mut().events)
    }

    /// Make subsequent flushes report a timeout
    pub fn set_flush_fails(&self, fails: bool) {
        self.inner.borrow_mut().flush_fails = fails;
    }
}

/// A delay provider that spends no wall time
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopDelay;

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
