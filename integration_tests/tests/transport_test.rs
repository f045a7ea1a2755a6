//! Transport driver behaviour against simulated bus hardware

use std::{cell::RefCell, rc::Rc};

use integration_tests::prelude::*;
use rollgate_common::StateGuard;

/// Records every frame handed over, and answers with a fixed script
struct ScriptedEngine {
    frames: Rc<RefCell<Vec<Vec<u8>>>>,
    response: Vec<u8>,
    error: Option<DispatchError>,
}

impl ScriptedEngine {
    fn new(response: &[u8]) -> (Self, Rc<RefCell<Vec<Vec<u8>>>>) {
        let frames = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                frames: frames.clone(),
                response: response.to_vec(),
                error: None,
            },
            frames,
        )
    }

    fn failing(error: DispatchError) -> (Self, Rc<RefCell<Vec<Vec<u8>>>>) {
        let (mut engine, frames) = Self::new(&[]);
        engine.error = Some(error);
        (engine, frames)
    }
}

impl ProtocolEngine for ScriptedEngine {
    fn dispatch(
        &mut self,
        frame: &[u8],
        response: &mut [u8],
        _state: &mut StateGuard<'_>,
        _now_ms: u32,
    ) -> Result<usize, DispatchError> {
        self.frames.borrow_mut().push(frame.to_vec());
        if let Some(e) = self.error {
            return Err(e);
        }
        response[..self.response.len()].copy_from_slice(&self.response);
        Ok(self.response.len())
    }
}

#[test]
fn frames_are_delimited_by_bus_inactivity() {
    let (hal, bus) = sim_bus();
    let shared = SharedState::new();
    let (engine, frames) = ScriptedEngine::new(&[]);
    let mut bridge = Bridge::new(hal, engine, &shared);

    // A frame arriving as two bursts inside the gap window
    bus.feed(&[0x02, 0x10, 0x9D]);
    bridge.poll();
    bus.advance(5);
    bus.feed(&[0x31, 0x55, 0xAA]);
    bridge.poll();

    // Exactly the gap is not yet a frame boundary
    bus.advance(FRAME_GAP_MS);
    bridge.poll();
    assert!(frames.borrow().is_empty());

    bus.advance(1);
    bridge.poll();
    assert_eq!(
        *frames.borrow(),
        vec![vec![0x02, 0x10, 0x9D, 0x31, 0x55, 0xAA]]
    );

    // The buffer was consumed; further silence produces nothing
    bus.advance(100);
    bridge.poll();
    assert_eq!(frames.borrow().len(), 1);
    assert_eq!(bridge.counters().frames_dispatched, 1);
    assert!(format!("{bridge:?}").contains("frames_dispatched"));
}

#[test]
fn oversized_bursts_are_discarded_until_the_next_gap() {
    let (hal, bus) = sim_bus();
    let shared = SharedState::new();
    let (engine, frames) = ScriptedEngine::new(&[]);
    let mut bridge = Bridge::new(hal, engine, &shared);

    bus.feed(&[0u8; 200]);
    bridge.poll();
    bus.advance(FRAME_GAP_MS + 1);
    bridge.poll();

    assert!(frames.borrow().is_empty(), "overflowed data must not dispatch");
    assert_eq!(bridge.counters().frames_dropped_overflow, 1);

    // The driver resynchronizes on the gap and the next frame goes through
    bus.feed(&[1, 2, 3, 4]);
    bridge.poll();
    bus.advance(FRAME_GAP_MS + 1);
    bridge.poll();
    assert_eq!(*frames.borrow(), vec![vec![1, 2, 3, 4]]);
}

#[test]
fn responses_sequence_the_direction_line() {
    let (hal, bus) = sim_bus();
    let shared = SharedState::new();
    let response = [0x02, 0x17, 0x04, 0x12, 0x04, 0x34, 0x00, 0xBE, 0xEF];
    let (engine, _frames) = ScriptedEngine::new(&response);
    let mut bridge = Bridge::new(hal, engine, &shared);

    bus.feed(&[1, 2, 3, 4]);
    bridge.poll();
    bus.advance(FRAME_GAP_MS + 1);
    bridge.poll();

    assert_eq!(
        bus.take_events(),
        vec![
            BusEvent::DirectionSet(true),
            BusEvent::Write(response.to_vec()),
            BusEvent::Flush,
            BusEvent::DelayUs(TX_SETTLE_DELAY_US),
            BusEvent::DirectionSet(false),
        ]
    );
    assert_eq!(bus.take_tx(), response);
    assert_eq!(bridge.counters().responses_sent, 1);
}

#[test]
fn no_response_leaves_the_bus_in_receive() {
    let (hal, bus) = sim_bus();
    let shared = SharedState::new();
    let (engine, frames) = ScriptedEngine::new(&[]);
    let mut bridge = Bridge::new(hal, engine, &shared);

    bus.feed(&[1, 2, 3, 4]);
    bridge.poll();
    bus.advance(FRAME_GAP_MS + 1);
    bridge.poll();

    assert_eq!(frames.borrow().len(), 1);
    assert!(bus.take_events().is_empty(), "no transmission, no line activity");
}

#[test]
fn flush_timeout_still_releases_the_bus() {
    let (hal, bus) = sim_bus();
    let shared = SharedState::new();
    let (engine, _frames) = ScriptedEngine::new(&[0xAA]);
    let mut bridge = Bridge::new(hal, engine, &shared);
    bus.set_flush_fails(true);

    bus.feed(&[1, 2, 3, 4]);
    bridge.poll();
    bus.advance(FRAME_GAP_MS + 1);
    bridge.poll();

    let events = bus.take_events();
    assert_eq!(
        events[events.len() - 2..],
        [
            BusEvent::DelayUs(TX_SETTLE_DELAY_US),
            BusEvent::DirectionSet(false),
        ]
    );
    assert_eq!(bridge.counters().flush_timeouts, 1);
}

#[test]
fn frames_are_dropped_while_a_host_task_holds_the_block() {
    let (hal, bus) = sim_bus();
    let shared = SharedState::new();
    let (engine, frames) = ScriptedEngine::new(&[]);
    let mut bridge = Bridge::new(hal, engine, &shared);

    let guard = shared.try_lock(Owner::Host).unwrap();
    bus.feed(&[1, 2, 3, 4]);
    bridge.poll();
    bus.advance(FRAME_GAP_MS + 1);
    bridge.poll();

    assert!(frames.borrow().is_empty());
    assert_eq!(bridge.counters().frames_dropped_contention, 1);
    drop(guard);

    // The drive repeats its poll; the next frame dispatches normally
    bus.feed(&[1, 2, 3, 4]);
    bridge.poll();
    bus.advance(FRAME_GAP_MS + 1);
    bridge.poll();
    assert_eq!(frames.borrow().len(), 1);
}

#[test]
fn rejected_frames_are_counted_and_not_answered() {
    let (hal, bus) = sim_bus();
    let shared = SharedState::new();
    let (engine, frames) = ScriptedEngine::failing(DispatchError::CrcMismatch);
    let mut bridge = Bridge::new(hal, engine, &shared);

    bus.feed(&[1, 2, 3, 4]);
    bridge.poll();
    bus.advance(FRAME_GAP_MS + 1);
    bridge.poll();

    assert_eq!(frames.borrow().len(), 1);
    assert_eq!(bridge.counters().dispatch_errors, 1);
    assert!(bus.take_events().is_empty());
}
