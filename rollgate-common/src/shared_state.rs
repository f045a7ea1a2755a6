//! The fixed-layout state block shared between the transceiver task and host tasks

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::codes::{CommandCode, DriveState, Owner};

/// The shared state block
///
/// A single instance is shared by reference between the transceiver task
/// (which consumes staged commands and publishes telemetry) and any number of
/// host tasks (which stage commands and read telemetry snapshots). When both
/// sides run in one address space the block can live in a `static`; when the
/// transceiver runs on a coprocessor reading the same physical memory, the
/// block is placed at a fixed address with [`SharedState::at_address`]. The
/// layout is `repr(C)` and byte-stable for that reason.
///
/// All fields are single-word atomics, so telemetry reads never need the
/// lock. The lock exists to make multi-field updates consistent: any access
/// touching more than one field must go through [`SharedState::try_lock`].
#[repr(C)]
pub struct SharedState {
    owner: AtomicU8,
    pending_command: AtomicU8,
    target_position: AtomicU8,
    current_state: AtomicU8,
    current_position: AtomicU8,
    light_on: AtomicU8,
    _pad: [u8; 2],
    last_update_ms: AtomicU32,
}

/// Last-known device telemetry, read without the lock
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Telemetry {
    /// Current position, 0 (closed) to 200 (open)
    pub position: u8,
    /// Decoded drive state
    pub state: DriveState,
    /// Drive light status
    pub light_on: bool,
    /// Monotonic tick of the last telemetry update, for staleness checks
    pub last_update_ms: u32,
}

impl SharedState {
    /// Create a zeroed block: owner free, no command staged, timestamp 0
    pub const fn new() -> Self {
        Self {
            owner: AtomicU8::new(0),
            pending_command: AtomicU8::new(0),
            target_position: AtomicU8::new(0),
            current_state: AtomicU8::new(0),
            current_position: AtomicU8::new(0),
            light_on: AtomicU8::new(0),
            _pad: [0; 2],
            last_update_ms: AtomicU32::new(0),
        }
    }

    /// Reinterpret a fixed memory address as a shared state block
    ///
    /// For deployments where the transceiver runs on a coprocessor and the
    /// block lives at a known address in shared RAM.
    ///
    /// # Safety
    ///
    /// `addr` must point to a properly aligned block of at least
    /// `size_of::<SharedState>()` bytes which remains mapped for `'a`, and
    /// one side must zero-initialize it before the other side first reads it.
    pub unsafe fn at_address<'a>(addr: usize) -> &'a SharedState {
        &*(addr as *const SharedState)
    }

    /// Attempt to take exclusive ownership of the block, without blocking
    ///
    /// Succeeds only when the owner tag is currently [`Owner::Free`],
    /// transitioning it to `owner` with a hardware compare-and-swap. Returns
    /// `None` on any contention (and for the nonsensical `Owner::Free`
    /// argument). Ownership is returned when the guard drops.
    pub fn try_lock(&self, owner: Owner) -> Option<StateGuard<'_>> {
        if owner == Owner::Free {
            return None;
        }
        self.owner
            .compare_exchange(
                Owner::Free.into(),
                owner.into(),
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .ok()
            .map(|_| StateGuard { shared: self })
    }

    /// Read the current owner tag
    pub fn owner(&self) -> Owner {
        Owner::try_from(self.owner.load(Ordering::Relaxed)).unwrap_or(Owner::Free)
    }

    /// Read the telemetry fields without taking the lock
    ///
    /// Each field is a single-word atomic, so the values are individually
    /// torn-free; the group is last-update-wins by design. Adapters that care
    /// about staleness compare [`Telemetry::last_update_ms`] against their
    /// own clock.
    pub fn snapshot(&self) -> Telemetry {
        Telemetry {
            position: self.current_position.load(Ordering::Relaxed),
            state: DriveState::from(self.current_state.load(Ordering::Relaxed)),
            light_on: self.light_on.load(Ordering::Relaxed) != 0,
            last_update_ms: self.last_update_ms.load(Ordering::Relaxed),
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for SharedState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedState")
            .field("owner", &self.owner())
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

/// Exclusive view of the shared block, released on drop
///
/// Individual accessors use relaxed atomics; the acquire/release pair on the
/// owner tag orders them against the other side.
pub struct StateGuard<'a> {
    shared: &'a SharedState,
}

impl StateGuard<'_> {
    /// Read the staged command
    pub fn pending_command(&self) -> CommandCode {
        CommandCode::try_from(self.shared.pending_command.load(Ordering::Relaxed))
            .unwrap_or(CommandCode::None)
    }

    /// Stage a command for the transceiver to forward
    pub fn set_pending_command(&mut self, command: CommandCode) {
        self.shared
            .pending_command
            .store(command.into(), Ordering::Relaxed);
    }

    /// Read the staged target position
    pub fn target_position(&self) -> u8 {
        self.shared.target_position.load(Ordering::Relaxed)
    }

    /// Stage a target position (0-200)
    pub fn set_target_position(&mut self, position: u8) {
        self.shared
            .target_position
            .store(position, Ordering::Relaxed);
    }

    /// Overwrite the telemetry group after a successful protocol dispatch
    pub fn set_telemetry(&mut self, position: u8, state: DriveState, light_on: bool, now_ms: u32) {
        self.shared
            .current_position
            .store(position, Ordering::Relaxed);
        self.shared
            .current_state
            .store(state as u8, Ordering::Relaxed);
        self.shared
            .light_on
            .store(light_on as u8, Ordering::Relaxed);
        self.shared.last_update_ms.store(now_ms, Ordering::Relaxed);
    }

    /// Read the telemetry fields
    pub fn telemetry(&self) -> Telemetry {
        self.shared.snapshot()
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        self.shared
            .owner
            .store(Owner::Free.into(), Ordering::Release);
    }
}

impl core::fmt::Debug for StateGuard<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StateGuard")
            .field("shared", self.shared)
            .finish()
    }
}
