//! Command staging for host tasks

use defmt_or_log::warn;
use embedded_hal::delay::DelayNs;
use rollgate_common::{CommandCode, Owner, SharedState, StateGuard};
use snafu::Snafu;

/// How many times to retry acquiring the shared block before giving up
pub const LOCK_RETRY_ATTEMPTS: u32 = 100;

/// Busy-wait between lock attempts, in microseconds
pub const LOCK_RETRY_DELAY_US: u32 = 10;

/// A staging request could not be applied
#[derive(Copy, Clone, Debug, PartialEq, Eq, Snafu)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// The shared block stayed locked for the whole retry budget
    ///
    /// The request is dropped, not queued; the caller decides whether to
    /// retry on its own schedule.
    #[snafu(display("shared block contended for {attempts} attempts"))]
    Contention {
        /// Lock attempts made before giving up
        attempts: u32,
    },
}

/// Stages commands into the shared state block on behalf of host tasks
///
/// Holds the block for a handful of atomic stores per request, bounded by
/// [`LOCK_RETRY_ATTEMPTS`] retries at [`LOCK_RETRY_DELAY_US`] spacing, so a
/// worst-case call costs about a millisecond of busy-waiting and never blocks
/// indefinitely against the transport driver.
pub struct CommandSender<'a, D> {
    shared: &'a SharedState,
    delay: D,
}

impl<D> core::fmt::Debug for CommandSender<'_, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandSender")
            .field("shared", self.shared)
            .finish()
    }
}

impl<'a, D: DelayNs> CommandSender<'a, D> {
    /// Create a sender over the given shared block
    pub fn new(shared: &'a SharedState, delay: D) -> Self {
        Self { shared, delay }
    }

    /// Stage a drive command, replacing any not-yet-consumed one
    pub fn set_command(&mut self, command: CommandCode) -> Result<(), CommandError> {
        self.with_lock(|guard| guard.set_pending_command(command))
    }

    /// Stage a target position, 0 (closed) to 200 (open); clamps above 200
    pub fn set_target_position(&mut self, position: u8) -> Result<(), CommandError> {
        self.with_lock(|guard| guard.set_target_position(position.min(200)))
    }

    fn with_lock(
        &mut self,
        f: impl FnOnce(&mut StateGuard<'_>),
    ) -> Result<(), CommandError> {
        for _ in 0..LOCK_RETRY_ATTEMPTS {
            if let Some(mut guard) = self.shared.try_lock(Owner::Host) {
                f(&mut guard);
                return Ok(());
            }
            self.delay.delay_us(LOCK_RETRY_DELAY_US);
        }
        warn!("command dropped after {} lock attempts", LOCK_RETRY_ATTEMPTS);
        ContentionSnafu {
            attempts: LOCK_RETRY_ATTEMPTS,
        }
        .fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts busy-wait calls instead of spending wall time
    #[derive(Default)]
    struct CountingDelay {
        calls: u32,
        total_us: u32,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.calls += 1;
            self.total_us += ns / 1000;
        }
    }

    #[test]
    fn stages_command_when_block_is_free() {
        let shared = SharedState::new();
        let mut sender = CommandSender::new(&shared, CountingDelay::default());

        sender.set_command(CommandCode::Open).unwrap();
        sender.set_target_position(150).unwrap();

        let guard = shared.try_lock(Owner::Host).unwrap();
        assert_eq!(guard.pending_command(), CommandCode::Open);
        assert_eq!(guard.target_position(), 150);
        assert_eq!(sender.delay.calls, 0);
        assert!(format!("{sender:?}").contains("CommandSender"));
    }

    #[test]
    fn target_position_clamps_to_full_travel() {
        let shared = SharedState::new();
        let mut sender = CommandSender::new(&shared, CountingDelay::default());

        sender.set_target_position(255).unwrap();
        let guard = shared.try_lock(Owner::Host).unwrap();
        assert_eq!(guard.target_position(), 200);
    }

    #[test]
    fn drops_request_after_exhausting_the_retry_budget() {
        let shared = SharedState::new();
        {
            let mut guard = shared.try_lock(Owner::Host).unwrap();
            guard.set_pending_command(CommandCode::Close);

            let mut sender = CommandSender::new(&shared, CountingDelay::default());
            assert_eq!(
                sender.set_command(CommandCode::Open),
                Err(CommandError::Contention {
                    attempts: LOCK_RETRY_ATTEMPTS
                })
            );
            assert_eq!(sender.delay.calls, LOCK_RETRY_ATTEMPTS);
            assert_eq!(sender.delay.total_us, LOCK_RETRY_ATTEMPTS * LOCK_RETRY_DELAY_US);
        }

        // The holder's staged command was not disturbed
        let guard = shared.try_lock(Owner::Host).unwrap();
        assert_eq!(guard.pending_command(), CommandCode::Close);
    }
}
