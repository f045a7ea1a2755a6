pub mod sim_hal;

pub mod prelude {
    pub use super::sim_hal::{sim_bus, BusEvent, NoopDelay, SimBusController, SimHal};
    pub use rollgate_bridge::{
        Bridge, CommandError, CommandSender, DispatchError, DriveProtocol, ProtocolEngine,
        FRAME_GAP_MS, LOCK_RETRY_ATTEMPTS, TX_SETTLE_DELAY_US,
    };
    pub use rollgate_common::{CommandCode, DriveState, Owner, SharedState};
    pub use rollgate_sim::{DriveAction, DriveMaster};
}
