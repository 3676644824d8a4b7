mod dedup;
mod dispatch;
mod forward;
mod identity;
mod protocol;
mod simulator;
mod stats;
mod tracking;
mod transport;

pub use dedup::{DEFAULT_DEDUP_CAPACITY, DuplicateCache};
pub use dispatch::{Actuator, CommandDispatcher, Dispatch};
pub use forward::{maybe_forward, should_forward};
pub use identity::{IdGenerator, generate_id};
pub use protocol::{
    BROADCAST, CMD_ACK, CMD_CLOSE, CMD_OPEN, Command, DEFAULT_TTL, MeshPacket, PACKET_SIZE,
    PacketError,
};
pub use simulator::{RadioMedium, SimulatedRadio};
pub use stats::{NodeStats, PacketLossSimulation};
pub use tracking::{
    DEFAULT_ACK_TIMEOUT_MS, DEFAULT_MAX_RETRIES, DEFAULT_PENDING_CAPACITY, Delivered,
    DeliveryTracker, PendingDelivery, TickAction,
};
pub use transport::{Transport, TransportError, UdpTransport};
