pub mod config;
pub mod net;
pub mod node;
pub mod relay;
pub mod simulation;

pub use config::{ConfigError, NodeConfig};
pub use net::{
    Actuator, BROADCAST, Command, CommandDispatcher, DeliveryTracker, Dispatch, DuplicateCache,
    IdGenerator, MeshPacket, NodeStats, PACKET_SIZE, PacketError, PacketLossSimulation,
    PendingDelivery, RadioMedium, SimulatedRadio, Transport, TransportError, UdpTransport,
    generate_id,
};
pub use node::{MeshNode, NodeError, NodeEvent};
pub use relay::RelayActuator;
pub use simulation::{MeshSimulation, SimulatedNode};
