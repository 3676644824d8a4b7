use log::{info, warn};

use super::protocol::{Command, MeshPacket};

/// The output side a node drives when a command reaches it.
pub trait Actuator {
    fn open(&mut self, payload: f32, now_ms: u64);
    fn close(&mut self, payload: f32, now_ms: u64);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dispatch {
    /// Correlation signal for the delivery tracker; never acknowledged itself.
    Acknowledgment { message_id: u32 },
    Executed {
        command: Command,
        ack: Option<MeshPacket>,
    },
    Unknown {
        code: u8,
        ack: Option<MeshPacket>,
    },
}

impl Dispatch {
    pub fn ack(&self) -> Option<&MeshPacket> {
        match self {
            Self::Acknowledgment { .. } => None,
            Self::Executed { ack, .. } | Self::Unknown { ack, .. } => ack.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CommandDispatcher {
    self_node: u8,
    ack_ttl: u8,
}

impl CommandDispatcher {
    pub fn new(self_node: u8, ack_ttl: u8) -> Self {
        Self { self_node, ack_ttl }
    }

    /// Applies `packet` to `actuator`. An ACK is owed whenever the packet was
    /// addressed exactly to this node, whether or not the command was understood.
    pub fn dispatch<A: Actuator + ?Sized>(
        &self,
        packet: &MeshPacket,
        actuator: &mut A,
        now_ms: u64,
    ) -> Dispatch {
        let ack = (packet.dest == self.self_node && !packet.is_ack())
            .then(|| MeshPacket::ack_for(packet, self.self_node, self.ack_ttl));

        match packet.command {
            Command::Ack => {
                return Dispatch::Acknowledgment {
                    message_id: packet.message_id,
                };
            }
            Command::Open => {
                info!(
                    "node {}: open from node {} (payload {})",
                    self.self_node, packet.source, packet.payload
                );
                actuator.open(packet.payload, now_ms);
            }
            Command::Close => {
                info!(
                    "node {}: close from node {} (payload {})",
                    self.self_node, packet.source, packet.payload
                );
                actuator.close(packet.payload, now_ms);
            }
            Command::Unknown(code) => {
                warn!(
                    "node {}: unknown command {} from node {}",
                    self.self_node, code, packet.source
                );
                return Dispatch::Unknown { code, ack };
            }
        }

        Dispatch::Executed {
            command: packet.command,
            ack,
        }
    }
}
