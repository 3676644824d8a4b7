/// Size in bytes of an encoded [`MeshPacket`]: 4 + 1 + 1 + 1 + 1 + 4, no padding.
pub const PACKET_SIZE: usize = 12;
/// Reserved destination meaning "every node".
pub const BROADCAST: u8 = 0xFF;
pub const DEFAULT_TTL: u8 = 5;

pub const CMD_OPEN: u8 = 1;
pub const CMD_CLOSE: u8 = 2;
pub const CMD_ACK: u8 = 100;

const ID_OFFSET: usize = 0;
const SOURCE_OFFSET: usize = 4;
const DEST_OFFSET: usize = 5;
const TTL_OFFSET: usize = 6;
const COMMAND_OFFSET: usize = 7;
const PAYLOAD_OFFSET: usize = 8;

/// Application command carried by a packet.
///
/// Codes outside the known set decode to [`Command::Unknown`] and survive
/// re-encoding unchanged, so relays never alter commands they do not understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Open,
    Close,
    Ack,
    Unknown(u8),
}

impl Command {
    pub fn code(self) -> u8 {
        match self {
            Self::Open => CMD_OPEN,
            Self::Close => CMD_CLOSE,
            Self::Ack => CMD_ACK,
            Self::Unknown(code) => code,
        }
    }

    #[inline]
    pub fn is_ack(self) -> bool {
        matches!(self, Self::Ack)
    }
}

impl From<u8> for Command {
    fn from(code: u8) -> Self {
        match code {
            CMD_OPEN => Self::Open,
            CMD_CLOSE => Self::Close,
            CMD_ACK => Self::Ack,
            other => Self::Unknown(other),
        }
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command.code()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshPacket {
    pub message_id: u32,
    pub source: u8,
    pub dest: u8,
    pub ttl: u8,
    pub command: Command,
    pub payload: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    #[error("invalid frame length: expected {expected} bytes, got {0}", expected = PACKET_SIZE)]
    InvalidLength(usize),
}

impl MeshPacket {
    /// Acknowledgment for `acked`, correlated on its message id.
    pub fn ack_for(acked: &MeshPacket, self_node: u8, ttl: u8) -> Self {
        Self {
            message_id: acked.message_id,
            source: self_node,
            dest: acked.source,
            ttl,
            command: Command::Ack,
            payload: 0.0,
        }
    }

    #[inline]
    pub fn is_ack(&self) -> bool {
        self.command.is_ack()
    }

    #[inline]
    pub fn is_broadcast(&self) -> bool {
        self.dest == BROADCAST
    }

    pub fn encode(&self) -> [u8; PACKET_SIZE] {
        let mut buf = [0u8; PACKET_SIZE];
        buf[ID_OFFSET..SOURCE_OFFSET].copy_from_slice(&self.message_id.to_le_bytes());
        buf[SOURCE_OFFSET] = self.source;
        buf[DEST_OFFSET] = self.dest;
        buf[TTL_OFFSET] = self.ttl;
        buf[COMMAND_OFFSET] = self.command.code();
        buf[PAYLOAD_OFFSET..].copy_from_slice(&self.payload.to_le_bytes());
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        let buf: &[u8; PACKET_SIZE] = data
            .try_into()
            .map_err(|_| PacketError::InvalidLength(data.len()))?;

        let mut id = [0u8; 4];
        id.copy_from_slice(&buf[ID_OFFSET..SOURCE_OFFSET]);
        let mut payload = [0u8; 4];
        payload.copy_from_slice(&buf[PAYLOAD_OFFSET..]);

        Ok(Self {
            message_id: u32::from_le_bytes(id),
            source: buf[SOURCE_OFFSET],
            dest: buf[DEST_OFFSET],
            ttl: buf[TTL_OFFSET],
            command: Command::from(buf[COMMAND_OFFSET]),
            payload: f32::from_le_bytes(payload),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MeshPacket {
        MeshPacket {
            message_id: 0x0102_0304,
            source: 1,
            dest: 2,
            ttl: 5,
            command: Command::Open,
            payload: 1.5,
        }
    }

    #[test]
    fn test_wire_layout() {
        let bytes = sample().encode();
        assert_eq!(bytes.len(), PACKET_SIZE);
        assert_eq!(&bytes[0..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[4..8], &[1, 2, 5, CMD_OPEN]);
        assert_eq!(&bytes[8..12], &1.5f32.to_le_bytes());
    }

    #[test]
    fn test_decodes_raw_frame_fields() {
        let mut frame = [0u8; PACKET_SIZE];
        frame[..4].copy_from_slice(&0x0300_00A1u32.to_le_bytes());
        frame[4..8].copy_from_slice(&[3, 9, 4, CMD_CLOSE]);
        frame[8..].copy_from_slice(&(-2.25f32).to_le_bytes());

        let packet = MeshPacket::decode(&frame).unwrap();
        assert_eq!(packet.message_id, 0x0300_00A1);
        assert_eq!(packet.source, 3);
        assert_eq!(packet.dest, 9);
        assert_eq!(packet.ttl, 4);
        assert_eq!(packet.command, Command::Close);
        assert_eq!(packet.payload, -2.25);
    }

    #[test]
    fn test_packet_roundtrip() {
        let packets = [
            sample(),
            MeshPacket {
                message_id: u32::MAX,
                source: 0,
                dest: BROADCAST,
                ttl: 0,
                command: Command::Unknown(255),
                payload: -0.0,
            },
            MeshPacket {
                message_id: 0,
                source: 254,
                dest: 7,
                ttl: u8::MAX,
                command: Command::Close,
                payload: f32::MAX,
            },
        ];

        for packet in packets {
            let decoded = MeshPacket::decode(&packet.encode()).unwrap();
            assert_eq!(decoded, packet);
            assert_eq!(decoded.payload.to_bits(), packet.payload.to_bits());
        }
    }

    #[test]
    fn test_every_command_code_survives() {
        for code in 0..=u8::MAX {
            let packet = MeshPacket {
                command: Command::from(code),
                ..sample()
            };
            let decoded = MeshPacket::decode(&packet.encode()).unwrap();
            assert_eq!(decoded.command.code(), code);
        }
    }

    #[test]
    fn test_rejects_wrong_length() {
        let bytes = sample().encode();
        assert_eq!(
            MeshPacket::decode(&bytes[..11]),
            Err(PacketError::InvalidLength(11))
        );

        let mut long = bytes.to_vec();
        long.push(0);
        assert_eq!(
            MeshPacket::decode(&long),
            Err(PacketError::InvalidLength(13))
        );
        assert_eq!(MeshPacket::decode(&[]), Err(PacketError::InvalidLength(0)));
    }

    #[test]
    fn test_ack_correlates_on_message_id() {
        let original = sample();
        let ack = MeshPacket::ack_for(&original, 2, 3);
        assert_eq!(ack.message_id, original.message_id);
        assert_eq!(ack.source, 2);
        assert_eq!(ack.dest, 1);
        assert_eq!(ack.ttl, 3);
        assert!(ack.is_ack());
        assert_eq!(ack.payload, 0.0);
    }
}
