use super::protocol::MeshPacket;

/// A packet is relayed while it has hops left, unless it was addressed
/// exactly to this node. Broadcasts are relayed like any other destination.
#[inline]
pub fn should_forward(packet: &MeshPacket, self_node: u8) -> bool {
    packet.ttl > 0 && packet.dest != self_node
}

/// The relayed copy of `packet`: one hop spent, every other field preserved.
pub fn maybe_forward(packet: &MeshPacket, self_node: u8) -> Option<MeshPacket> {
    if !should_forward(packet, self_node) {
        return None;
    }

    Some(MeshPacket {
        ttl: packet.ttl - 1,
        ..*packet
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::{BROADCAST, Command};

    fn packet(dest: u8, ttl: u8) -> MeshPacket {
        MeshPacket {
            message_id: 77,
            source: 1,
            dest,
            ttl,
            command: Command::Open,
            payload: 3.0,
        }
    }

    #[test]
    fn test_forward_decrements_only_ttl() {
        let original = packet(9, 4);
        let relayed = maybe_forward(&original, 2).unwrap();

        assert_eq!(relayed.ttl, 3);
        assert_eq!(relayed.message_id, original.message_id);
        assert_eq!(relayed.source, original.source);
        assert_eq!(relayed.dest, original.dest);
        assert_eq!(relayed.command, original.command);
        assert_eq!(relayed.payload, original.payload);
    }

    #[test]
    fn test_never_forwards_own_traffic_or_exhausted() {
        assert!(maybe_forward(&packet(2, 4), 2).is_none());
        assert!(maybe_forward(&packet(9, 0), 2).is_none());
        assert!(maybe_forward(&packet(BROADCAST, 0), 2).is_none());
    }

    #[test]
    fn test_broadcast_is_forwarded() {
        let relayed = maybe_forward(&packet(BROADCAST, 1), 2).unwrap();
        assert_eq!(relayed.ttl, 0);
    }

    #[test]
    fn test_ttl_decay_terminates() {
        for k in 0..=10u8 {
            let mut current = packet(BROADCAST, k);
            let mut hops = 0;
            while let Some(next) = maybe_forward(&current, 2) {
                current = next;
                hops += 1;
            }
            assert_eq!(hops, k);
            assert_eq!(current.ttl, 0);
        }
    }
}
