use std::thread;
use std::time::{Duration, Instant};

use floodmesh::{
    Command, MeshNode, MeshPacket, NodeConfig, NodeEvent, RelayActuator, Transport, UdpTransport,
};

fn bind_pair() -> (UdpTransport, UdpTransport) {
    let mut a = UdpTransport::bind("127.0.0.1:0").unwrap();
    let mut b = UdpTransport::bind("127.0.0.1:0").unwrap();
    a.add_peer(b.local_addr());
    b.add_peer(a.local_addr());
    (a, b)
}

fn wait_for_frame(transport: &mut UdpTransport, timeout_ms: u64) -> Option<Vec<u8>> {
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        if let Some(frame) = transport.poll_frame().unwrap() {
            return Some(frame);
        }
        thread::sleep(Duration::from_millis(1));
    }
    None
}

#[test]
fn test_udp_frame_exchange() {
    let (mut a, mut b) = bind_pair();
    assert_eq!(a.peers(), &[b.local_addr()]);

    let packet = MeshPacket {
        message_id: 0x0100_0001,
        source: 1,
        dest: 2,
        ttl: 5,
        command: Command::Open,
        payload: 0.5,
    };
    a.send_frame(&packet.encode()).unwrap();

    let frame = wait_for_frame(&mut b, 500).expect("No frame received");
    assert_eq!(MeshPacket::decode(&frame).unwrap(), packet);
    assert!(a.poll_frame().unwrap().is_none());
}

#[test]
fn test_udp_rejects_self_as_peer() {
    let mut a = UdpTransport::bind("127.0.0.1:0").unwrap();
    let own = a.local_addr();
    a.add_peer(own);
    assert!(a.peers().is_empty());
}

#[test]
fn test_udp_nodes_deliver_and_ack() {
    let (a, b) = bind_pair();
    let mut sender = MeshNode::new(NodeConfig::for_node(1), a, RelayActuator::default()).unwrap();
    let mut receiver =
        MeshNode::new(NodeConfig::for_node(2), b, RelayActuator::default()).unwrap();

    let start = Instant::now();
    let now_ms = || start.elapsed().as_millis() as u64;

    let id = sender
        .send_unicast(2, Command::Open, 0.0, now_ms())
        .unwrap();

    let mut delivered = None;
    while delivered.is_none() && start.elapsed() < Duration::from_secs(1) {
        receiver.run_once(now_ms()).unwrap();
        sender.run_once(now_ms()).unwrap();
        delivered = sender
            .drain_events()
            .find(|e| matches!(e, NodeEvent::Delivered { .. }));
        thread::sleep(Duration::from_millis(1));
    }

    match delivered {
        Some(NodeEvent::Delivered { message_id, dest, .. }) => {
            assert_eq!(message_id, id);
            assert_eq!(dest, 2);
        }
        other => panic!("Expected delivery, got {:?}", other),
    }
    assert!(receiver.actuator().is_active());
    assert!(sender.pending().is_empty());
}
