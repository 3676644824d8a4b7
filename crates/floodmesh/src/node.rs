use std::collections::VecDeque;

use log::{debug, info, warn};

use crate::config::{ConfigError, NodeConfig};
use crate::net::{
    Actuator, BROADCAST, Command, CommandDispatcher, DeliveryTracker, Dispatch, DuplicateCache,
    IdGenerator, MeshPacket, NodeStats, TickAction, Transport, TransportError, maybe_forward,
};

/// Relayed-ACK memory is only a damper against ACK ping-pong between relays.
const ACK_RELAY_CACHE_CAPACITY: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    CommandReceived {
        message_id: u32,
        source: u8,
        dest: u8,
        command: Command,
        payload: f32,
    },
    Delivered {
        message_id: u32,
        dest: u8,
        retries: u8,
        rtt_ms: u64,
    },
    DeliveryFailed {
        message_id: u32,
        dest: u8,
        command: Command,
        attempts: u8,
    },
    /// Sent without ACK tracking because the pending table was full.
    Untracked { message_id: u32, dest: u8 },
    MalformedFrame { len: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("acknowledgments are generated by the protocol, not originated")]
    ReservedCommand,
    #[error("node {0} cannot address a message to itself")]
    SelfAddressed(u8),
    #[error("node {0} is already attached")]
    DuplicateNode(u8),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Protocol engine for one node of the flood mesh.
///
/// Everything runs to completion on the caller's thread; drive it by calling
/// [`MeshNode::poll`] and [`MeshNode::tick`] from a single control loop.
pub struct MeshNode<T, A> {
    config: NodeConfig,
    ids: IdGenerator,
    seen: DuplicateCache,
    relayed_acks: DuplicateCache,
    tracker: DeliveryTracker,
    dispatcher: CommandDispatcher,
    transport: T,
    actuator: A,
    stats: NodeStats,
    pending_events: VecDeque<NodeEvent>,
}

impl<T: Transport, A: Actuator> MeshNode<T, A> {
    pub fn new(config: NodeConfig, transport: T, actuator: A) -> Result<Self, NodeError> {
        config.validate()?;

        Ok(Self {
            ids: IdGenerator::new(config.node_id),
            seen: DuplicateCache::new(config.dedup_capacity),
            relayed_acks: DuplicateCache::new(ACK_RELAY_CACHE_CAPACITY),
            tracker: DeliveryTracker::new(
                config.pending_capacity,
                config.ack_timeout_ms,
                config.max_retries,
            ),
            dispatcher: CommandDispatcher::new(config.node_id, config.ack_ttl),
            transport,
            actuator,
            stats: NodeStats::default(),
            pending_events: VecDeque::new(),
            config,
        })
    }

    pub fn id(&self) -> u8 {
        self.config.node_id
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    pub fn pending(&self) -> &DeliveryTracker {
        &self.tracker
    }

    pub fn seen(&self) -> &DuplicateCache {
        &self.seen
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = NodeEvent> + '_ {
        self.pending_events.drain(..)
    }

    /// Originates a flood towards `dest` and tracks it for acknowledgment.
    ///
    /// A failed first transmission is not an error: the retry schedule covers
    /// it when the message is tracked.
    pub fn send_unicast(
        &mut self,
        dest: u8,
        command: Command,
        payload: f32,
        now_ms: u64,
    ) -> Result<u32, NodeError> {
        if command.is_ack() {
            return Err(NodeError::ReservedCommand);
        }
        if dest == self.id() {
            return Err(NodeError::SelfAddressed(dest));
        }

        let packet = MeshPacket {
            message_id: self.ids.next_id(now_ms),
            source: self.id(),
            dest,
            ttl: self.config.default_ttl,
            command,
            payload,
        };

        // Echoes of our own flood must not be processed or relayed by us.
        self.seen.record(packet.message_id);
        info!(
            "node {}: sending {:?} to {} (id {:#010x})",
            self.id(),
            command,
            dest,
            packet.message_id
        );
        self.transmit(&packet);

        if !packet.is_broadcast() {
            let tracked =
                self.tracker
                    .enqueue(dest, command, payload, packet.message_id, now_ms);
            if !tracked {
                warn!(
                    "node {}: pending table full, {:#010x} sent untracked",
                    self.id(),
                    packet.message_id
                );
                self.stats.untracked_sends += 1;
                self.pending_events.push_back(NodeEvent::Untracked {
                    message_id: packet.message_id,
                    dest,
                });
            }
        }

        Ok(packet.message_id)
    }

    pub fn send_broadcast(
        &mut self,
        command: Command,
        payload: f32,
        now_ms: u64,
    ) -> Result<u32, NodeError> {
        self.send_unicast(BROADCAST, command, payload, now_ms)
    }

    /// Handles at most one inbound frame. Returns `false` when none was waiting.
    pub fn poll(&mut self, now_ms: u64) -> Result<bool, TransportError> {
        let Some(frame) = self.transport.poll_frame()? else {
            return Ok(false);
        };
        self.handle_frame(&frame, now_ms);
        Ok(true)
    }

    pub fn handle_frame(&mut self, frame: &[u8], now_ms: u64) {
        self.stats.frames_received += 1;

        let packet = match MeshPacket::decode(frame) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("node {}: dropping malformed frame: {}", self.id(), e);
                self.stats.malformed_frames += 1;
                self.pending_events
                    .push_back(NodeEvent::MalformedFrame { len: frame.len() });
                return;
            }
        };

        if packet.is_ack() {
            if packet.dest != self.id() {
                self.relay_ack(&packet);
                return;
            }
        } else if !self.seen.check_and_record(packet.message_id) {
            debug!(
                "node {}: duplicate {:#010x} from {}",
                self.id(),
                packet.message_id,
                packet.source
            );
            self.stats.duplicates_dropped += 1;
            return;
        }

        if packet.dest == self.id() || packet.is_broadcast() {
            self.deliver_locally(&packet, now_ms);
        }

        self.forward(&packet);
    }

    /// Retransmits overdue deliveries and retires exhausted ones.
    pub fn tick(&mut self, now_ms: u64) {
        for action in self.tracker.tick(now_ms) {
            match action {
                TickAction::Resend(pending) => {
                    debug!(
                        "node {}: retry {} for {:#010x}",
                        self.id(),
                        pending.retry_count,
                        pending.message_id
                    );
                    self.stats.retransmissions += 1;
                    let packet = pending.to_packet(self.id(), self.config.default_ttl);
                    self.transmit(&packet);
                }
                TickAction::Failed(pending) => {
                    warn!(
                        "node {}: delivery of {:#010x} to {} failed after {} attempts",
                        self.id(),
                        pending.message_id,
                        pending.dest,
                        pending.retry_count as u32 + 1
                    );
                    self.stats.delivery_failures += 1;
                    self.pending_events.push_back(NodeEvent::DeliveryFailed {
                        message_id: pending.message_id,
                        dest: pending.dest,
                        command: pending.command,
                        attempts: pending.retry_count.saturating_add(1),
                    });
                }
            }
        }
    }

    /// One control-loop iteration: at most one inbound frame, then the retry timer.
    ///
    /// The retry timer runs even when receiving fails; the receive error is
    /// returned afterwards.
    pub fn run_once(&mut self, now_ms: u64) -> Result<bool, TransportError> {
        let polled = self.poll(now_ms);
        self.tick(now_ms);
        polled
    }

    fn deliver_locally(&mut self, packet: &MeshPacket, now_ms: u64) {
        let dispatch = self
            .dispatcher
            .dispatch(packet, &mut self.actuator, now_ms);

        match dispatch {
            Dispatch::Acknowledgment { message_id } => {
                self.retire(message_id, now_ms);
                return;
            }
            Dispatch::Executed { .. } => self.stats.commands_executed += 1,
            Dispatch::Unknown { .. } => self.stats.unknown_commands += 1,
        }

        self.pending_events.push_back(NodeEvent::CommandReceived {
            message_id: packet.message_id,
            source: packet.source,
            dest: packet.dest,
            command: packet.command,
            payload: packet.payload,
        });

        if let Some(ack) = dispatch.ack() {
            debug!(
                "node {}: acking {:#010x} to {}",
                self.id(),
                ack.message_id,
                ack.dest
            );
            // Our own ACK echoed back by a neighbour must not be relayed again.
            self.relayed_acks.record(ack.message_id);
            if self.transmit(ack) {
                self.stats.acks_sent += 1;
            }
        }
    }

    fn retire(&mut self, message_id: u32, now_ms: u64) {
        self.stats.acks_received += 1;

        match self.tracker.on_ack_received(message_id, now_ms) {
            Some(delivered) => {
                info!(
                    "node {}: {:#010x} delivered to {} ({} ms)",
                    self.id(),
                    message_id,
                    delivered.delivery.dest,
                    delivered.rtt_ms
                );
                self.stats.deliveries_confirmed += 1;
                self.stats.rtt_ms = self.tracker.srtt();
                self.stats.rtt_variance = self.tracker.rtt_var();
                self.pending_events.push_back(NodeEvent::Delivered {
                    message_id,
                    dest: delivered.delivery.dest,
                    retries: delivered.delivery.retry_count,
                    rtt_ms: delivered.rtt_ms,
                });
            }
            None => {
                debug!(
                    "node {}: ack for unknown or retired {:#010x}",
                    self.id(),
                    message_id
                );
                self.stats.unmatched_acks += 1;
            }
        }
    }

    fn relay_ack(&mut self, packet: &MeshPacket) {
        if !self.relayed_acks.check_and_record(packet.message_id) {
            debug!(
                "node {}: ack {:#010x} already relayed",
                self.id(),
                packet.message_id
            );
            return;
        }
        self.forward(packet);
    }

    fn forward(&mut self, packet: &MeshPacket) {
        let Some(relayed) = maybe_forward(packet, self.id()) else {
            return;
        };

        debug!(
            "node {}: forwarding {:#010x} ttl {}",
            self.id(),
            relayed.message_id,
            relayed.ttl
        );
        if self.transmit(&relayed) {
            self.stats.packets_forwarded += 1;
        }
    }

    fn transmit(&mut self, packet: &MeshPacket) -> bool {
        match self.transport.send_frame(&packet.encode()) {
            Ok(()) => {
                self.stats.frames_sent += 1;
                true
            }
            Err(e) => {
                warn!(
                    "node {}: transmit of {:#010x} failed: {}",
                    self.id(),
                    packet.message_id,
                    e
                );
                self.stats.send_failures += 1;
                false
            }
        }
    }
}
