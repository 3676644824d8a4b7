use super::protocol::{Command, MeshPacket};

pub const DEFAULT_PENDING_CAPACITY: usize = 5;
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_MAX_RETRIES: u8 = 3;

/// A locally originated unicast message awaiting its ACK.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingDelivery {
    pub message_id: u32,
    pub dest: u8,
    pub command: Command,
    pub payload: f32,
    pub send_time_ms: u64,
    pub retry_count: u8,
}

impl PendingDelivery {
    pub fn is_timed_out(&self, now_ms: u64, ack_timeout_ms: u64) -> bool {
        now_ms.saturating_sub(self.send_time_ms) > ack_timeout_ms
    }

    /// The packet to put back on the air; the message id is never regenerated.
    pub fn to_packet(&self, source: u8, ttl: u8) -> MeshPacket {
        MeshPacket {
            message_id: self.message_id,
            source,
            dest: self.dest,
            ttl,
            command: self.command,
            payload: self.payload,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickAction {
    /// Timed out with retries left; already re-armed, caller must retransmit.
    Resend(PendingDelivery),
    /// Timed out with no retries left; removed from the table.
    Failed(PendingDelivery),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delivered {
    pub delivery: PendingDelivery,
    pub rtt_ms: u64,
}

/// Reliable-delivery table: fixed capacity, unordered, retried on timeout.
#[derive(Debug)]
pub struct DeliveryTracker {
    pending: Vec<PendingDelivery>,
    capacity: usize,
    ack_timeout_ms: u64,
    max_retries: u8,
    srtt: f32,
    rtt_var: f32,
}

impl Default for DeliveryTracker {
    fn default() -> Self {
        Self::new(
            DEFAULT_PENDING_CAPACITY,
            DEFAULT_ACK_TIMEOUT_MS,
            DEFAULT_MAX_RETRIES,
        )
    }
}

impl DeliveryTracker {
    pub fn new(capacity: usize, ack_timeout_ms: u64, max_retries: u8) -> Self {
        Self {
            pending: Vec::with_capacity(capacity),
            capacity,
            ack_timeout_ms,
            max_retries,
            srtt: ack_timeout_ms as f32 / 2.0,
            rtt_var: ack_timeout_ms as f32 / 4.0,
        }
    }

    /// Starts tracking a sent message. Returns `false` when the table is full
    /// and the message goes out unmonitored.
    pub fn enqueue(
        &mut self,
        dest: u8,
        command: Command,
        payload: f32,
        message_id: u32,
        now_ms: u64,
    ) -> bool {
        if self.is_full() {
            return false;
        }

        self.pending.push(PendingDelivery {
            message_id,
            dest,
            command,
            payload,
            send_time_ms: now_ms,
            retry_count: 0,
        });
        true
    }

    pub fn on_ack_received(&mut self, message_id: u32, now_ms: u64) -> Option<Delivered> {
        let index = self
            .pending
            .iter()
            .position(|p| p.message_id == message_id)?;
        let delivery = self.pending.swap_remove(index);
        let rtt_ms = now_ms.saturating_sub(delivery.send_time_ms);

        // An ACK for a retransmitted message is ambiguous about which copy it answers.
        if delivery.retry_count == 0 {
            self.update_rtt(rtt_ms as f32);
        }

        Some(Delivered { delivery, rtt_ms })
    }

    pub fn tick(&mut self, now_ms: u64) -> Vec<TickAction> {
        let mut actions = Vec::new();
        let mut i = 0;

        while i < self.pending.len() {
            let entry = &mut self.pending[i];
            if !entry.is_timed_out(now_ms, self.ack_timeout_ms) {
                i += 1;
                continue;
            }

            if entry.retry_count < self.max_retries {
                entry.retry_count += 1;
                entry.send_time_ms = now_ms;
                actions.push(TickAction::Resend(*entry));
                i += 1;
            } else {
                actions.push(TickAction::Failed(self.pending.swap_remove(i)));
            }
        }

        actions
    }

    fn update_rtt(&mut self, rtt: f32) {
        const ALPHA: f32 = 0.125;
        const BETA: f32 = 0.25;

        let diff = (rtt - self.srtt).abs();
        self.rtt_var = (1.0 - BETA) * self.rtt_var + BETA * diff;
        self.srtt = (1.0 - ALPHA) * self.srtt + ALPHA * rtt;
    }

    pub fn get(&self, message_id: u32) -> Option<&PendingDelivery> {
        self.pending.iter().find(|p| p.message_id == message_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingDelivery> {
        self.pending.iter()
    }

    pub fn srtt(&self) -> f32 {
        self.srtt
    }

    pub fn rtt_var(&self) -> f32 {
        self.rtt_var
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.pending.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
