use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketLossSimulation {
    pub enabled: bool,
    pub loss_percent: f32,
    pub min_latency_ms: u32,
    pub max_latency_ms: u32,
    pub jitter_ms: u32,
}

impl PacketLossSimulation {
    pub fn lossy(loss_percent: f32) -> Self {
        Self {
            enabled: true,
            loss_percent,
            ..Default::default()
        }
    }

    pub fn should_drop<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        if !self.enabled || self.loss_percent <= 0.0 {
            return false;
        }
        rng.gen_bool((self.loss_percent as f64 / 100.0).min(1.0))
    }

    pub fn delay_ms<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        if !self.enabled || self.max_latency_ms == 0 {
            return 0;
        }
        let base = self.min_latency_ms.min(self.max_latency_ms);
        let latency = rng.gen_range(base..=self.max_latency_ms);
        let jitter = if self.jitter_ms > 0 {
            rng.gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        latency + jitter
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeStats {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub send_failures: u64,
    pub malformed_frames: u64,
    pub duplicates_dropped: u64,
    pub packets_forwarded: u64,
    pub commands_executed: u64,
    pub unknown_commands: u64,
    pub acks_sent: u64,
    pub acks_received: u64,
    pub unmatched_acks: u64,
    pub retransmissions: u64,
    pub deliveries_confirmed: u64,
    pub delivery_failures: u64,
    pub untracked_sends: u64,
    pub rtt_ms: f32,
    pub rtt_variance: f32,
}
