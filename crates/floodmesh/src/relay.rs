use log::info;

use crate::net::Actuator;

pub const DEFAULT_RELAY_HOLD_MS: u64 = 1000;

/// Timed output: `open` energizes it for a bounded hold, after which
/// [`RelayActuator::update`] releases it. `close` releases immediately.
#[derive(Debug, Clone)]
pub struct RelayActuator {
    hold_ms: u64,
    opened_at_ms: Option<u64>,
    activations: u64,
}

impl Default for RelayActuator {
    fn default() -> Self {
        Self::new(DEFAULT_RELAY_HOLD_MS)
    }
}

impl RelayActuator {
    pub fn new(hold_ms: u64) -> Self {
        Self {
            hold_ms,
            opened_at_ms: None,
            activations: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.opened_at_ms.is_some()
    }

    /// Number of times the output has been energized.
    pub fn activations(&self) -> u64 {
        self.activations
    }

    pub fn hold_ms(&self) -> u64 {
        self.hold_ms
    }

    /// Releases the output once the hold has elapsed. Returns `true` on release.
    pub fn update(&mut self, now_ms: u64) -> bool {
        match self.opened_at_ms {
            Some(opened) if now_ms.saturating_sub(opened) >= self.hold_ms => {
                self.release();
                true
            }
            _ => false,
        }
    }

    fn release(&mut self) {
        self.opened_at_ms = None;
        info!("relay off");
    }
}

impl Actuator for RelayActuator {
    fn open(&mut self, _payload: f32, now_ms: u64) {
        if !self.is_active() {
            self.activations += 1;
        }
        // Re-opening restarts the hold.
        self.opened_at_ms = Some(now_ms);
        info!("relay on");
    }

    fn close(&mut self, _payload: f32, _now_ms: u64) {
        self.release();
    }
}
