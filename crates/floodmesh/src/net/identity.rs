const TIME_BITS: u32 = 24;
const TIME_MASK: u32 = (1 << TIME_BITS) - 1;
const TIME_WRAP_THRESHOLD: u32 = TIME_MASK / 2;

/// Packs `node` into the high byte and the low 24 bits of `time_sample` below it.
///
/// Two nodes sending within the same 24-bit tick cannot collide because the
/// node byte differs; the residual risk is one node wrapping its 24-bit time
/// counter (about 4.6 hours at millisecond resolution) inside the dedup window.
#[inline]
pub fn generate_id(node: u8, time_sample: u64) -> u32 {
    ((node as u32) << TIME_BITS) | (time_sample as u32 & TIME_MASK)
}

#[inline]
fn tick_greater_than(t1: u32, t2: u32) -> bool {
    ((t1 > t2) && (t1 - t2 <= TIME_WRAP_THRESHOLD))
        || ((t1 < t2) && (t2 - t1 > TIME_WRAP_THRESHOLD))
}

/// Per-node id source that never hands out the same time sample twice in a row.
///
/// Sends issued within the same millisecond get consecutive samples instead of
/// identical ids.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    node: u8,
    last_sample: Option<u32>,
}

impl IdGenerator {
    pub fn new(node: u8) -> Self {
        Self {
            node,
            last_sample: None,
        }
    }

    pub fn node(&self) -> u8 {
        self.node
    }

    pub fn next_id(&mut self, now_ms: u64) -> u32 {
        let mut sample = now_ms as u32 & TIME_MASK;
        if let Some(last) = self.last_sample {
            if !tick_greater_than(sample, last) {
                sample = last.wrapping_add(1) & TIME_MASK;
            }
        }
        self.last_sample = Some(sample);
        generate_id(self.node, sample as u64)
    }
}
