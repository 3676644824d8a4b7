use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use std::rc::Rc;

use log::trace;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::stats::PacketLossSimulation;
use super::transport::{Transport, TransportError};

#[derive(Debug)]
struct DelayedFrame {
    release_ms: u64,
    order: u64,
    frame: Vec<u8>,
}

impl PartialEq for DelayedFrame {
    fn eq(&self, other: &Self) -> bool {
        self.release_ms == other.release_ms && self.order == other.order
    }
}

impl Eq for DelayedFrame {}

impl PartialOrd for DelayedFrame {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedFrame {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .release_ms
            .cmp(&self.release_ms)
            .then_with(|| other.order.cmp(&self.order))
    }
}

#[derive(Debug, Default)]
struct Station {
    inbox: BinaryHeap<DelayedFrame>,
    transmit_fault: bool,
}

#[derive(Debug)]
struct MediumState {
    stations: BTreeMap<u8, Station>,
    links: BTreeMap<u8, BTreeSet<u8>>,
    loss: PacketLossSimulation,
    rng: StdRng,
    now_ms: u64,
    next_order: u64,
    frames_dropped: u64,
    frames_transmitted: u64,
}

impl MediumState {
    fn deliver(&mut self, to: u8, frame: Vec<u8>, delay_ms: u64) {
        let order = self.next_order;
        self.next_order += 1;
        let release_ms = self.now_ms + delay_ms;

        if let Some(station) = self.stations.get_mut(&to) {
            station.inbox.push(DelayedFrame {
                release_ms,
                order,
                frame,
            });
        }
    }
}

/// In-memory shared radio medium. A frame sent by one station reaches every
/// linked station, subject to the medium's loss and latency simulation.
#[derive(Debug, Clone)]
pub struct RadioMedium {
    inner: Rc<RefCell<MediumState>>,
}

impl RadioMedium {
    pub fn new(seed: u64) -> Self {
        Self::with_loss(PacketLossSimulation::default(), seed)
    }

    pub fn with_loss(loss: PacketLossSimulation, seed: u64) -> Self {
        Self {
            inner: Rc::new(RefCell::new(MediumState {
                stations: BTreeMap::new(),
                links: BTreeMap::new(),
                loss,
                rng: StdRng::seed_from_u64(seed),
                now_ms: 0,
                next_order: 0,
                frames_dropped: 0,
                frames_transmitted: 0,
            })),
        }
    }

    pub fn attach(&self, node: u8) -> SimulatedRadio {
        self.inner
            .borrow_mut()
            .stations
            .entry(node)
            .or_default();

        SimulatedRadio {
            node,
            medium: Rc::clone(&self.inner),
        }
    }

    pub fn link(&self, a: u8, b: u8) {
        if a == b {
            return;
        }
        let mut inner = self.inner.borrow_mut();
        inner.links.entry(a).or_default().insert(b);
        inner.links.entry(b).or_default().insert(a);
    }

    pub fn unlink(&self, a: u8, b: u8) {
        let mut inner = self.inner.borrow_mut();
        if let Some(peers) = inner.links.get_mut(&a) {
            peers.remove(&b);
        }
        if let Some(peers) = inner.links.get_mut(&b) {
            peers.remove(&a);
        }
    }

    /// Links each node to the next one: `nodes[0] - nodes[1] - ... - nodes[n-1]`.
    pub fn link_chain(&self, nodes: &[u8]) {
        for pair in nodes.windows(2) {
            self.link(pair[0], pair[1]);
        }
    }

    pub fn neighbors(&self, node: u8) -> Vec<u8> {
        self.inner
            .borrow()
            .links
            .get(&node)
            .map(|peers| peers.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn set_loss(&self, loss: PacketLossSimulation) {
        self.inner.borrow_mut().loss = loss;
    }

    pub fn set_time(&self, now_ms: u64) {
        self.inner.borrow_mut().now_ms = now_ms;
    }

    pub fn now_ms(&self) -> u64 {
        self.inner.borrow().now_ms
    }

    /// Makes every subsequent send from `node` fail until cleared.
    pub fn set_transmit_fault(&self, node: u8, fault: bool) {
        if let Some(station) = self.inner.borrow_mut().stations.get_mut(&node) {
            station.transmit_fault = fault;
        }
    }

    /// Places a raw frame directly in `node`'s inbox, bypassing links and loss.
    pub fn inject(&self, node: u8, frame: &[u8]) {
        self.inner.borrow_mut().deliver(node, frame.to_vec(), 0);
    }

    pub fn frames_in_flight(&self) -> usize {
        self.inner
            .borrow()
            .stations
            .values()
            .map(|s| s.inbox.len())
            .sum()
    }

    pub fn frames_dropped(&self) -> u64 {
        self.inner.borrow().frames_dropped
    }

    pub fn frames_transmitted(&self) -> u64 {
        self.inner.borrow().frames_transmitted
    }
}

/// One station's handle onto a [`RadioMedium`].
#[derive(Debug)]
pub struct SimulatedRadio {
    node: u8,
    medium: Rc<RefCell<MediumState>>,
}

impl SimulatedRadio {
    pub fn node(&self) -> u8 {
        self.node
    }
}

impl Transport for SimulatedRadio {
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        let mut medium = self.medium.borrow_mut();
        let station = medium
            .stations
            .get(&self.node)
            .ok_or(TransportError::Detached(self.node))?;
        if station.transmit_fault {
            return Err(TransportError::TransmitFault(self.node));
        }

        medium.frames_transmitted += 1;
        let peers: Vec<u8> = medium
            .links
            .get(&self.node)
            .map(|p| p.iter().copied().collect())
            .unwrap_or_default();

        for peer in peers {
            let state = &mut *medium;
            if state.loss.should_drop(&mut state.rng) {
                trace!("medium dropped frame {} -> {}", self.node, peer);
                state.frames_dropped += 1;
                continue;
            }
            let delay = state.loss.delay_ms(&mut state.rng) as u64;
            state.deliver(peer, frame.to_vec(), delay);
        }

        Ok(())
    }

    fn poll_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut medium = self.medium.borrow_mut();
        let now_ms = medium.now_ms;
        let station = medium
            .stations
            .get_mut(&self.node)
            .ok_or(TransportError::Detached(self.node))?;

        let ready = station
            .inbox
            .peek()
            .is_some_and(|delayed| delayed.release_ms <= now_ms);
        if ready {
            Ok(station.inbox.pop().map(|delayed| delayed.frame))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_reach_linked_stations_only() {
        let medium = RadioMedium::new(1);
        let mut a = medium.attach(1);
        let mut b = medium.attach(2);
        let mut c = medium.attach(3);
        medium.link(1, 2);

        a.send_frame(&[1, 2, 3]).unwrap();

        assert_eq!(b.poll_frame().unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(b.poll_frame().unwrap(), None);
        assert_eq!(c.poll_frame().unwrap(), None);
        assert_eq!(a.poll_frame().unwrap(), None);
    }

    #[test]
    fn test_frames_arrive_in_send_order() {
        let medium = RadioMedium::new(1);
        let mut a = medium.attach(1);
        let mut b = medium.attach(2);
        medium.link(1, 2);

        for i in 0..5u8 {
            a.send_frame(&[i]).unwrap();
        }
        for i in 0..5u8 {
            assert_eq!(b.poll_frame().unwrap(), Some(vec![i]));
        }
    }

    #[test]
    fn test_latency_holds_frames_until_release() {
        let loss = PacketLossSimulation {
            enabled: true,
            loss_percent: 0.0,
            min_latency_ms: 50,
            max_latency_ms: 50,
            jitter_ms: 0,
        };
        let medium = RadioMedium::with_loss(loss, 3);
        let mut a = medium.attach(1);
        let mut b = medium.attach(2);
        medium.link(1, 2);

        a.send_frame(&[9]).unwrap();
        medium.set_time(49);
        assert_eq!(b.poll_frame().unwrap(), None);
        medium.set_time(50);
        assert_eq!(b.poll_frame().unwrap(), Some(vec![9]));
    }

    #[test]
    fn test_total_loss_and_faults() {
        let medium = RadioMedium::with_loss(PacketLossSimulation::lossy(100.0), 5);
        let mut a = medium.attach(1);
        let mut b = medium.attach(2);
        medium.link(1, 2);

        a.send_frame(&[1]).unwrap();
        assert_eq!(b.poll_frame().unwrap(), None);
        assert_eq!(medium.frames_dropped(), 1);

        medium.set_transmit_fault(1, true);
        assert!(matches!(
            a.send_frame(&[1]),
            Err(TransportError::TransmitFault(1))
        ));
    }

    #[test]
    fn test_unlink_and_inject() {
        let medium = RadioMedium::new(1);
        let mut a = medium.attach(1);
        let mut b = medium.attach(2);
        medium.link_chain(&[1, 2]);
        assert_eq!(medium.neighbors(1), vec![2]);

        medium.unlink(1, 2);
        a.send_frame(&[1]).unwrap();
        assert_eq!(b.poll_frame().unwrap(), None);

        medium.inject(2, &[7, 7]);
        assert_eq!(b.poll_frame().unwrap(), Some(vec![7, 7]));
    }
}
