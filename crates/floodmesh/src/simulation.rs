use log::warn;

use crate::config::NodeConfig;
use crate::net::{PacketLossSimulation, RadioMedium, SimulatedRadio};
use crate::node::{MeshNode, NodeError, NodeEvent};
use crate::relay::RelayActuator;

pub const DEFAULT_STEP_MS: u64 = 10;

pub type SimulatedNode = MeshNode<SimulatedRadio, RelayActuator>;

/// A set of nodes sharing one [`RadioMedium`], advanced in lock-step.
///
/// Each step moves simulated time forward and runs one control-loop
/// iteration on every node in id order.
pub struct MeshSimulation {
    medium: RadioMedium,
    nodes: Vec<SimulatedNode>,
    now_ms: u64,
    step_ms: u64,
}

impl MeshSimulation {
    pub fn new(medium: RadioMedium, step_ms: u64) -> Self {
        Self {
            medium,
            nodes: Vec::new(),
            now_ms: 0,
            step_ms: step_ms.max(1),
        }
    }

    /// Nodes `1..=count` linked in a line, each built from `template` with its own id.
    pub fn chain(
        count: u8,
        template: &NodeConfig,
        loss: PacketLossSimulation,
        seed: u64,
    ) -> Result<Self, NodeError> {
        let mut sim = Self::new(RadioMedium::with_loss(loss, seed), DEFAULT_STEP_MS);
        let ids: Vec<u8> = (1..=count).collect();
        for &id in &ids {
            sim.add_node(
                NodeConfig {
                    node_id: id,
                    ..template.clone()
                },
                RelayActuator::default(),
            )?;
        }
        sim.medium.link_chain(&ids);
        Ok(sim)
    }

    pub fn add_node(&mut self, config: NodeConfig, relay: RelayActuator) -> Result<(), NodeError> {
        if self.node(config.node_id).is_some() {
            return Err(NodeError::DuplicateNode(config.node_id));
        }
        config.validate()?;

        let radio = self.medium.attach(config.node_id);
        let node = MeshNode::new(config, radio, relay)?;
        self.nodes.push(node);
        self.nodes.sort_by_key(|n| n.id());
        Ok(())
    }

    pub fn medium(&self) -> &RadioMedium {
        &self.medium
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn nodes(&self) -> &[SimulatedNode] {
        &self.nodes
    }

    pub fn node(&self, id: u8) -> Option<&SimulatedNode> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    pub fn node_mut(&mut self, id: u8) -> Option<&mut SimulatedNode> {
        self.nodes.iter_mut().find(|n| n.id() == id)
    }

    /// Returns the number of frames handled across all nodes.
    pub fn step(&mut self) -> usize {
        self.now_ms += self.step_ms;
        self.medium.set_time(self.now_ms);

        let mut handled = 0;
        for node in &mut self.nodes {
            match node.run_once(self.now_ms) {
                Ok(true) => handled += 1,
                Ok(false) => {}
                Err(e) => warn!("node {}: receive failed: {}", node.id(), e),
            }
            node.actuator_mut().update(self.now_ms);
        }
        handled
    }

    /// True once no frame is on the air and no delivery awaits an ACK.
    pub fn is_quiet(&self) -> bool {
        self.medium.frames_in_flight() == 0 && self.nodes.iter().all(|n| n.pending().is_empty())
    }

    /// Steps until quiet or `max_steps` elapse. Returns the number of steps taken.
    pub fn run_until_quiet(&mut self, max_steps: usize) -> usize {
        let mut steps = 0;
        while steps < max_steps {
            self.step();
            steps += 1;
            if self.is_quiet() {
                break;
            }
        }
        steps
    }

    pub fn drain_events(&mut self) -> Vec<(u8, NodeEvent)> {
        let mut events = Vec::new();
        for node in &mut self.nodes {
            let id = node.id();
            events.extend(node.drain_events().map(|e| (id, e)));
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Command;

    #[test]
    fn test_chain_topology() {
        let sim = MeshSimulation::chain(
            4,
            &NodeConfig::default(),
            PacketLossSimulation::default(),
            1,
        )
        .unwrap();

        assert_eq!(sim.nodes().len(), 4);
        assert_eq!(sim.medium().neighbors(1), vec![2]);
        assert_eq!(sim.medium().neighbors(2), vec![1, 3]);
        assert_eq!(sim.medium().neighbors(4), vec![3]);
    }

    #[test]
    fn test_rejects_duplicate_node_id() {
        let mut sim = MeshSimulation::chain(
            2,
            &NodeConfig::default(),
            PacketLossSimulation::default(),
            1,
        )
        .unwrap();

        let result = sim.add_node(NodeConfig::for_node(2), RelayActuator::default());
        assert!(matches!(result, Err(NodeError::DuplicateNode(2))));
        assert_eq!(sim.nodes().len(), 2);

        sim.add_node(NodeConfig::for_node(3), RelayActuator::default())
            .unwrap();
        assert_eq!(sim.nodes().len(), 3);
    }

    #[test]
    fn test_relay_released_after_hold() {
        let mut sim = MeshSimulation::chain(
            2,
            &NodeConfig::default(),
            PacketLossSimulation::default(),
            1,
        )
        .unwrap();

        let now = sim.now_ms();
        sim.node_mut(1)
            .unwrap()
            .send_unicast(2, Command::Open, 0.0, now)
            .unwrap();
        sim.step();
        assert!(sim.node(2).unwrap().actuator().is_active());

        for _ in 0..150 {
            sim.step();
        }
        assert!(!sim.node(2).unwrap().actuator().is_active());
        assert_eq!(sim.node(2).unwrap().actuator().activations(), 1);
    }
}
