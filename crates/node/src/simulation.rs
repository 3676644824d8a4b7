use anyhow::{Context, Result, ensure};
use clap::Args;

use floodmesh::{Command, MeshSimulation, PacketLossSimulation};

use crate::config::NodeArgs;
use crate::events::log_event;

#[derive(Debug, Args)]
pub struct SimulateArgs {
    #[arg(long, default_value_t = 5, help = "Nodes in the chain")]
    pub nodes: u8,

    #[arg(long, default_value_t = 0.0, help = "Packet loss percentage (0-100)")]
    pub loss_percent: f32,

    #[arg(long, default_value_t = 0, help = "Minimum latency in ms")]
    pub min_latency: u32,

    #[arg(long, default_value_t = 0, help = "Maximum latency in ms")]
    pub max_latency: u32,

    #[arg(long, default_value_t = 0, help = "Jitter in ms")]
    pub jitter: u32,

    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    #[arg(long, default_value_t = 2000, help = "Upper bound on simulation steps")]
    pub steps: usize,

    #[command(flatten)]
    pub node: NodeArgs,
}

/// Sends OPEN across a chain `1 - 2 - ... - N` and reports what happened.
pub fn simulate(args: SimulateArgs) -> Result<()> {
    ensure!(
        (2..=254).contains(&args.nodes),
        "a chain needs between 2 and 254 nodes"
    );
    let template = args.node.resolve()?;

    let loss = PacketLossSimulation {
        enabled: args.loss_percent > 0.0 || args.max_latency > 0,
        loss_percent: args.loss_percent.clamp(0.0, 100.0),
        min_latency_ms: args.min_latency,
        max_latency_ms: args.max_latency,
        jitter_ms: args.jitter,
    };
    let mut sim = MeshSimulation::chain(args.nodes, &template, loss, args.seed)?;

    let now_ms = sim.now_ms();
    let message_id = sim
        .node_mut(1)
        .context("chain has no node 1")?
        .send_unicast(args.nodes, Command::Open, 0.0, now_ms)?;
    log::info!(
        "node 1 sent OPEN {:#010x} to node {} across {} hops",
        message_id,
        args.nodes,
        args.nodes - 1
    );

    let steps = sim.run_until_quiet(args.steps);
    for (node, event) in sim.drain_events() {
        log_event(node, &event);
    }

    log::info!(
        "finished after {} steps ({} ms simulated), {} frames on air, {} lost",
        steps,
        sim.now_ms(),
        sim.medium().frames_transmitted(),
        sim.medium().frames_dropped()
    );
    for node in sim.nodes() {
        log::info!(
            "node {}: {}",
            node.id(),
            serde_json::to_string(node.stats()).context("failed to encode stats")?
        );
    }

    Ok(())
}
