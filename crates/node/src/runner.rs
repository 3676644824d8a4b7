use std::io::{self, BufRead};
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;

use floodmesh::{MeshNode, RelayActuator, UdpTransport};

use crate::config::{DEFAULT_PORT, NodeArgs};
use crate::events::{ConsoleInput, log_event, parse_input};

#[derive(Debug, Args)]
pub struct RunArgs {
    #[arg(short, long, default_value = "0.0.0.0")]
    pub bind: String,

    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[arg(long = "peer", help = "Address of a node within radio range (repeatable)")]
    pub peers: Vec<String>,

    #[arg(long, default_value_t = floodmesh::relay::DEFAULT_RELAY_HOLD_MS, help = "Milliseconds the relay stays open")]
    pub relay_hold_ms: u64,

    #[command(flatten)]
    pub node: NodeArgs,
}

fn resolve_peer(peer: &str) -> Result<SocketAddr> {
    peer.to_socket_addrs()
        .with_context(|| format!("invalid peer address '{}'", peer))?
        .next()
        .with_context(|| format!("peer '{}' resolved to no address", peer))
}

/// Reads console lines on a helper thread so the control loop never blocks on stdin.
fn spawn_console() -> Receiver<ConsoleInput> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_input(&line) {
                Ok(Some(input)) => {
                    if tx.send(input).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => log::warn!("{:#}", e),
            }
        }
    });
    rx
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = args.node.resolve()?;

    let mut transport = UdpTransport::bind((args.bind.as_str(), args.port))
        .with_context(|| format!("failed to bind {}:{}", args.bind, args.port))?;
    for peer in &args.peers {
        transport.add_peer(resolve_peer(peer)?);
    }
    if transport.peers().is_empty() {
        log::warn!("no peers configured, frames will go nowhere");
    }

    let local_addr = transport.local_addr();
    let mut node = MeshNode::new(config, transport, RelayActuator::new(args.relay_hold_ms))?;
    log::info!("node {} listening on {}", node.id(), local_addr);

    let console = spawn_console();
    let start = Instant::now();

    loop {
        let now_ms = start.elapsed().as_millis() as u64;

        if let Err(e) = node.run_once(now_ms) {
            log::warn!("receive failed: {}", e);
        }
        node.actuator_mut().update(now_ms);

        match console.try_recv() {
            Ok(ConsoleInput::Send(request)) => {
                if let Err(e) =
                    node.send_unicast(request.dest, request.command, request.payload, now_ms)
                {
                    log::warn!("send rejected: {}", e);
                }
            }
            Ok(ConsoleInput::Stats) => log::info!("{:?}", node.stats()),
            Ok(ConsoleInput::Quit) => break,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
        }

        let id = node.id();
        for event in node.drain_events() {
            log_event(id, &event);
        }

        thread::sleep(Duration::from_millis(1));
    }

    log::info!("node {} shutting down: {:?}", node.id(), node.stats());
    Ok(())
}
