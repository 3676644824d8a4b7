use anyhow::{Context, Result, bail};

use floodmesh::{BROADCAST, Command, NodeEvent};

/// A send request typed on the console.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SendRequest {
    pub dest: u8,
    pub command: Command,
    pub payload: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleInput {
    Send(SendRequest),
    Stats,
    Quit,
}

fn parse_dest(token: Option<&str>) -> Result<u8> {
    match token {
        Some("all") | Some("broadcast") => Ok(BROADCAST),
        Some(value) => value
            .parse()
            .with_context(|| format!("invalid destination '{}'", value)),
        None => bail!("missing destination"),
    }
}

fn parse_payload(token: Option<&str>) -> Result<f32> {
    token.map_or(Ok(0.0), |value| {
        value
            .parse()
            .with_context(|| format!("invalid payload '{}'", value))
    })
}

/// Parses `open <dest> [payload]`, `close <dest> [payload]`,
/// `send <dest> <code> [payload]`, `stats` or `quit`.
pub fn parse_input(line: &str) -> Result<Option<ConsoleInput>> {
    let mut tokens = line.split_whitespace();
    let Some(verb) = tokens.next() else {
        return Ok(None);
    };

    let command = match verb {
        "open" => Command::Open,
        "close" => Command::Close,
        "send" => {
            let dest = parse_dest(tokens.next())?;
            let code: u8 = tokens
                .next()
                .context("missing command code")?
                .parse()
                .context("invalid command code")?;
            let payload = parse_payload(tokens.next())?;
            return Ok(Some(ConsoleInput::Send(SendRequest {
                dest,
                command: Command::from(code),
                payload,
            })));
        }
        "stats" => return Ok(Some(ConsoleInput::Stats)),
        "quit" | "exit" => return Ok(Some(ConsoleInput::Quit)),
        other => bail!("unknown input '{}'", other),
    };

    let dest = parse_dest(tokens.next())?;
    let payload = parse_payload(tokens.next())?;
    Ok(Some(ConsoleInput::Send(SendRequest {
        dest,
        command,
        payload,
    })))
}

pub fn log_event(node: u8, event: &NodeEvent) {
    match event {
        NodeEvent::CommandReceived {
            message_id,
            source,
            command,
            payload,
            ..
        } => {
            log::info!(
                "[node {}] {:?} ({}) from node {} (id {:#010x})",
                node,
                command,
                payload,
                source,
                message_id
            );
        }
        NodeEvent::Delivered {
            message_id,
            dest,
            retries,
            rtt_ms,
        } => {
            log::info!(
                "[node {}] {:#010x} delivered to node {} in {} ms after {} retries",
                node,
                message_id,
                dest,
                rtt_ms,
                retries
            );
        }
        NodeEvent::DeliveryFailed {
            message_id,
            dest,
            command,
            attempts,
        } => {
            log::warn!(
                "[node {}] {:?} {:#010x} to node {} failed after {} attempts",
                node,
                command,
                message_id,
                dest,
                attempts
            );
        }
        NodeEvent::Untracked { message_id, dest } => {
            log::warn!(
                "[node {}] {:#010x} to node {} sent without ACK tracking",
                node,
                message_id,
                dest
            );
        }
        NodeEvent::MalformedFrame { len } => {
            log::warn!("[node {}] dropped malformed {} byte frame", node, len);
        }
    }
}
