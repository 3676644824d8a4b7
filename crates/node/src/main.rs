mod config;
mod events;
mod runner;
mod simulation;

use anyhow::Result;
use clap::{Parser, Subcommand};

use runner::RunArgs;
use simulation::SimulateArgs;

#[derive(Parser)]
#[command(name = "floodmesh-node")]
#[command(about = "TTL-bounded flood mesh node")]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Run a node over UDP, reading send requests from stdin
    Run(RunArgs),
    /// Run an in-memory chain of nodes and report delivery
    Simulate(SimulateArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match cli.mode {
        Mode::Run(args) => runner::run(args),
        Mode::Simulate(args) => simulation::simulate(args),
    }
}
