//! Murmur CLI - drive simulated swarms from the command line.

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::run::RunOptions;

#[derive(Parser)]
#[command(name = "murmur")]
#[command(author, version, about = "Murmur - per-agent control for store-coordinated swarms", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default murmur.toml
    Init {
        /// Project directory (default: current directory)
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Run a simulated swarm in this process
    Run {
        /// Number of agents (overrides [swarm].agents)
        #[arg(short, long)]
        agents: Option<usize>,

        /// Ticks per agent (overrides [swarm].ticks)
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Tick rate per agent, 0 for unthrottled (overrides [swarm].hz)
        #[arg(long)]
        hz: Option<f64>,

        /// Algorithm for the swarm command (replaces [algorithm])
        #[arg(long)]
        algorithm: Option<String>,

        /// Algorithm argument as key=value; repeatable
        #[arg(long = "arg", value_name = "KEY=VALUE")]
        args: Vec<String>,

        /// Print the commander's store as JSON afterwards
        #[arg(long)]
        dump: bool,
    },

    /// Show the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { path } => commands::init::run(path),
        Commands::Run {
            agents,
            ticks,
            hz,
            algorithm,
            args,
            dump,
        } => commands::run::run(RunOptions {
            agents,
            ticks,
            hz,
            algorithm,
            args,
            dump,
            verbose: cli.verbose,
        }),
        Commands::Config => commands::config::run(),
    }
}
