//! CLI command definitions for sudobot.
//!
//! One binary, two run modes: the coordinator drives the solve loop, the
//! worker accepts forwarded batches. Both serve a small control API.

use clap::Parser;

use crate::config::Config;
use crate::server::{serve_coordinator, serve_worker, CoordinatorState, WorkerApp};

/// Default control-API port for the coordinator.
const DEFAULT_COORDINATOR_PORT: u16 = 8080;

/// Default control-API port for the worker.
const DEFAULT_WORKER_PORT: u16 = 8081;

/// Automated Sudoku puzzle-service bot.
#[derive(Parser)]
#[command(name = "sudobot")]
#[command(about = "Automated solver bot for the remote Sudoku puzzle service")]
#[command(version)]
#[command(
    long_about = "sudobot repeatedly fetches a puzzle, solves it by backtracking, and submits the answers cell-by-cell.\n\nRun a coordinator alone, or pair it with a worker process to split each round's submissions.\n\nExample usage:\n  sudobot coordinator --port 8080\n  sudobot worker --port 8081"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the coordinator: fetch, solve and submit puzzles in a loop.
    #[command(alias = "coord")]
    Coordinator(CoordinatorArgs),

    /// Run the worker: accept cell batches and submit them concurrently.
    Worker(WorkerArgs),
}

/// Arguments for `sudobot coordinator`.
#[derive(Parser, Debug)]
pub struct CoordinatorArgs {
    /// Port for the control API.
    #[arg(short, long, default_value_t = DEFAULT_COORDINATOR_PORT, env = "PORT")]
    pub port: u16,

    /// Base URL of the remote puzzle service.
    #[arg(long, env = "SUDOBOT_BASE_URL")]
    pub base_url: Option<String>,
}

/// Arguments for `sudobot worker`.
#[derive(Parser, Debug)]
pub struct WorkerArgs {
    /// Port for the control API.
    #[arg(short, long, default_value_t = DEFAULT_WORKER_PORT, env = "PORT")]
    pub port: u16,

    /// Base URL of the remote puzzle service.
    #[arg(long, env = "SUDOBOT_BASE_URL")]
    pub base_url: Option<String>,
}

/// Parse command-line arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Execute the parsed command. Serves until the process is terminated.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Coordinator(args) => {
            let config = build_config(args.base_url);
            serve_coordinator(CoordinatorState::new(config), args.port).await
        }
        Commands::Worker(args) => {
            let config = build_config(args.base_url);
            serve_worker(WorkerApp::new(config), args.port).await
        }
    }
}

fn build_config(base_url: Option<String>) -> Config {
    match base_url {
        Some(url) => Config::new().with_base_url(url),
        None => Config::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinator_defaults() {
        let cli = Cli::try_parse_from(["sudobot", "coordinator"]).expect("parse");

        match cli.command {
            Commands::Coordinator(args) => {
                assert_eq!(args.port, DEFAULT_COORDINATOR_PORT);
                assert!(args.base_url.is_none());
            }
            _ => panic!("expected coordinator subcommand"),
        }
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_parse_worker_with_overrides() {
        let cli = Cli::try_parse_from([
            "sudobot",
            "worker",
            "--port",
            "9001",
            "--base-url",
            "http://localhost:9000",
            "--log-level",
            "debug",
        ])
        .expect("parse");

        match cli.command {
            Commands::Worker(args) => {
                assert_eq!(args.port, 9001);
                assert_eq!(args.base_url.as_deref(), Some("http://localhost:9000"));
            }
            _ => panic!("expected worker subcommand"),
        }
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn test_missing_subcommand_fails() {
        assert!(Cli::try_parse_from(["sudobot"]).is_err());
    }
}
