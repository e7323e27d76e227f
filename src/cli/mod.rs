//! Command-line interface for sudobot.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli, Commands, CoordinatorArgs, WorkerArgs};
