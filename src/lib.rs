//! sudobot: automated client for a remote Sudoku puzzle service.
//!
//! Fetches boards, solves them by exhaustive backtracking, and submits
//! the answers cell-by-cell, optionally splitting each round's work with
//! a peer worker process.

// Core modules
pub mod board;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod remote;
pub mod rounds;
pub mod server;
pub mod session;
pub mod solver;
pub mod worker;

// Re-export commonly used error types
pub use error::{ControlError, RemoteError, RoundError};
