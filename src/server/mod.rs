//! Control-surface HTTP servers.
//!
//! Each process exposes a small JSON API: the coordinator for
//! start/stop/token/status, the worker for initialize/solve-batch/stop.
//! Every operation answers a `{ success, message, ... }` envelope;
//! configuration errors come back as HTTP 400 and never touch the
//! process or a running loop.

pub mod coordinator;
pub mod worker;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::error::ControlError;

pub use coordinator::{serve_coordinator, CoordinatorState};
pub use worker::{serve_worker, WorkerApp};

/// Uniform envelope for control operations without a payload.
#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub success: bool,
    pub message: String,
}

impl ControlResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Map a configuration error to its HTTP 400 response.
pub(crate) fn reject(error: &ControlError) -> (StatusCode, Json<ControlResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ControlResponse::error(error.to_string())),
    )
}
