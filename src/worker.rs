//! Batch submission: the worker-side executor and the coordinator-side
//! forwarder.
//!
//! The worker holds no solving or looping logic. It accepts a batch of
//! cell tasks, validates each task's field ranges, fires all submissions
//! concurrently against the remote service, and reports per-task outcomes
//! plus a completion count. The coordinator reaches it through
//! [`WorkerClient`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::board::CellTask;
use crate::config::Config;
use crate::error::{ControlError, RemoteError};
use crate::remote::PuzzleApi;
use crate::session::SessionStats;

/// Outcome of one task within a batch.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub index: usize,
    pub success: bool,
    pub row: u8,
    pub col: u8,
    pub value: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskOutcome {
    fn accepted(index: usize, task: CellTask, success: bool) -> Self {
        Self {
            index,
            success,
            row: task.row,
            col: task.col,
            value: task.value,
            error: None,
        }
    }

    fn failed(index: usize, task: CellTask, error: String) -> Self {
        Self {
            index,
            success: false,
            row: task.row,
            col: task.col,
            value: task.value,
            error: Some(error),
        }
    }
}

/// Result of executing a batch of cell tasks.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub completed: usize,
    pub total: usize,
    pub processing_ms: u64,
    pub results: Vec<TaskOutcome>,
}

/// Submit `tasks` concurrently through `api` and collect per-task
/// outcomes.
///
/// Tasks with out-of-range fields fail individually without aborting the
/// batch; a rejected or unreachable submission likewise costs only its own
/// task. The report's `total` always equals the input length.
pub async fn execute_batch<A: PuzzleApi>(api: &A, tasks: &[CellTask]) -> BatchReport {
    let started = Instant::now();

    let outcomes = join_all(tasks.iter().enumerate().map(|(index, &task)| async move {
        if !task.in_range() {
            return TaskOutcome::failed(index, task, "task out of range".to_string());
        }
        match api.submit_cell(task).await {
            Ok(success) => TaskOutcome::accepted(index, task, success),
            Err(e) => {
                debug!(%task, error = %e, "Batch submission failed");
                TaskOutcome::failed(index, task, e.to_string())
            }
        }
    }))
    .await;

    let completed = outcomes.iter().filter(|o| o.success).count();
    let report = BatchReport {
        completed,
        total: tasks.len(),
        processing_ms: started.elapsed().as_millis() as u64,
        results: outcomes,
    };

    info!(
        completed = report.completed,
        total = report.total,
        processing_ms = report.processing_ms,
        "Batch processed"
    );

    report
}

/// Completion counts reported back by a peer worker.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSummary {
    pub completed: usize,
    pub total: usize,
}

/// Batch body sent to the peer's `/solve-batch` endpoint.
#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    tasks: &'a [CellTask],
}

/// Coordinator-side client for a peer worker process.
pub struct WorkerClient {
    http_client: Client,
    solve_batch_url: String,
    timeout: Duration,
}

impl WorkerClient {
    /// Client for the worker at `worker_url` (the worker's base address,
    /// e.g. `http://10.0.0.2:8081`).
    pub fn new(http_client: Client, worker_url: &str, config: &Config) -> Self {
        Self {
            http_client,
            solve_batch_url: format!("{}/solve-batch", worker_url.trim_end_matches('/')),
            timeout: config.batch_timeout,
        }
    }

    /// Forward `tasks` as one batch and return the peer's completion
    /// count. Any error here is the caller's cue to count the whole half
    /// as zero completions.
    pub async fn forward_batch(&self, tasks: &[CellTask]) -> Result<BatchSummary, RemoteError> {
        let response = self
            .http_client
            .post(&self.solve_batch_url)
            .timeout(self.timeout)
            .json(&BatchRequest { tasks })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteError::BadStatus {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))
    }
}

/// Worker-process configuration and statistics.
#[derive(Debug, Default)]
struct WorkerState {
    initialized: bool,
    token: String,
    coordinator_url: String,
    stats: SessionStats,
}

/// Read-only view of the worker state for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerSnapshot {
    pub initialized: bool,
    pub has_token: bool,
    pub coordinator_url: Option<String>,
    pub stats: SessionStats,
}

/// Cloneable handle to the shared worker state.
#[derive(Clone, Default)]
pub struct WorkerHandle {
    inner: Arc<Mutex<WorkerState>>,
}

impl WorkerHandle {
    /// A fresh, uninitialized worker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the token and coordinator address, reset statistics, and
    /// mark the worker ready. The coordinator address is informational
    /// only but must at least parse as a URL.
    pub async fn initialize(
        &self,
        token: String,
        coordinator_url: String,
    ) -> Result<(), ControlError> {
        if token.is_empty() {
            return Err(ControlError::MissingToken);
        }
        reqwest::Url::parse(&coordinator_url).map_err(|e| ControlError::InvalidUrl {
            url: coordinator_url.clone(),
            message: e.to_string(),
        })?;

        let token_prefix: String = token.chars().take(10).collect();
        info!(
            token_prefix = %token_prefix,
            coordinator = %coordinator_url,
            "Worker initialized"
        );

        let mut state = self.inner.lock().await;
        state.token = token;
        state.coordinator_url = coordinator_url;
        state.stats = SessionStats::started_now();
        state.initialized = true;
        Ok(())
    }

    /// Clear the configuration and return the final statistics.
    pub async fn stop(&self) -> SessionStats {
        let mut state = self.inner.lock().await;
        state.initialized = false;
        state.token.clear();
        state.coordinator_url.clear();
        state.stats.clone()
    }

    /// The installed token, or an error when the worker was never
    /// initialized (or has been stopped).
    pub async fn current_token(&self) -> Result<String, ControlError> {
        let state = self.inner.lock().await;
        if !state.initialized {
            return Err(ControlError::NotInitialized);
        }
        Ok(state.token.clone())
    }

    /// Fold a finished batch into the cumulative statistics.
    pub async fn record_batch(&self, report: &BatchReport) {
        let mut state = self.inner.lock().await;
        state.stats.total_processed += report.total as u64;
        state.stats.total_success += report.completed as u64;
        state.stats.total_errors += (report.total - report.completed) as u64;
        state.stats.last_elapsed_ms = report.processing_ms;
    }

    /// Zero the cumulative statistics.
    pub async fn reset_stats(&self) {
        let mut state = self.inner.lock().await;
        state.stats = SessionStats::default();
    }

    /// Read-only snapshot for status endpoints.
    pub async fn snapshot(&self) -> WorkerSnapshot {
        let state = self.inner.lock().await;
        WorkerSnapshot {
            initialized: state.initialized,
            has_token: !state.token.is_empty(),
            coordinator_url: if state.coordinator_url.is_empty() {
                None
            } else {
                Some(state.coordinator_url.clone())
            },
            stats: state.stats.clone(),
        }
    }
}
