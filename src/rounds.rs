//! One fetch→solve→submit cycle against the puzzle service.
//!
//! The driver fetches a board, solves it, diffs the two grids, and pushes
//! every answer concurrently. With a peer worker configured, the task list
//! is split in two contiguous halves: the first is submitted locally, the
//! second forwarded as a single batch, both in flight at the same time.

use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::board::CellTask;
use crate::error::RoundError;
use crate::remote::PuzzleApi;
use crate::solver;
use crate::worker::WorkerClient;

/// Aggregate outcome of one round.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    /// Cells the round attempted to submit.
    pub attempted: usize,
    /// Cells the service accepted.
    pub succeeded: usize,
    /// Wall-clock duration of the round.
    pub elapsed: Duration,
}

/// Split a task list into the locally submitted half and the forwarded
/// half. The local half takes the extra task on odd lengths; concatenating
/// the two halves reconstructs the input exactly.
pub fn split_tasks(tasks: &[CellTask]) -> (&[CellTask], &[CellTask]) {
    tasks.split_at(tasks.len().div_ceil(2))
}

/// Drives a single solve-and-submit round.
pub struct RoundDriver<A> {
    api: A,
    forwarder: Option<WorkerClient>,
}

impl<A: PuzzleApi> RoundDriver<A> {
    /// Driver submitting every cell itself.
    pub fn new(api: A) -> Self {
        Self {
            api,
            forwarder: None,
        }
    }

    /// Driver splitting each round's tasks with a peer worker.
    pub fn with_forwarder(api: A, forwarder: WorkerClient) -> Self {
        Self {
            api,
            forwarder: Some(forwarder),
        }
    }

    /// Execute one fetch→solve→submit cycle.
    ///
    /// Fetch and solve failures abort the round; individual submission
    /// failures are counted and the round keeps going.
    pub async fn run_round(&self) -> Result<RoundOutcome, RoundError> {
        let started = Instant::now();

        let board = self.api.fetch_board().await.map_err(RoundError::Fetch)?;
        let solved = solver::solve(&board).ok_or(RoundError::Unsolvable)?;
        let tasks = board.diff(&solved);

        debug!(cells = tasks.len(), "Board solved, submitting answers");

        let succeeded = match &self.forwarder {
            Some(forwarder) => self.submit_split(&tasks, forwarder).await,
            None => self.submit_all(&tasks).await,
        };

        let outcome = RoundOutcome {
            attempted: tasks.len(),
            succeeded,
            elapsed: started.elapsed(),
        };

        info!(
            attempted = outcome.attempted,
            succeeded = outcome.succeeded,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "Round complete"
        );

        Ok(outcome)
    }

    /// Submit every task concurrently; returns the number accepted.
    async fn submit_all(&self, tasks: &[CellTask]) -> usize {
        let results = join_all(tasks.iter().map(|&task| async move {
            match self.api.submit_cell(task).await {
                Ok(accepted) => {
                    if !accepted {
                        debug!(%task, "Submission rejected");
                    }
                    accepted
                }
                Err(e) => {
                    debug!(%task, error = %e, "Submission failed");
                    false
                }
            }
        }))
        .await;

        results.into_iter().filter(|&accepted| accepted).count()
    }

    /// Submit the first half locally while the second half rides to the
    /// peer worker as one batch; both halves are in flight concurrently.
    /// A peer failure costs only its half: zero completions, no requeue.
    async fn submit_split(&self, tasks: &[CellTask], forwarder: &WorkerClient) -> usize {
        let (local, forwarded) = split_tasks(tasks);

        debug!(
            local = local.len(),
            forwarded = forwarded.len(),
            "Splitting tasks with peer worker"
        );

        let (local_ok, peer) = tokio::join!(
            self.submit_all(local),
            forwarder.forward_batch(forwarded)
        );

        let peer_ok = match peer {
            Ok(summary) => summary.completed,
            Err(e) => {
                warn!(error = %e, cells = forwarded.len(), "Peer worker failed, counting its half as zero");
                0
            }
        };

        local_ok + peer_ok
    }
}
