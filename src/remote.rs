//! HTTP client for the remote puzzle service.
//!
//! Two operations exist: start a turn (which returns a fresh board) and
//! submit one cell's answer. Both carry a bearer token and the browser
//! header set the service expects. The [`PuzzleApi`] trait is the seam
//! that lets the round driver and batch executor run against an
//! in-memory fake in tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::board::{Board, CellTask};
use crate::config::Config;
use crate::error::RemoteError;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:137.0) Gecko/20100101 Firefox/137.0";
const ORIGIN: &str = "https://sudoku.lumitelburundi.com";
const REFERER: &str = "https://sudoku.lumitelburundi.com/";

/// Remote operations against the puzzle service.
#[async_trait]
pub trait PuzzleApi: Send + Sync {
    /// Start a new turn and fetch its board.
    async fn fetch_board(&self) -> Result<Board, RemoteError>;

    /// Submit one cell. `Ok(true)` means the service accepted the answer,
    /// `Ok(false)` means it rejected it (any HTTP status >= 400); transport
    /// failures and timeouts surface as `Err`.
    async fn submit_cell(&self, task: CellTask) -> Result<bool, RemoteError>;
}

#[async_trait]
impl<T: PuzzleApi + ?Sized> PuzzleApi for Arc<T> {
    async fn fetch_board(&self) -> Result<Board, RemoteError> {
        (**self).fetch_board().await
    }

    async fn submit_cell(&self, task: CellTask) -> Result<bool, RemoteError> {
        (**self).submit_cell(task).await
    }
}

/// Reqwest-backed client for the puzzle service.
pub struct PuzzleClient {
    http_client: Client,
    base_url: String,
    token: String,
    fetch_timeout: Duration,
    submit_timeout: Duration,
}

impl PuzzleClient {
    /// Create a client bound to `config`'s base URL and timeouts, carrying
    /// `token` on every request.
    pub fn new(http_client: Client, config: &Config, token: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: config.base_url.clone(),
            token: token.into(),
            fetch_timeout: config.fetch_timeout,
            submit_timeout: config.submit_timeout,
        }
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .post(format!("{}{}", self.base_url, path))
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json, text/plain, */*")
            .header("Accept-Language", "en-US,en;q=0.5")
            .header("Origin", ORIGIN)
            .header("Referer", REFERER)
            .header("Authorization", format!("Bearer {}", self.token))
    }
}

/// Response from starting a turn.
#[derive(Debug, Deserialize)]
struct TurnStartResponse {
    board: Board,
}

/// Submission body: `{ "answer": { "row", "col", "value" } }`.
#[derive(Debug, Serialize)]
struct SubmitRequest {
    answer: CellTask,
}

#[async_trait]
impl PuzzleApi for PuzzleClient {
    async fn fetch_board(&self) -> Result<Board, RemoteError> {
        let response = self
            .request("/turns/start")
            .timeout(self.fetch_timeout)
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

        let turn: TurnStartResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))?;

        Ok(turn.board)
    }

    async fn submit_cell(&self, task: CellTask) -> Result<bool, RemoteError> {
        let response = self
            .request("/turns/submit")
            .header("Priority", "u=0")
            .timeout(self.submit_timeout)
            .json(&SubmitRequest { answer: task })
            .send()
            .await?;

        // 2xx/3xx count as accepted; 4xx and 5xx are rejections. The
        // answer is never retried either way.
        Ok(response.status().as_u16() < 400)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted in-memory stand-in for the remote service.

    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Fake [`PuzzleApi`] with programmable outcomes and call counters.
    pub(crate) struct ScriptedApi {
        board: Option<Board>,
        rejected: HashSet<(u8, u8)>,
        unreachable: HashSet<(u8, u8)>,
        pub(crate) fetch_calls: AtomicUsize,
        pub(crate) submit_calls: AtomicUsize,
    }

    impl ScriptedApi {
        /// Every fetch returns `board`; every submission succeeds.
        pub(crate) fn serving(board: Board) -> Self {
            Self {
                board: Some(board),
                rejected: HashSet::new(),
                unreachable: HashSet::new(),
                fetch_calls: AtomicUsize::new(0),
                submit_calls: AtomicUsize::new(0),
            }
        }

        /// Every fetch fails with an HTTP 503.
        pub(crate) fn fetch_failing() -> Self {
            Self {
                board: None,
                rejected: HashSet::new(),
                unreachable: HashSet::new(),
                fetch_calls: AtomicUsize::new(0),
                submit_calls: AtomicUsize::new(0),
            }
        }

        /// Submissions for `(row, col)` come back rejected (HTTP 4xx).
        pub(crate) fn rejecting(mut self, row: u8, col: u8) -> Self {
            self.rejected.insert((row, col));
            self
        }

        /// Submissions for `(row, col)` fail at the transport level.
        pub(crate) fn unreachable_at(mut self, row: u8, col: u8) -> Self {
            self.unreachable.insert((row, col));
            self
        }

        pub(crate) fn fetches(&self) -> usize {
            self.fetch_calls.load(Ordering::SeqCst)
        }

        pub(crate) fn submissions(&self) -> usize {
            self.submit_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PuzzleApi for ScriptedApi {
        async fn fetch_board(&self) -> Result<Board, RemoteError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            self.board.ok_or(RemoteError::BadStatus {
                status: 503,
                message: "scripted fetch failure".to_string(),
            })
        }

        async fn submit_cell(&self, task: CellTask) -> Result<bool, RemoteError> {
            self.submit_calls.fetch_add(1, Ordering::SeqCst);
            if self.unreachable.contains(&(task.row, task.col)) {
                return Err(RemoteError::Parse("scripted transport failure".to_string()));
            }
            Ok(!self.rejected.contains(&(task.row, task.col)))
        }
    }
}
