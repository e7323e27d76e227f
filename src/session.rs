//! Process-wide session state shared by the control API and the loop.
//!
//! A single mutex-guarded [`Session`] replaces the ad-hoc flag pair of
//! earlier bot generations with one explicit [`Phase`] enum, so "already
//! running" checks and phase mutations happen under one lock acquisition.
//! Token arrival is signalled through a [`Notify`] so the dispatch loop
//! does not have to busy-poll while waiting.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, Notify};

use crate::error::ControlError;
use crate::rounds::RoundOutcome;

/// Dispatch-loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Stopped,
    WaitingForToken,
    Running,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Stopped => write!(f, "STOPPED"),
            Phase::WaitingForToken => write!(f, "WAITING_FOR_TOKEN"),
            Phase::Running => write!(f, "RUNNING"),
        }
    }
}

/// Cumulative submission statistics.
///
/// Reset when a session starts; retained after stop until the next start.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStats {
    /// Cells attempted across all rounds (or batches).
    pub total_processed: u64,
    /// Cells the service accepted.
    pub total_success: u64,
    /// Cells that failed plus round-level errors.
    pub total_errors: u64,
    /// Elapsed time of the most recent round or batch, in milliseconds.
    pub last_elapsed_ms: u64,
    /// When the current session started.
    pub started_at: Option<DateTime<Utc>>,
}

impl SessionStats {
    /// Fresh statistics stamped with the current time.
    pub fn started_now() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }
}

/// Read-only view of the session for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub has_token: bool,
    pub worker_url: Option<String>,
    pub rounds: u64,
    pub stats: SessionStats,
}

#[derive(Debug)]
struct Session {
    phase: Phase,
    token: String,
    worker_url: Option<String>,
    rounds: u64,
    stats: SessionStats,
}

/// Cloneable handle to the shared session.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<Session>>,
    token_arrived: Arc<Notify>,
}

impl SessionHandle {
    /// A fresh stopped session with no token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Session {
                phase: Phase::Stopped,
                token: String::new(),
                worker_url: None,
                rounds: 0,
                stats: SessionStats::default(),
            })),
            token_arrived: Arc::new(Notify::new()),
        }
    }

    /// Start a session: reset statistics, install the given token and
    /// worker URL, and enter `Running` (or `WaitingForToken` when no token
    /// is available yet).
    ///
    /// The already-running check and the phase change happen under one
    /// lock, so two overlapping starts cannot both succeed.
    pub async fn begin(
        &self,
        token: Option<String>,
        worker_url: Option<String>,
    ) -> Result<Phase, ControlError> {
        let mut session = self.inner.lock().await;
        if session.phase != Phase::Stopped {
            return Err(ControlError::AlreadyRunning);
        }

        if let Some(token) = token {
            session.token = token;
        }
        session.worker_url = worker_url;
        session.rounds = 0;
        session.stats = SessionStats::started_now();
        session.phase = if session.token.is_empty() {
            Phase::WaitingForToken
        } else {
            Phase::Running
        };

        Ok(session.phase)
    }

    /// Request a stop. The loop observes the phase change at its next
    /// iteration boundary or polling tick. Returns the statistics as of
    /// the stop request; they stay readable until the next start.
    pub async fn request_stop(&self) -> SessionStats {
        let mut session = self.inner.lock().await;
        session.phase = Phase::Stopped;
        // Wake a loop parked on the token signal so it can exit promptly.
        self.token_arrived.notify_waiters();
        session.stats.clone()
    }

    /// Install or replace the token, independently of start. A session
    /// parked in `WaitingForToken` transitions to `Running`.
    pub async fn install_token(&self, token: String) -> Phase {
        let mut session = self.inner.lock().await;
        session.token = token;
        if session.phase == Phase::WaitingForToken {
            session.phase = Phase::Running;
        }
        self.token_arrived.notify_waiters();
        session.phase
    }

    /// Current phase.
    pub async fn phase(&self) -> Phase {
        self.inner.lock().await.phase
    }

    /// The current token, or `None` while unset.
    pub async fn current_token(&self) -> Option<String> {
        let session = self.inner.lock().await;
        if session.token.is_empty() {
            None
        } else {
            Some(session.token.clone())
        }
    }

    /// The configured peer worker URL, if any.
    pub async fn worker_url(&self) -> Option<String> {
        self.inner.lock().await.worker_url.clone()
    }

    /// Record a finished round's aggregate outcome.
    pub async fn record_round(&self, outcome: &RoundOutcome) {
        let mut session = self.inner.lock().await;
        session.rounds += 1;
        session.stats.total_processed += outcome.attempted as u64;
        session.stats.total_success += outcome.succeeded as u64;
        session.stats.total_errors += (outcome.attempted - outcome.succeeded) as u64;
        session.stats.last_elapsed_ms = outcome.elapsed.as_millis() as u64;
    }

    /// Count a round-level failure (fetch error, unsolvable board, crash).
    pub async fn record_round_error(&self) {
        let mut session = self.inner.lock().await;
        session.stats.total_errors += 1;
    }

    /// Zero the cumulative statistics.
    pub async fn reset_stats(&self) {
        let mut session = self.inner.lock().await;
        session.stats = SessionStats::default();
    }

    /// Read-only snapshot for status endpoints.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.inner.lock().await;
        SessionSnapshot {
            phase: session.phase,
            has_token: !session.token.is_empty(),
            worker_url: session.worker_url.clone(),
            rounds: session.rounds,
            stats: session.stats.clone(),
        }
    }

    /// Future that resolves when a token is installed (or a stop request
    /// wakes the waiters). Obtain the future before re-checking state to
    /// avoid missing a wake-up in between.
    pub fn token_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.token_arrived)
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}
