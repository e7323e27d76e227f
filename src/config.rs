//! Runtime configuration shared by the coordinator and worker modes.

use std::time::Duration;

/// Base URL of the remote puzzle service.
pub const DEFAULT_BASE_URL: &str = "https://sudoku.lumitelburundi.com:8083";

/// Tunables for remote calls and loop pacing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote puzzle service.
    pub base_url: String,
    /// Timeout for fetching a new board.
    pub fetch_timeout: Duration,
    /// Timeout for submitting a single cell.
    pub submit_timeout: Duration,
    /// Timeout for forwarding a batch to the peer worker.
    pub batch_timeout: Duration,
    /// How often the loop re-checks for stop while waiting for a token.
    pub token_poll_interval: Duration,
    /// Pause after a failed round.
    pub failure_pause: Duration,
    /// Pause after a round task crashes (loop-level catch-all).
    pub crash_pause: Duration,
    /// Pause between successful rounds. Zero disables the pause; kept as a
    /// throttle knob for when the remote service starts rate limiting.
    pub round_pause: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            fetch_timeout: Duration::from_secs(10),
            submit_timeout: Duration::from_secs(10),
            batch_timeout: Duration::from_secs(30),
            token_poll_interval: Duration::from_secs(1),
            failure_pause: Duration::from_secs(2),
            crash_pause: Duration::from_secs(5),
            round_pause: Duration::ZERO,
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the remote service base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the single-cell submission timeout.
    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    /// Sets the batch-forward timeout.
    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = timeout;
        self
    }

    /// Sets the token polling interval.
    pub fn with_token_poll_interval(mut self, interval: Duration) -> Self {
        self.token_poll_interval = interval;
        self
    }

    /// Sets the pause applied after a failed round.
    pub fn with_failure_pause(mut self, pause: Duration) -> Self {
        self.failure_pause = pause;
        self
    }
}
