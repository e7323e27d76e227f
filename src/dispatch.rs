//! The repeated solve loop: fetch→solve→submit until told to stop.
//!
//! The loop owns nothing but a [`SessionHandle`]; control handlers flip
//! the session phase and the loop observes it at each iteration boundary.
//! Stop is cooperative: an in-flight round is never cancelled, only the
//! next iteration is suppressed. Every round runs in its own task so a
//! panic inside a round is caught, counted, and paused over instead of
//! taking the loop down.

use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::remote::{PuzzleApi, PuzzleClient};
use crate::rounds::RoundDriver;
use crate::session::{Phase, SessionHandle};
use crate::worker::WorkerClient;

/// Builds a round driver for the current token and peer configuration.
///
/// The factory seam keeps the loop testable: production code builds
/// reqwest-backed drivers, tests build scripted ones.
pub trait DriverFactory: Send + Sync + 'static {
    type Api: PuzzleApi + 'static;

    fn make_driver(&self, token: &str, worker_url: Option<&str>) -> RoundDriver<Self::Api>;
}

/// Production factory: reqwest-backed clients for the remote service and
/// the optional peer worker.
pub struct HttpDriverFactory {
    http_client: Client,
    config: Config,
}

impl HttpDriverFactory {
    pub fn new(http_client: Client, config: Config) -> Self {
        Self {
            http_client,
            config,
        }
    }
}

impl DriverFactory for HttpDriverFactory {
    type Api = PuzzleClient;

    fn make_driver(&self, token: &str, worker_url: Option<&str>) -> RoundDriver<PuzzleClient> {
        let api = PuzzleClient::new(self.http_client.clone(), &self.config, token);
        match worker_url {
            Some(url) => RoundDriver::with_forwarder(
                api,
                WorkerClient::new(self.http_client.clone(), url, &self.config),
            ),
            None => RoundDriver::new(api),
        }
    }
}

/// The dispatch loop.
pub struct DispatchLoop<F> {
    session: SessionHandle,
    config: Config,
    factory: F,
}

impl<F: DriverFactory> DispatchLoop<F> {
    pub fn new(session: SessionHandle, config: Config, factory: F) -> Self {
        Self {
            session,
            config,
            factory,
        }
    }

    /// Run until the session phase becomes `Stopped`.
    pub async fn run(self) {
        info!("Dispatch loop started");

        loop {
            match self.session.phase().await {
                Phase::Stopped => break,
                Phase::WaitingForToken => self.wait_for_token().await,
                Phase::Running => self.run_one_round().await,
            }
        }

        info!("Dispatch loop stopped");
    }

    /// Park until a token arrives, re-checking the phase once per poll
    /// interval so a stop request is observed within one tick.
    async fn wait_for_token(&self) {
        let signal = self.session.token_signal();
        tokio::select! {
            _ = signal.notified() => {}
            _ = tokio::time::sleep(self.config.token_poll_interval) => {}
        }
    }

    /// Execute one round and apply the failure back-off policy.
    async fn run_one_round(&self) {
        let Some(token) = self.session.current_token().await else {
            // Phase said Running but the token is gone; treat as a tick.
            tokio::time::sleep(self.config.token_poll_interval).await;
            return;
        };
        let worker_url = self.session.worker_url().await;

        let driver = self.factory.make_driver(&token, worker_url.as_deref());
        let round = tokio::spawn(async move { driver.run_round().await });

        match round.await {
            Ok(Ok(outcome)) => {
                self.session.record_round(&outcome).await;
                if !self.config.round_pause.is_zero() {
                    tokio::time::sleep(self.config.round_pause).await;
                }
            }
            Ok(Err(e)) => {
                self.session.record_round_error().await;
                warn!(error = %e, "Round failed");
                tokio::time::sleep(self.config.failure_pause).await;
            }
            Err(e) => {
                // A panic inside the round task lands here instead of
                // unwinding through the loop.
                self.session.record_round_error().await;
                error!(error = %e, "Round task crashed");
                tokio::time::sleep(self.config.crash_pause).await;
            }
        }
    }
}

/// Spawn the production dispatch loop for `session`.
pub fn spawn_dispatch_loop(
    session: SessionHandle,
    config: Config,
    http_client: Client,
) -> JoinHandle<()> {
    let factory = HttpDriverFactory::new(http_client, config.clone());
    tokio::spawn(DispatchLoop::new(session, config, factory).run())
}
