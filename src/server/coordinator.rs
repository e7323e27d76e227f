//! Coordinator control API: start, stop, token installation, and status.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{reject, ControlResponse};
use crate::config::Config;
use crate::dispatch::spawn_dispatch_loop;
use crate::error::ControlError;
use crate::session::{Phase, SessionHandle, SessionSnapshot, SessionStats};

/// Shared state for the coordinator's handlers.
#[derive(Clone)]
pub struct CoordinatorState {
    pub session: SessionHandle,
    pub config: Config,
    pub http_client: Client,
}

impl CoordinatorState {
    pub fn new(config: Config) -> Self {
        Self {
            session: SessionHandle::new(),
            config,
            http_client: Client::new(),
        }
    }
}

/// Body of `POST /start`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub worker_url: Option<String>,
}

/// Body of `POST /token`.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub token: String,
}

/// Response of `POST /stop`.
#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub success: bool,
    pub message: String,
    pub final_stats: SessionStats,
}

/// Response of `GET /status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
    pub message: String,
}

pub fn router(state: CoordinatorState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/status", get(status))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/token", post(token))
        .route("/reset-stats", post(reset_stats))
        .with_state(state)
}

/// Bind the coordinator API on `port` and serve until the process exits.
pub async fn serve_coordinator(state: CoordinatorState, port: u16) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "Coordinator control API listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn root(State(state): State<CoordinatorState>) -> Json<Value> {
    let snapshot = state.session.snapshot().await;
    Json(json!({
        "service": "sudobot coordinator",
        "status": snapshot.phase,
        "configuration": {
            "remote": state.config.base_url,
            "hasToken": snapshot.has_token,
            "workerUrl": snapshot.worker_url,
        },
        "stats": snapshot.stats,
        "endpoints": {
            "start": "POST /start - start the solve loop (token optional, workerUrl optional)",
            "stop": "POST /stop - stop the loop and report final stats",
            "token": "POST /token - install or replace the bearer token",
            "status": "GET /status - session snapshot",
            "resetStats": "POST /reset-stats - zero the statistics",
        },
    }))
}

async fn status(State(state): State<CoordinatorState>) -> Json<StatusResponse> {
    let snapshot = state.session.snapshot().await;
    let message = match snapshot.phase {
        Phase::Stopped => "Bot stopped".to_string(),
        Phase::WaitingForToken => "Waiting for token; POST /token to begin".to_string(),
        Phase::Running => "Bot running".to_string(),
    };
    Json(StatusResponse { snapshot, message })
}

pub(crate) async fn start(
    State(state): State<CoordinatorState>,
    Json(request): Json<StartRequest>,
) -> (StatusCode, Json<ControlResponse>) {
    // Normalize empty strings away before they reach the session.
    let token = request.token.filter(|t| !t.is_empty());
    let worker_url = request.worker_url.filter(|u| !u.is_empty());

    if let Some(ref url) = worker_url {
        if let Err(e) = reqwest::Url::parse(url) {
            return reject(&ControlError::InvalidUrl {
                url: url.clone(),
                message: e.to_string(),
            });
        }
    }

    let phase = match state.session.begin(token, worker_url.clone()).await {
        Ok(phase) => phase,
        Err(e) => return reject(&e),
    };

    // Detached: the loop exits on its own once the phase returns to Stopped.
    let _ = spawn_dispatch_loop(
        state.session.clone(),
        state.config.clone(),
        state.http_client.clone(),
    );

    info!(phase = %phase, worker_url = ?worker_url, "Bot started");
    let message = match phase {
        Phase::Running => "Bot started",
        _ => "Bot started; waiting for token",
    };
    (StatusCode::OK, Json(ControlResponse::ok(message)))
}

pub(crate) async fn stop(State(state): State<CoordinatorState>) -> Json<StopResponse> {
    let final_stats = state.session.request_stop().await;
    info!("Stop requested");
    Json(StopResponse {
        success: true,
        message: "Bot stopped".to_string(),
        final_stats,
    })
}

pub(crate) async fn token(
    State(state): State<CoordinatorState>,
    Json(request): Json<TokenRequest>,
) -> (StatusCode, Json<ControlResponse>) {
    if request.token.is_empty() {
        return reject(&ControlError::MissingToken);
    }

    let phase = state.session.install_token(request.token).await;
    info!(phase = %phase, "Token installed");
    let message = match phase {
        Phase::Running => "Token installed; bot running",
        _ => "Token installed",
    };
    (StatusCode::OK, Json(ControlResponse::ok(message)))
}

pub(crate) async fn reset_stats(State(state): State<CoordinatorState>) -> Json<ControlResponse> {
    state.session.reset_stats().await;
    Json(ControlResponse::ok("Statistics reset"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_state() -> CoordinatorState {
        // An unroutable remote keeps any spawned loop harmless in tests.
        CoordinatorState::new(
            Config::new()
                .with_base_url("http://127.0.0.1:1")
                .with_token_poll_interval(Duration::from_millis(5))
                .with_failure_pause(Duration::from_millis(5)),
        )
    }

    #[tokio::test]
    async fn test_start_without_token_reports_waiting() {
        let state = test_state();

        let (code, Json(response)) =
            start(State(state.clone()), Json(StartRequest::default())).await;

        assert_eq!(code, StatusCode::OK);
        assert!(response.success);
        assert!(response.message.contains("waiting for token"));
        assert_eq!(state.session.phase().await, Phase::WaitingForToken);

        state.session.request_stop().await;
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let state = test_state();

        let (first, _) = start(State(state.clone()), Json(StartRequest::default())).await;
        assert_eq!(first, StatusCode::OK);

        let (second, Json(response)) =
            start(State(state.clone()), Json(StartRequest::default())).await;
        assert_eq!(second, StatusCode::BAD_REQUEST);
        assert!(!response.success);
        assert!(response.message.contains("already running"));

        state.session.request_stop().await;
    }

    #[tokio::test]
    async fn test_start_rejects_malformed_worker_url() {
        let state = test_state();

        let request = StartRequest {
            token: Some("tok".to_string()),
            worker_url: Some("not a url".to_string()),
        };
        let (code, Json(response)) = start(State(state.clone()), Json(request)).await;

        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert!(!response.success);
        // The failed start must not have begun a session.
        assert_eq!(state.session.phase().await, Phase::Stopped);
    }

    #[tokio::test]
    async fn test_token_endpoint_rejects_empty_token() {
        let state = test_state();

        let (code, Json(response)) = token(
            State(state.clone()),
            Json(TokenRequest {
                token: String::new(),
            }),
        )
        .await;

        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert!(!response.success);
    }

    #[tokio::test]
    async fn test_token_promotes_waiting_session() {
        let state = test_state();
        start(State(state.clone()), Json(StartRequest::default())).await;

        let (code, Json(response)) = token(
            State(state.clone()),
            Json(TokenRequest {
                token: "tok".to_string(),
            }),
        )
        .await;

        assert_eq!(code, StatusCode::OK);
        assert!(response.message.contains("running"));
        assert_eq!(state.session.phase().await, Phase::Running);

        state.session.request_stop().await;
    }

    #[tokio::test]
    async fn test_stop_returns_final_stats() {
        let state = test_state();
        start(State(state.clone()), Json(StartRequest::default())).await;

        let Json(response) = stop(State(state.clone())).await;

        assert!(response.success);
        assert_eq!(response.final_stats.total_processed, 0);
        assert_eq!(state.session.phase().await, Phase::Stopped);
    }

    #[tokio::test]
    async fn test_status_reflects_phase() {
        let state = test_state();

        let Json(stopped) = status(State(state.clone())).await;
        assert_eq!(stopped.snapshot.phase, Phase::Stopped);

        start(State(state.clone()), Json(StartRequest::default())).await;
        let Json(waiting) = status(State(state.clone())).await;
        assert_eq!(waiting.snapshot.phase, Phase::WaitingForToken);
        assert!(!waiting.snapshot.has_token);

        state.session.request_stop().await;
    }
}
