//! Worker control API: initialization, batch submission, and status.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{reject, ControlResponse};
use crate::board::CellTask;
use crate::config::Config;
use crate::error::ControlError;
use crate::remote::PuzzleClient;
use crate::session::SessionStats;
use crate::worker::{execute_batch, TaskOutcome, WorkerHandle};

/// Shared state for the worker's handlers.
#[derive(Clone)]
pub struct WorkerApp {
    pub worker: WorkerHandle,
    pub config: Config,
    pub http_client: Client,
}

impl WorkerApp {
    pub fn new(config: Config) -> Self {
        Self {
            worker: WorkerHandle::new(),
            config,
            http_client: Client::new(),
        }
    }
}

/// Body of `POST /initialize`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub coordinator_url: Option<String>,
}

/// Body of `POST /solve-batch`.
#[derive(Debug, Default, Deserialize)]
pub struct BatchSubmitRequest {
    #[serde(default)]
    pub tasks: Option<Vec<CellTask>>,
}

/// Response of `POST /solve-batch`.
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub completed: usize,
    pub total: usize,
    pub processing_ms: u64,
    pub results: Vec<TaskOutcome>,
}

/// Response of `POST /stop`.
#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub success: bool,
    pub message: String,
    pub final_stats: SessionStats,
}

pub fn router(app: WorkerApp) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/status", get(status))
        .route("/ping", get(ping))
        .route("/initialize", post(initialize))
        .route("/solve-batch", post(solve_batch))
        .route("/stop", post(stop))
        .route("/reset-stats", post(reset_stats))
        .with_state(app)
}

/// Bind the worker API on `port` and serve until the process exits.
pub async fn serve_worker(app: WorkerApp, port: u16) -> anyhow::Result<()> {
    let router = router(app);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "Worker control API listening");
    axum::serve(listener, router).await?;
    Ok(())
}

async fn root(State(app): State<WorkerApp>) -> Json<Value> {
    let snapshot = app.worker.snapshot().await;
    Json(json!({
        "service": "sudobot worker",
        "status": if snapshot.initialized { "READY" } else { "WAITING_INITIALIZATION" },
        "configuration": {
            "remote": app.config.base_url,
            "coordinator": snapshot.coordinator_url,
            "hasToken": snapshot.has_token,
            "initialized": snapshot.initialized,
        },
        "stats": snapshot.stats,
        "endpoints": {
            "initialize": "POST /initialize - install token and coordinator address",
            "solveBatch": "POST /solve-batch - submit a batch of cells",
            "stop": "POST /stop - clear the configuration",
            "status": "GET /status - worker snapshot",
            "ping": "GET /ping - liveness probe",
        },
    }))
}

async fn status(State(app): State<WorkerApp>) -> Json<Value> {
    let snapshot = app.worker.snapshot().await;
    let message = if snapshot.initialized {
        "Worker operational"
    } else {
        "Waiting for initialization by the coordinator"
    };
    Json(json!({
        "initialized": snapshot.initialized,
        "hasToken": snapshot.has_token,
        "coordinator": snapshot.coordinator_url,
        "stats": snapshot.stats,
        "message": message,
    }))
}

async fn ping(State(app): State<WorkerApp>) -> Json<Value> {
    let snapshot = app.worker.snapshot().await;
    Json(json!({
        "success": true,
        "message": "Worker alive",
        "timestamp": Utc::now().timestamp_millis(),
        "initialized": snapshot.initialized,
    }))
}

pub(crate) async fn initialize(
    State(app): State<WorkerApp>,
    Json(request): Json<InitializeRequest>,
) -> (StatusCode, Json<ControlResponse>) {
    let Some(token) = request.token.filter(|t| !t.is_empty()) else {
        return reject(&ControlError::MissingToken);
    };
    let Some(coordinator_url) = request.coordinator_url.filter(|u| !u.is_empty()) else {
        return reject(&ControlError::MissingField("coordinatorUrl"));
    };

    match app.worker.initialize(token, coordinator_url).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ControlResponse::ok("Worker initialized")),
        ),
        Err(e) => reject(&e),
    }
}

pub(crate) async fn solve_batch(
    State(app): State<WorkerApp>,
    Json(request): Json<BatchSubmitRequest>,
) -> Result<Json<BatchResponse>, (StatusCode, Json<ControlResponse>)> {
    let token = app.worker.current_token().await.map_err(|e| reject(&e))?;

    let Some(tasks) = request.tasks else {
        return Err(reject(&ControlError::MissingField("tasks")));
    };

    if tasks.is_empty() {
        return Ok(Json(BatchResponse {
            success: true,
            completed: 0,
            total: 0,
            processing_ms: 0,
            results: Vec::new(),
        }));
    }

    info!(cells = tasks.len(), "Processing batch");
    let client = PuzzleClient::new(app.http_client.clone(), &app.config, token);
    let report = execute_batch(&client, &tasks).await;
    app.worker.record_batch(&report).await;

    Ok(Json(BatchResponse {
        success: true,
        completed: report.completed,
        total: report.total,
        processing_ms: report.processing_ms,
        results: report.results,
    }))
}

pub(crate) async fn stop(State(app): State<WorkerApp>) -> Json<StopResponse> {
    let final_stats = app.worker.stop().await;
    info!("Worker stop requested");
    Json(StopResponse {
        success: true,
        message: "Worker stopped and reset".to_string(),
        final_stats,
    })
}

pub(crate) async fn reset_stats(State(app): State<WorkerApp>) -> Json<ControlResponse> {
    app.worker.reset_stats().await;
    Json(ControlResponse::ok("Statistics reset"))
}
