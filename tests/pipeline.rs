//! Integration tests for the solve pipeline.
//!
//! Drives the public API end-to-end against an in-memory puzzle service:
//! parse a board from JSON, solve it, diff it, and push the answers
//! through the round driver and the batch executor.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use sudobot::board::{Board, CellTask};
use sudobot::error::RemoteError;
use sudobot::remote::PuzzleApi;
use sudobot::rounds::{split_tasks, RoundDriver};
use sudobot::session::{Phase, SessionHandle};
use sudobot::solver;
use sudobot::worker::execute_batch;

const PUZZLE_JSON: &str = r#"[
    [5,3,0,0,7,0,0,0,0],
    [6,0,0,1,9,5,0,0,0],
    [0,9,8,0,0,0,0,6,0],
    [8,0,0,0,6,0,0,0,3],
    [4,0,0,8,0,3,0,0,1],
    [7,0,0,0,2,0,0,0,6],
    [0,6,0,0,0,0,2,8,0],
    [0,0,0,4,1,9,0,0,5],
    [0,0,0,0,8,0,0,7,9]
]"#;

/// In-memory puzzle service: serves one board, accepts all submissions
/// except those whose cell is listed as failing.
struct FakeService {
    board: Board,
    failing: Vec<(u8, u8)>,
    submissions: AtomicUsize,
}

impl FakeService {
    fn new(board: Board) -> Self {
        Self {
            board,
            failing: Vec::new(),
            submissions: AtomicUsize::new(0),
        }
    }

    fn failing_at(mut self, row: u8, col: u8) -> Self {
        self.failing.push((row, col));
        self
    }
}

#[async_trait]
impl PuzzleApi for FakeService {
    async fn fetch_board(&self) -> Result<Board, RemoteError> {
        Ok(self.board)
    }

    async fn submit_cell(&self, task: CellTask) -> Result<bool, RemoteError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        Ok(!self.failing.contains(&(task.row, task.col)))
    }
}

#[test]
fn solve_pipeline_from_json_to_tasks() {
    let board: Board = serde_json::from_str(PUZZLE_JSON).expect("board parses");
    let solved = solver::solve(&board).expect("classic puzzle is solvable");

    // The first blank sits at (0, 2) and must become 4.
    assert_eq!(solved.get(0, 2), 4);
    assert!(solved.is_complete());

    let tasks = board.diff(&solved);
    assert_eq!(tasks.len(), board.empty_count());
    for task in &tasks {
        assert_eq!(board.get(task.row as usize, task.col as usize), 0);
        assert_eq!(
            solved.get(task.row as usize, task.col as usize),
            task.value
        );
    }

    // Splitting for a peer worker loses nothing and keeps order.
    let (local, forwarded) = split_tasks(&tasks);
    assert_eq!(local.len(), tasks.len().div_ceil(2));
    let rebuilt: Vec<CellTask> = local.iter().chain(forwarded.iter()).copied().collect();
    assert_eq!(rebuilt, tasks);
}

#[tokio::test]
async fn round_driver_submits_all_blanks() {
    let board: Board = serde_json::from_str(PUZZLE_JSON).expect("board parses");
    let service = Arc::new(FakeService::new(board));
    let driver = RoundDriver::new(Arc::clone(&service));

    let outcome = driver.run_round().await.expect("round succeeds");

    assert_eq!(outcome.attempted, 51);
    assert_eq!(outcome.succeeded, 51);
    assert_eq!(service.submissions.load(Ordering::SeqCst), 51);
}

#[tokio::test]
async fn batch_executor_counts_partial_failures() {
    let board: Board = serde_json::from_str(PUZZLE_JSON).expect("board parses");
    let service = FakeService::new(board).failing_at(1, 1);

    let tasks = vec![
        CellTask {
            row: 0,
            col: 2,
            value: 4,
        },
        CellTask {
            row: 1,
            col: 1,
            value: 7,
        },
        CellTask {
            row: 2,
            col: 0,
            value: 1,
        },
    ];

    let report = execute_batch(&service, &tasks).await;

    assert_eq!(report.completed, 2);
    assert_eq!(report.total, 3);
}

#[tokio::test]
async fn stop_while_waiting_for_token_never_runs() {
    let session = SessionHandle::new();

    let phase = session.begin(None, None).await.expect("start");
    assert_eq!(phase, Phase::WaitingForToken);

    session.request_stop().await;
    assert_eq!(session.phase().await, Phase::Stopped);

    // Late token arrival stays inert.
    let phase = session.install_token("late".to_string()).await;
    assert_eq!(phase, Phase::Stopped);
}
