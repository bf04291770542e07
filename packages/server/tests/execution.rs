//! Queue and admission behavior against a mock execution backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{ExecuteRequest, ExecutionOutcome, Language, ProcessStage, SessionStatus};
use tokio::sync::{Mutex, Semaphore};

use server::config::{ExecutionConfig, LanguageLimits};
use server::entity::participant;
use server::error::AppError;
use server::execution::{AdmissionController, BackendError, ExecutionBackend};

/// Backend double: every call parks on a semaphore permit until the test
/// releases it, while recording arrival order and the in-flight high-water
/// mark.
struct MockBackend {
    release: Semaphore,
    running: AtomicUsize,
    high_water: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl MockBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            release: Semaphore::new(0),
            running: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn release(&self, n: usize) {
        self.release.add_permits(n);
    }

    fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    fn high_water(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionBackend for MockBackend {
    async fn execute(&self, request: ExecuteRequest) -> Result<ExecutionOutcome, BackendError> {
        self.calls
            .lock()
            .await
            .push(request.files[0].content.clone());

        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now_running, Ordering::SeqCst);

        let permit = self
            .release
            .acquire()
            .await
            .map_err(|_| BackendError::Transport("gate closed".into()))?;
        permit.forget();

        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(ExecutionOutcome {
            run: ProcessStage {
                stdout: request.files[0].content.clone(),
                ..Default::default()
            },
        })
    }
}

/// Backend double that always fails.
struct BrokenBackend;

#[async_trait]
impl ExecutionBackend for BrokenBackend {
    async fn execute(&self, _request: ExecuteRequest) -> Result<ExecutionOutcome, BackendError> {
        Err(BackendError::Transport("connection refused".into()))
    }
}

fn limits(max_parallel: usize, max_queue: usize, cooldown_ms: u64) -> LanguageLimits {
    LanguageLimits {
        max_parallel,
        max_queue,
        time_limit_ms: 2000,
        memory_limit_bytes: 64 * 1024 * 1024,
        cooldown_ms,
    }
}

fn exec_config(c: LanguageLimits, java: LanguageLimits) -> ExecutionConfig {
    ExecutionConfig {
        backend_url: "http://localhost:0/unused".into(),
        c,
        java,
    }
}

fn active_session(lot_number: &str) -> participant::Model {
    participant::Model {
        lot_number: lot_number.to_string(),
        lot_name: format!("Team {lot_number}"),
        college_name: None,
        status: SessionStatus::Active,
        start_time: Utc::now(),
        end_time: None,
        total_time_ms: 0,
        warnings: 0,
        lines_of_code: 0,
        no_of_loops: 0,
        attempts: 0,
        patterns_completed: 0,
        code_data: None,
        last_active: Utc::now(),
    }
}

/// Let the worker tasks drain whatever is ready.
async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn in_flight_never_exceeds_max_parallel() {
    let backend = MockBackend::new();
    let controller = AdmissionController::new(
        exec_config(limits(2, 10, 0), limits(1, 5, 0)),
        backend.clone(),
    );

    let receivers: Vec<_> = (0..6)
        .map(|i| {
            controller
                .admit(
                    &active_session(&format!("lot-{i}")),
                    Language::C,
                    format!("job-{i}"),
                )
                .expect("admission should succeed below capacity")
        })
        .collect();

    settle().await;
    assert_eq!(backend.running(), 2);

    backend.release(1);
    settle().await;
    assert_eq!(backend.running(), 2, "freed slot should be refilled");

    backend.release(5);
    for rx in receivers {
        rx.await.expect("job settled").expect("backend succeeded");
    }
    assert_eq!(backend.high_water(), 2);
}

#[tokio::test]
async fn jobs_are_serviced_in_fifo_order() {
    let backend = MockBackend::new();
    let controller = AdmissionController::new(
        exec_config(limits(1, 10, 0), limits(1, 5, 0)),
        backend.clone(),
    );

    let receivers: Vec<_> = ["first", "second", "third"]
        .iter()
        .map(|name| {
            controller
                .admit(&active_session(name), Language::C, name.to_string())
                .expect("admission should succeed")
        })
        .collect();

    backend.release(3);
    for rx in receivers {
        rx.await.expect("job settled").expect("backend succeeded");
    }

    let calls = backend.calls.lock().await;
    assert_eq!(*calls, ["first", "second", "third"]);
}

#[tokio::test]
async fn capacity_rejects_the_forty_sixth_submission() {
    let backend = MockBackend::new();
    let controller = AdmissionController::new(
        exec_config(limits(5, 40, 0), limits(1, 20, 0)),
        backend.clone(),
    );

    let mut accepted = Vec::new();
    let mut rejections = Vec::new();
    for i in 0..46 {
        match controller.admit(
            &active_session(&format!("lot-{i}")),
            Language::C,
            format!("job-{i}"),
        ) {
            Ok(rx) => accepted.push(rx),
            Err(err) => rejections.push(err),
        }
        settle().await;
    }

    assert_eq!(accepted.len(), 45);
    assert_eq!(rejections.len(), 1);
    assert!(matches!(rejections[0], AppError::CapacityExceeded));
    // Exactly max_parallel began executing; the rest queued.
    assert_eq!(backend.running(), 5);

    backend.release(45);
    for rx in accepted {
        rx.await.expect("job settled").expect("backend succeeded");
    }
    assert_eq!(backend.high_water(), 5);
}

#[tokio::test]
async fn languages_do_not_throttle_each_other() {
    let backend = MockBackend::new();
    let controller = AdmissionController::new(
        exec_config(limits(1, 2, 0), limits(1, 5, 0)),
        backend.clone(),
    );

    // Saturate C: one in flight, two pending, fourth rejected.
    for i in 0..3 {
        controller
            .admit(
                &active_session(&format!("c-{i}")),
                Language::C,
                format!("c-{i}"),
            )
            .expect("C admission below capacity");
        settle().await;
    }
    let overflow = controller.admit(&active_session("c-3"), Language::C, "c-3".into());
    assert!(matches!(overflow, Err(AppError::CapacityExceeded)));

    // Java still admits.
    let rx = controller
        .admit(&active_session("j-0"), Language::Java, "j-0".into())
        .expect("Java queue is independent of the C backlog");

    backend.release(5);
    rx.await.expect("job settled").expect("backend succeeded");
}

#[tokio::test(start_paused = true)]
async fn cooldown_rejects_with_remaining_wait_rounded_up() {
    let backend = MockBackend::new();
    backend.release(16);
    let controller = AdmissionController::new(
        exec_config(limits(5, 40, 5000), limits(1, 20, 5000)),
        backend.clone(),
    );
    let session = active_session("lot-1");

    controller
        .admit(&session, Language::C, "attempt 1".into())
        .expect("first submission admitted");

    let err = controller
        .admit(&session, Language::C, "attempt 2".into())
        .expect_err("second submission inside the cooldown window");
    assert!(matches!(err, AppError::RateLimited { retry_after: 5 }));

    tokio::time::advance(Duration::from_millis(1500)).await;
    let err = controller
        .admit(&session, Language::C, "attempt 3".into())
        .expect_err("still inside the cooldown window");
    assert!(matches!(err, AppError::RateLimited { retry_after: 4 }));

    tokio::time::advance(Duration::from_millis(3501)).await;
    controller
        .admit(&session, Language::C, "attempt 4".into())
        .expect("cooldown elapsed");
}

#[tokio::test(start_paused = true)]
async fn cooldown_clock_is_shared_across_languages() {
    let backend = MockBackend::new();
    backend.release(16);
    let controller = AdmissionController::new(
        exec_config(limits(5, 40, 5000), limits(1, 20, 5000)),
        backend.clone(),
    );
    let session = active_session("lot-1");

    controller
        .admit(&session, Language::C, "c attempt".into())
        .expect("first submission admitted");

    // Switching language does not reset the participant's wait.
    let err = controller
        .admit(&session, Language::Java, "java attempt".into())
        .expect_err("cooldown applies across languages");
    assert!(matches!(err, AppError::RateLimited { .. }));
}

#[tokio::test]
async fn terminal_sessions_are_rejected_before_a_job_exists() {
    let backend = MockBackend::new();
    let controller =
        AdmissionController::new(exec_config(limits(5, 40, 0), limits(1, 20, 0)), backend.clone());

    for status in [SessionStatus::Finished, SessionStatus::Disqualified] {
        let session = participant::Model {
            status,
            ..active_session("lot-1")
        };
        let err = controller
            .admit(&session, Language::C, "code".into())
            .expect_err("terminal session must be rejected");
        match err {
            AppError::InvalidState(s) => assert_eq!(s, status),
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }

    settle().await;
    assert_eq!(backend.running(), 0, "no job may be created for a rejection");
}

#[tokio::test]
async fn backend_failures_reject_the_deferred_handle() {
    let controller = AdmissionController::new(
        exec_config(limits(5, 40, 0), limits(1, 20, 0)),
        Arc::new(BrokenBackend),
    );

    let rx = controller
        .admit(&active_session("lot-1"), Language::C, "code".into())
        .expect("admission succeeds even when the backend is down");

    let result = rx.await.expect("job settled");
    assert!(matches!(result, Err(BackendError::Transport(_))));
}
