use std::sync::Arc;

use common::{ExecuteRequest, ExecutionOutcome, Language};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{Semaphore, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::LanguageLimits;
use crate::execution::backend::{BackendError, ExecutionBackend};

/// A pending execution request. Exists only for the duration of one
/// `/api/execute` call; the deferred handle carries the result back to the
/// suspended caller.
pub struct ExecutionJob {
    pub id: Uuid,
    pub lot_number: String,
    pub source: String,
    pub responder: oneshot::Sender<Result<ExecutionOutcome, BackendError>>,
}

/// A bounded FIFO queue in front of the execution backend, one per language.
///
/// The pending list is a bounded channel of `max_queue` slots; the in-flight
/// bound is a semaphore of `max_parallel` permits. The worker task takes a
/// permit before dequeuing the next job, so channel occupancy is exactly the
/// not-yet-running backlog. Languages are fully independent.
pub struct LanguageQueue {
    language: Language,
    tx: mpsc::Sender<ExecutionJob>,
}

impl LanguageQueue {
    /// Spawn the worker task for one language and return the queue handle.
    pub fn spawn(
        language: Language,
        limits: &LanguageLimits,
        backend: Arc<dyn ExecutionBackend>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(limits.max_queue);
        let semaphore = Arc::new(Semaphore::new(limits.max_parallel));

        tokio::spawn(run_worker(
            language,
            rx,
            semaphore,
            backend,
            limits.time_limit_ms,
        ));

        Self { language, tx }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Append a job to the tail of the pending list without blocking.
    /// Fails with the job handed back when the queue is at capacity.
    pub fn try_enqueue(&self, job: ExecutionJob) -> Result<(), TrySendError<ExecutionJob>> {
        self.tx.try_send(job)
    }
}

/// Drain loop for one language. Dispatched jobs run to completion; there is
/// no retry and no cancellation once a job has been sent to the backend.
async fn run_worker(
    language: Language,
    mut rx: mpsc::Receiver<ExecutionJob>,
    semaphore: Arc<Semaphore>,
    backend: Arc<dyn ExecutionBackend>,
    time_limit_ms: u64,
) {
    loop {
        // Semaphore is never closed, but treat closure as shutdown anyway.
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        let Some(job) = rx.recv().await else {
            debug!(%language, "Execution queue closed, worker exiting");
            break;
        };

        let backend = Arc::clone(&backend);
        tokio::spawn(async move {
            let ExecutionJob {
                id,
                lot_number,
                source,
                responder,
            } = job;

            debug!(job_id = %id, %language, lot_number = %lot_number, "Dispatching execution job");

            let request = ExecuteRequest::new(language, source, time_limit_ms);
            let result = backend.execute(request).await;

            match &result {
                Ok(outcome) => debug!(
                    job_id = %id,
                    %language,
                    signal = ?outcome.run.signal,
                    "Execution job settled"
                ),
                Err(e) => warn!(job_id = %id, %language, error = %e, "Execution job failed"),
            }

            if responder.send(result).is_err() {
                debug!(job_id = %id, "Caller went away before the result arrived");
            }

            drop(permit);
        });
    }
}
