use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::{ExecutionOutcome, Language};
use dashmap::DashMap;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ExecutionConfig;
use crate::entity::participant;
use crate::error::AppError;
use crate::execution::backend::{BackendError, ExecutionBackend};
use crate::execution::queue::{ExecutionJob, LanguageQueue};

/// Deferred result handle returned to the execute endpoint.
pub type ExecutionReceiver = oneshot::Receiver<Result<ExecutionOutcome, BackendError>>;

/// Gates access to the per-language execution queues.
///
/// Owns one queue per supported language and the per-participant cooldown
/// clock. The cooldown clock is shared across languages: switching language
/// does not reset a participant's wait.
pub struct AdmissionController {
    config: ExecutionConfig,
    queues: HashMap<Language, LanguageQueue>,
    last_request: DashMap<String, Instant>,
}

impl AdmissionController {
    /// Spawn the per-language worker tasks and build the controller.
    pub fn new(config: ExecutionConfig, backend: Arc<dyn ExecutionBackend>) -> Self {
        let queues = Language::ALL
            .iter()
            .map(|&language| {
                let limits = config.limits(language);
                info!(
                    %language,
                    max_parallel = limits.max_parallel,
                    max_queue = limits.max_queue,
                    "Execution queue started"
                );
                (
                    language,
                    LanguageQueue::spawn(language, limits, Arc::clone(&backend)),
                )
            })
            .collect();

        Self {
            config,
            queues,
            last_request: DashMap::new(),
        }
    }

    /// Decide accept/reject for an execution request whose participant row
    /// has already been resolved. On acceptance the cooldown clock is stamped
    /// immediately, before the job completes, so a long-running execution
    /// cannot be used to burst-submit.
    pub fn admit(
        &self,
        session: &participant::Model,
        language: Language,
        source: String,
    ) -> Result<ExecutionReceiver, AppError> {
        if session.status.is_terminal() {
            debug!(
                lot_number = %session.lot_number,
                status = %session.status,
                "Execution denied: session not active"
            );
            return Err(AppError::InvalidState(session.status));
        }

        let now = Instant::now();
        let cooldown = Duration::from_millis(self.config.limits(language).cooldown_ms);
        if let Some(last) = self.last_request.get(&session.lot_number) {
            let elapsed = now.duration_since(*last);
            if elapsed < cooldown {
                let retry_after = (cooldown - elapsed).as_millis().div_ceil(1000) as u64;
                debug!(
                    lot_number = %session.lot_number,
                    retry_after,
                    "Execution denied: cooldown active"
                );
                return Err(AppError::RateLimited { retry_after });
            }
        }

        let (done_tx, done_rx) = oneshot::channel();
        let job = ExecutionJob {
            id: Uuid::new_v4(),
            lot_number: session.lot_number.clone(),
            source,
            responder: done_tx,
        };
        let queue = self
            .queues
            .get(&language)
            .ok_or_else(|| AppError::Internal(format!("no queue for language '{language}'")))?;

        match queue.try_enqueue(job) {
            Ok(()) => {
                self.last_request.insert(session.lot_number.clone(), now);
                Ok(done_rx)
            }
            Err(TrySendError::Full(_)) => {
                debug!(lot_number = %session.lot_number, %language, "Execution denied: queue full");
                Err(AppError::CapacityExceeded)
            }
            Err(TrySendError::Closed(_)) => {
                Err(AppError::Internal(format!("{language} queue worker stopped")))
            }
        }
    }
}
