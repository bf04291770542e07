use async_trait::async_trait;
use common::{ExecuteRequest, ExecutionOutcome};

/// Error from the external code-execution backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(String),
    #[error("backend returned status {0}")]
    Status(u16),
    #[error("backend returned a malformed response: {0}")]
    Decode(String),
}

/// The external code-execution backend, consumed as a black-box HTTP service.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn execute(&self, request: ExecuteRequest) -> Result<ExecutionOutcome, BackendError>;
}

/// Piston-compatible HTTP client.
pub struct PistonClient {
    http: reqwest::Client,
    endpoint: String,
}

impl PistonClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ExecutionBackend for PistonClient {
    async fn execute(&self, request: ExecuteRequest) -> Result<ExecutionOutcome, BackendError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }

        response
            .json::<ExecutionOutcome>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}
