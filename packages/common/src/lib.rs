pub mod execution;
pub mod metrics;
pub mod pattern;
pub mod session_status;

pub use execution::{ExecuteFile, ExecuteRequest, ExecutionOutcome, Language, ProcessStage};
pub use session_status::SessionStatus;
