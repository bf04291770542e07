pub mod admission;
pub mod backend;
pub mod queue;

pub use admission::AdmissionController;
pub use backend::{BackendError, ExecutionBackend, PistonClient};
pub use queue::{ExecutionJob, LanguageQueue};
