use axum::Json;
use axum::extract::State;
use common::{ExecutionOutcome, Language};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::handlers::session::find_session;
use crate::models::execute::{ExecuteCodeRequest, validate_execute_request};
use crate::state::AppState;

/// Run a participant's code through the admission controller and the
/// language's bounded queue. The caller is suspended until its job is
/// dequeued, sent to the backend, and settled; admission rejections are
/// returned synchronously without ever creating a job.
#[utoipa::path(
    post,
    path = "/api/execute",
    tag = "Execution",
    operation_id = "execute",
    summary = "Submit code for execution",
    request_body = ExecuteCodeRequest,
    responses(
        (status = 200, description = "Backend execution result", body = ExecutionOutcome),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Session not active (SESSION_INACTIVE)", body = ErrorBody),
        (status = 404, description = "Unknown participant (NOT_FOUND)", body = ErrorBody),
        (status = 429, description = "Cooldown active (RATE_LIMITED)", body = ErrorBody),
        (status = 503, description = "Queue full (QUEUE_FULL)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(lot_number = %payload.lot_number, language = %payload.language))]
pub async fn execute(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ExecuteCodeRequest>,
) -> Result<Json<ExecutionOutcome>, AppError> {
    validate_execute_request(&payload)?;

    let language: Language = payload
        .language
        .parse()
        .map_err(|e: common::execution::ParseLanguageError| AppError::Validation(e.to_string()))?;

    let session = find_session(&state.db, payload.lot_number.trim()).await?;

    let receiver = state.admission.admit(&session, language, payload.code)?;

    let outcome = receiver
        .await
        .map_err(|_| AppError::Internal("execution job was dropped before settling".into()))?
        .map_err(|e| AppError::BackendFailure(e.to_string()))?;

    Ok(Json(outcome))
}
