use axum::Json;
use axum::extract::State;
use chrono::Utc;
use common::SessionStatus;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::participant;
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::session::*;
use crate::state::AppState;

/// Find a participant session by lot number or return 404.
pub(crate) async fn find_session<C: ConnectionTrait>(
    db: &C,
    lot_number: &str,
) -> Result<participant::Model, AppError> {
    participant::Entity::find_by_id(lot_number)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Resolve a zero-row session write: 404 for unknown participants, 403 with
/// the current status for terminal ones.
async fn reject_frozen_session(state: &AppState, lot_number: &str) -> AppError {
    match find_session(&state.db, lot_number).await {
        Ok(session) => AppError::InvalidState(session.status),
        Err(err) => err,
    }
}

/// Participant login: create the session if absent, return the existing one
/// otherwise.
#[utoipa::path(
    post,
    path = "/api/login",
    tag = "Session",
    operation_id = "login",
    summary = "Start or resume a participant session",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session created or resumed", body = LoginResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(lot_number = %payload.lot_number))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_login_request(&payload)?;

    let lot_number = payload.lot_number.trim().to_string();

    if let Some(existing) = participant::Entity::find_by_id(&lot_number)
        .one(&state.db)
        .await?
    {
        return Ok(Json(LoginResponse {
            success: true,
            user: existing.into(),
        }));
    }

    let now = Utc::now();
    let new_session = participant::ActiveModel {
        lot_number: Set(lot_number.clone()),
        lot_name: Set(payload.lot_name.trim().to_string()),
        college_name: Set(payload.college_name.clone()),
        status: Set(SessionStatus::Active),
        start_time: Set(now),
        end_time: Set(None),
        total_time_ms: Set(0),
        warnings: Set(0),
        lines_of_code: Set(0),
        no_of_loops: Set(0),
        attempts: Set(0),
        patterns_completed: Set(0),
        code_data: Set(None),
        last_active: Set(now),
    };

    let session = match new_session.insert(&state.db).await {
        Ok(model) => {
            info!(lot_number = %model.lot_number, "Session created");
            model
        }
        // Two first logins racing: the loser returns the winner's row.
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            find_session(&state.db, &lot_number).await?
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(LoginResponse {
        success: true,
        user: session.into(),
    }))
}

/// Periodic progress sync. Terminal sessions are left untouched: the update
/// filters on active status, so a stale client syncing after finish or
/// disqualification changes nothing.
#[utoipa::path(
    post,
    path = "/api/update-progress",
    tag = "Session",
    operation_id = "updateProgress",
    summary = "Persist a participant's progress aggregates",
    request_body = SessionReportRequest,
    responses(
        (status = 200, description = "Progress stored", body = AckResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Unknown participant (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(lot_number = %payload.lot_number))]
pub async fn update_progress(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SessionReportRequest>,
) -> Result<Json<AckResponse>, AppError> {
    validate_session_report(&payload)?;

    let mut update = participant::Entity::update_many()
        .col_expr(
            participant::Column::TotalTimeMs,
            Expr::value(payload.total_time),
        )
        .col_expr(participant::Column::Warnings, Expr::value(payload.warnings))
        .col_expr(
            participant::Column::LinesOfCode,
            Expr::value(payload.lines_of_code),
        )
        .col_expr(
            participant::Column::NoOfLoops,
            Expr::value(payload.no_of_loops),
        )
        .col_expr(participant::Column::Attempts, Expr::value(payload.attempts))
        .col_expr(
            participant::Column::PatternsCompleted,
            Expr::value(payload.patterns_completed),
        )
        .col_expr(participant::Column::LastActive, Expr::value(Utc::now()));

    // A sync without a code payload keeps the last stored snapshot.
    if let Some(snapshot) = payload.code_snapshot() {
        update = update.col_expr(participant::Column::CodeData, Expr::value(Some(snapshot)));
    }

    let result = update
        .filter(participant::Column::LotNumber.eq(payload.lot_number.trim()))
        .filter(participant::Column::Status.eq(SessionStatus::Active))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        // Unknown participant is an error; a frozen terminal row is a no-op.
        find_session(&state.db, payload.lot_number.trim()).await?;
    }

    Ok(Json(AckResponse { success: true }))
}

/// Terminal transition: all patterns completed before time ran out.
#[utoipa::path(
    post,
    path = "/api/finish",
    tag = "Session",
    operation_id = "finish",
    summary = "Mark a session finished with its final aggregates",
    request_body = SessionReportRequest,
    responses(
        (status = 200, description = "Session finished", body = AckResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Session already terminal (SESSION_INACTIVE)", body = ErrorBody),
        (status = 404, description = "Unknown participant (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(lot_number = %payload.lot_number))]
pub async fn finish(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SessionReportRequest>,
) -> Result<Json<AckResponse>, AppError> {
    validate_session_report(&payload)?;

    let now = Utc::now();
    let mut update = participant::Entity::update_many()
        .col_expr(
            participant::Column::Status,
            Expr::value(SessionStatus::Finished),
        )
        .col_expr(participant::Column::EndTime, Expr::value(Some(now)))
        .col_expr(
            participant::Column::TotalTimeMs,
            Expr::value(payload.total_time),
        )
        .col_expr(participant::Column::Warnings, Expr::value(payload.warnings))
        .col_expr(
            participant::Column::LinesOfCode,
            Expr::value(payload.lines_of_code),
        )
        .col_expr(
            participant::Column::NoOfLoops,
            Expr::value(payload.no_of_loops),
        )
        .col_expr(participant::Column::Attempts, Expr::value(payload.attempts))
        .col_expr(
            participant::Column::PatternsCompleted,
            Expr::value(payload.patterns_completed),
        )
        .col_expr(participant::Column::LastActive, Expr::value(now));

    // The final code map is optional; keep the last synced snapshot if absent.
    if let Some(snapshot) = payload.code_snapshot() {
        update = update.col_expr(participant::Column::CodeData, Expr::value(Some(snapshot)));
    }

    let result = update
        .filter(participant::Column::LotNumber.eq(payload.lot_number.trim()))
        .filter(participant::Column::Status.eq(SessionStatus::Active))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(reject_frozen_session(&state, payload.lot_number.trim()).await);
    }

    info!(
        lot_number = %payload.lot_number,
        patterns_completed = payload.patterns_completed,
        total_time = payload.total_time,
        "Session finished"
    );

    Ok(Json(AckResponse { success: true }))
}

/// Terminal transition: the countdown reached zero while still active.
#[utoipa::path(
    post,
    path = "/api/disqualify",
    tag = "Session",
    operation_id = "disqualify",
    summary = "Mark a session disqualified",
    request_body = DisqualifyRequest,
    responses(
        (status = 200, description = "Session disqualified", body = AckResponse),
        (status = 403, description = "Session already terminal (SESSION_INACTIVE)", body = ErrorBody),
        (status = 404, description = "Unknown participant (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(lot_number = %payload.lot_number))]
pub async fn disqualify(
    State(state): State<AppState>,
    AppJson(payload): AppJson<DisqualifyRequest>,
) -> Result<Json<AckResponse>, AppError> {
    validate_lot_number(&payload.lot_number)?;

    let result = participant::Entity::update_many()
        .col_expr(
            participant::Column::Status,
            Expr::value(SessionStatus::Disqualified),
        )
        .col_expr(participant::Column::LastActive, Expr::value(Utc::now()))
        .filter(participant::Column::LotNumber.eq(payload.lot_number.trim()))
        .filter(participant::Column::Status.eq(SessionStatus::Active))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(reject_frozen_session(&state, payload.lot_number.trim()).await);
    }

    info!(lot_number = %payload.lot_number, "Session disqualified");

    Ok(Json(AckResponse { success: true }))
}
