use axum::Json;
use axum::extract::{Path, State};
use sea_orm::*;
use tracing::{info, instrument, warn};

use crate::entity::participant;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AdminAuth;
use crate::extractors::json::AppJson;
use crate::models::admin::{AdminLoginRequest, AdminLoginResponse};
use crate::models::session::{AckResponse, ParticipantResponse};
use crate::state::AppState;

/// Static shared-secret admin login. Credentials and the issued token come
/// from configuration; there is no account store behind this.
#[utoipa::path(
    post,
    path = "/api/admin/login",
    tag = "Admin",
    operation_id = "adminLogin",
    summary = "Admin login against the configured shared secret",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Token issued", body = AdminLoginResponse),
        (status = 401, description = "Invalid credentials (INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<AdminLoginRequest>,
) -> Result<Json<AdminLoginResponse>, AppError> {
    let admin = &state.config.admin;
    if payload.email != admin.email || payload.password != admin.password {
        warn!("Rejected admin login attempt");
        return Err(AppError::InvalidCredentials);
    }

    Ok(Json(AdminLoginResponse {
        success: true,
        token: admin.token.clone(),
    }))
}

/// All sessions, most recently active first.
#[utoipa::path(
    get,
    path = "/api/admin/participants",
    tag = "Admin",
    operation_id = "listParticipants",
    summary = "All participant sessions, most recently active first",
    responses(
        (status = 200, description = "Participant sessions", body = Vec<ParticipantResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("admin_token" = [])),
)]
#[instrument(skip(state, _auth))]
pub async fn list_participants(
    _auth: AdminAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<ParticipantResponse>>, AppError> {
    let sessions = participant::Entity::find()
        .order_by_desc(participant::Column::LastActive)
        .all(&state.db)
        .await?;

    Ok(Json(
        sessions.into_iter().map(ParticipantResponse::from).collect(),
    ))
}

/// Administrative purge: the only way a session row is ever deleted.
#[utoipa::path(
    delete,
    path = "/api/admin/participants/{lot_number}",
    tag = "Admin",
    operation_id = "deleteParticipant",
    summary = "Delete a participant session",
    params(("lot_number" = String, Path, description = "Lot number")),
    responses(
        (status = 200, description = "Session deleted", body = AckResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Unknown participant (NOT_FOUND)", body = ErrorBody),
    ),
    security(("admin_token" = [])),
)]
#[instrument(skip(state, _auth), fields(lot_number = %lot_number))]
pub async fn delete_participant(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(lot_number): Path<String>,
) -> Result<Json<AckResponse>, AppError> {
    let result = participant::Entity::delete_by_id(&lot_number)
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("User not found".into()));
    }

    info!(lot_number = %lot_number, "Participant session deleted");

    Ok(Json(AckResponse { success: true }))
}
