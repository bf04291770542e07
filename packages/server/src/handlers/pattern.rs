use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::pattern;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AdminAuth;
use crate::extractors::json::AppJson;
use crate::models::pattern::{CreatePatternRequest, PatternResponse, validate_create_pattern};
use crate::models::session::AckResponse;
use crate::state::AppState;

/// The active pattern catalog in progression order. Public: participants
/// load the catalog without credentials.
#[utoipa::path(
    get,
    path = "/api/patterns",
    tag = "Patterns",
    operation_id = "listActivePatterns",
    summary = "Active pattern catalog in level order",
    responses(
        (status = 200, description = "Active patterns", body = Vec<PatternResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_active_patterns(
    State(state): State<AppState>,
) -> Result<Json<Vec<PatternResponse>>, AppError> {
    let patterns = pattern::Entity::find()
        .filter(pattern::Column::IsActive.eq(true))
        .order_by_asc(pattern::Column::LevelOrder)
        .all(&state.db)
        .await?;

    Ok(Json(
        patterns.into_iter().map(PatternResponse::from).collect(),
    ))
}

/// Full catalog including inactive patterns, for the admin screens.
#[utoipa::path(
    get,
    path = "/api/admin/patterns",
    tag = "Patterns",
    operation_id = "listPatterns",
    summary = "Full pattern catalog in level order",
    responses(
        (status = 200, description = "All patterns", body = Vec<PatternResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_patterns(
    State(state): State<AppState>,
) -> Result<Json<Vec<PatternResponse>>, AppError> {
    let patterns = pattern::Entity::find()
        .order_by_asc(pattern::Column::LevelOrder)
        .all(&state.db)
        .await?;

    Ok(Json(
        patterns.into_iter().map(PatternResponse::from).collect(),
    ))
}

/// Create a pattern.
#[utoipa::path(
    post,
    path = "/api/admin/patterns",
    tag = "Patterns",
    operation_id = "createPattern",
    summary = "Create a pattern",
    request_body = CreatePatternRequest,
    responses(
        (status = 201, description = "Pattern created", body = PatternResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("admin_token" = [])),
)]
#[instrument(skip(state, payload, _auth), fields(name = %payload.name))]
pub async fn create_pattern(
    _auth: AdminAuth,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreatePatternRequest>,
) -> Result<(axum::http::StatusCode, Json<PatternResponse>), AppError> {
    validate_create_pattern(&payload)?;

    let new_pattern = pattern::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        target_output: Set(payload.target_output),
        level_order: Set(payload.level_order),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let model = new_pattern.insert(&state.db).await?;
    info!(id = model.id, level_order = model.level_order, "Pattern created");

    Ok((axum::http::StatusCode::CREATED, Json(model.into())))
}

/// Delete a pattern by id.
#[utoipa::path(
    delete,
    path = "/api/admin/patterns/{id}",
    tag = "Patterns",
    operation_id = "deletePattern",
    summary = "Delete a pattern",
    params(("id" = i32, Path, description = "Pattern ID")),
    responses(
        (status = 200, description = "Pattern deleted", body = AckResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Pattern not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("admin_token" = [])),
)]
#[instrument(skip(state, _auth), fields(pattern_id = %id))]
pub async fn delete_pattern(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AckResponse>, AppError> {
    let result = pattern::Entity::delete_by_id(id).exec(&state.db).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Pattern not found".into()));
    }

    info!(pattern_id = id, "Pattern deleted");

    Ok(Json(AckResponse { success: true }))
}
