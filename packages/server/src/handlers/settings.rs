use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::setting;
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::session::AckResponse;
use crate::models::settings::{SettingUpdateRequest, validate_setting_update};
use crate::state::AppState;

/// Current settings snapshot as a key → raw-string-value map. Read fresh on
/// every request; clients cache it locally with a short re-poll interval.
#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "Settings",
    operation_id = "getSettings",
    summary = "Key/value settings snapshot",
    responses(
        (status = 200, description = "Current settings snapshot"),
    ),
)]
#[instrument(skip(state))]
pub async fn get_settings(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, String>>, AppError> {
    let snapshot = setting::Entity::find()
        .all(&state.db)
        .await?
        .into_iter()
        .map(|row| (row.key, row.value))
        .collect();

    Ok(Json(snapshot))
}

/// Update one existing setting. Unknown keys are rejected rather than
/// created, so a typo cannot silently add a dead toggle.
#[utoipa::path(
    post,
    path = "/api/settings",
    tag = "Settings",
    operation_id = "updateSetting",
    summary = "Update one setting",
    request_body = SettingUpdateRequest,
    responses(
        (status = 200, description = "Setting updated", body = AckResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Unknown setting key (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(key = %payload.key))]
pub async fn update_setting(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SettingUpdateRequest>,
) -> Result<Json<AckResponse>, AppError> {
    validate_setting_update(&payload)?;

    let key = payload.key.trim();
    let result = setting::Entity::update_many()
        .col_expr(setting::Column::Value, Expr::value(payload.value.clone()))
        .col_expr(setting::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(setting::Column::Key.eq(key))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Unknown setting '{key}'")));
    }

    info!(key, value = %payload.value, "Setting updated");

    Ok(Json(AckResponse { success: true }))
}
