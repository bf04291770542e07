use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::error::AppError;
use crate::state::AppState;

/// Marker extractor for admin mutations: checks the `Authorization` bearer
/// token against the configured static admin secret.
pub struct AdminAuth;

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenMissing)?;

        let token = header.strip_prefix("Bearer ").ok_or(AppError::TokenInvalid)?;

        if token != state.config.admin.token {
            return Err(AppError::TokenInvalid);
        }

        Ok(AdminAuth)
    }
}
