use serde::Deserialize;

use crate::error::AppError;

/// Request body for updating one setting.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SettingUpdateRequest {
    #[schema(example = "SESSION_DURATION_MINUTES")]
    pub key: String,
    /// Raw string value; booleans and numbers are parsed by clients.
    #[schema(example = "60")]
    pub value: String,
}

pub fn validate_setting_update(req: &SettingUpdateRequest) -> Result<(), AppError> {
    let key = req.key.trim();
    if key.is_empty() || key.len() > 50 {
        return Err(AppError::Validation("Key must be 1-50 characters".into()));
    }
    if req.value.len() > 50 {
        return Err(AppError::Validation("Value must be at most 50 characters".into()));
    }
    Ok(())
}
