use serde::Deserialize;

use crate::error::AppError;

/// Maximum accepted source size in bytes.
pub const MAX_SOURCE_SIZE: usize = 262_144; // 256 KiB

/// Request body for `/api/execute`.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCodeRequest {
    /// Language tag: "c" or "java".
    #[schema(example = "c")]
    pub language: String,
    /// Full source of the participant's program.
    pub code: String,
    pub lot_number: String,
}

pub fn validate_execute_request(req: &ExecuteCodeRequest) -> Result<(), AppError> {
    super::session::validate_lot_number(&req.lot_number)?;
    if req.code.trim().is_empty() {
        return Err(AppError::Validation("Code must not be empty".into()));
    }
    if req.code.len() > MAX_SOURCE_SIZE {
        return Err(AppError::Validation(format!(
            "Code size ({} bytes) exceeds maximum ({} bytes)",
            req.code.len(),
            MAX_SOURCE_SIZE
        )));
    }
    Ok(())
}
