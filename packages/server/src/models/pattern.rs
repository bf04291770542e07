use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::pattern;
use crate::error::AppError;

/// Request body for creating a pattern.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatternRequest {
    #[schema(example = "Hollow Triangle")]
    pub name: String,
    /// Exact target output, whitespace-significant as entered.
    pub target_output: String,
    /// Position in the progression sequence (1-based by convention).
    #[schema(example = 1)]
    pub level_order: i32,
}

/// A pattern as exposed over the API.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatternResponse {
    pub id: i32,
    pub name: String,
    pub target_output: String,
    pub level_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<pattern::Model> for PatternResponse {
    fn from(m: pattern::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            target_output: m.target_output,
            level_order: m.level_order,
            is_active: m.is_active,
            created_at: m.created_at,
        }
    }
}

pub fn validate_create_pattern(req: &CreatePatternRequest) -> Result<(), AppError> {
    let name = req.name.trim();
    if name.is_empty() || name.chars().count() > 100 {
        return Err(AppError::Validation("Name must be 1-100 characters".into()));
    }
    if req.target_output.trim().is_empty() {
        return Err(AppError::Validation("Target output is required".into()));
    }
    if req.level_order < 1 {
        return Err(AppError::Validation("levelOrder must be >= 1".into()));
    }
    Ok(())
}
