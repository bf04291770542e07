use chrono::{DateTime, Utc};
use common::SessionStatus;
use serde::{Deserialize, Serialize};

use crate::entity::participant;
use crate::error::AppError;

/// Longest accepted lot number, matching the column width.
const MAX_LOT_NUMBER_LEN: usize = 50;

/// Request body for participant login (session start).
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Unique lot identifier for the participant/team.
    #[schema(example = "LOT-042")]
    pub lot_number: String,
    #[schema(example = "Team Segfault")]
    pub lot_name: String,
    #[serde(default)]
    pub college_name: Option<String>,
}

/// A participant session as exposed over the API.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResponse {
    pub lot_number: String,
    pub lot_name: String,
    pub college_name: Option<String>,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Accumulated elapsed time in milliseconds.
    pub total_time: i64,
    pub warnings: i32,
    pub lines_of_code: i32,
    pub no_of_loops: i32,
    pub attempts: i32,
    pub patterns_completed: i32,
    pub last_active: DateTime<Utc>,
}

impl From<participant::Model> for ParticipantResponse {
    fn from(m: participant::Model) -> Self {
        Self {
            lot_number: m.lot_number,
            lot_name: m.lot_name,
            college_name: m.college_name,
            status: m.status,
            start_time: m.start_time,
            end_time: m.end_time,
            total_time: m.total_time_ms,
            warnings: m.warnings,
            lines_of_code: m.lines_of_code,
            no_of_loops: m.no_of_loops,
            attempts: m.attempts,
            patterns_completed: m.patterns_completed,
            last_active: m.last_active,
        }
    }
}

/// Response for login: the freshly created or already-existing session.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub user: ParticipantResponse,
}

/// Aggregates reported by the client on periodic sync and on finish.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionReportRequest {
    pub lot_number: String,
    /// Code for the currently selected pattern, used when no map is sent.
    #[serde(default)]
    pub code: Option<String>,
    /// Per-pattern code snapshot map (pattern id → source).
    #[serde(default)]
    pub code_map: Option<serde_json::Value>,
    /// Elapsed time in milliseconds.
    pub total_time: i64,
    #[serde(default)]
    pub warnings: i32,
    #[serde(default)]
    pub lines_of_code: i32,
    #[serde(default)]
    pub no_of_loops: i32,
    #[serde(default)]
    pub attempts: i32,
    #[serde(default)]
    pub patterns_completed: i32,
}

impl SessionReportRequest {
    /// The code snapshot to persist: the map when present, else the single
    /// current-pattern source wrapped as a JSON string.
    pub fn code_snapshot(&self) -> Option<serde_json::Value> {
        self.code_map
            .clone()
            .or_else(|| self.code.clone().map(serde_json::Value::String))
    }
}

/// Request body for disqualification (client-reported time up).
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisqualifyRequest {
    pub lot_number: String,
}

/// Minimal acknowledgement body for write endpoints.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AckResponse {
    pub success: bool,
}

pub fn validate_lot_number(lot_number: &str) -> Result<(), AppError> {
    let trimmed = lot_number.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_LOT_NUMBER_LEN {
        return Err(AppError::Validation(format!(
            "Lot number must be 1-{MAX_LOT_NUMBER_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_login_request(req: &LoginRequest) -> Result<(), AppError> {
    validate_lot_number(&req.lot_number)?;
    if req.lot_name.trim().is_empty() {
        return Err(AppError::Validation("Lot name is required".into()));
    }
    Ok(())
}

pub fn validate_session_report(req: &SessionReportRequest) -> Result<(), AppError> {
    validate_lot_number(&req.lot_number)?;
    if req.total_time < 0 {
        return Err(AppError::Validation("totalTime must be >= 0".into()));
    }
    for (value, name) in [
        (req.warnings, "warnings"),
        (req.lines_of_code, "linesOfCode"),
        (req.no_of_loops, "noOfLoops"),
        (req.attempts, "attempts"),
        (req.patterns_completed, "patternsCompleted"),
    ] {
        if value < 0 {
            return Err(AppError::Validation(format!("{name} must be >= 0")));
        }
    }
    Ok(())
}
