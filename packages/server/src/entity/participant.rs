use common::SessionStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One participant's contest session. The lot number doubles as the
/// session identifier: a participant has exactly one session, created on
/// first login and mutated in place until it reaches a terminal status.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "participant")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub lot_number: String,

    pub lot_name: String,
    pub college_name: Option<String>,

    /// One of: active, finished, disqualified. Transitions are one-way;
    /// every progress write filters on `active` so terminal rows stay frozen.
    pub status: SessionStatus,

    pub start_time: DateTimeUtc,
    pub end_time: Option<DateTimeUtc>,
    /// Accumulated elapsed time in milliseconds, as last reported.
    pub total_time_ms: i64,

    pub warnings: i32,
    pub lines_of_code: i32,
    pub no_of_loops: i32,
    pub attempts: i32,
    pub patterns_completed: i32,

    /// Per-pattern code snapshots as a JSON map of pattern id → source.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub code_data: Option<serde_json::Value>,

    pub last_active: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
