use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A target output participants must reproduce. `level_order` determines the
/// progression sequence and pattern-lock gating on the client.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pattern")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    /// Stored verbatim; whitespace normalization happens at comparison time.
    #[sea_orm(column_type = "Text")]
    pub target_output: String,
    pub level_order: i32,
    pub is_active: bool,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
