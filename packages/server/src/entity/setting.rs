use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A key/value system setting. Values are stored as raw strings so booleans
/// and numbers share one table; clients parse on read.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "setting")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,

    pub value: String,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
