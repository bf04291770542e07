use chrono::Utc;
use sea_orm::*;
use tracing::info;

use crate::entity::{pattern, setting};

/// Default settings seeded on startup.
const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    ("PASTE_SECURITY", "true"),
    ("FOCUS_SECURITY", "true"),
    ("SESSION_DURATION_MINUTES", "60"),
];

const DEFAULT_PATTERN_NAME: &str = "Hollow Triangle";

const DEFAULT_PATTERN: &str = "* * * * *
*     *
*   *
* *
*";

/// Seed the `setting` table with defaults, leaving existing values alone.
pub async fn seed_settings(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut inserted = 0u32;
    for &(key, value) in DEFAULT_SETTINGS {
        let model = setting::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(Utc::now()),
        };

        let result = setting::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(setting::Column::Key)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if inserted > 0 {
        info!(inserted, "Seeded default settings");
    }

    Ok(())
}

/// Insert the starter pattern when the catalog is empty.
pub async fn seed_default_pattern(db: &DatabaseConnection) -> Result<(), DbErr> {
    let existing = pattern::Entity::find()
        .filter(pattern::Column::LevelOrder.eq(1))
        .one(db)
        .await?;

    if existing.is_none() {
        pattern::ActiveModel {
            name: Set(DEFAULT_PATTERN_NAME.to_string()),
            target_output: Set(DEFAULT_PATTERN.to_string()),
            level_order: Set(1),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        info!(name = DEFAULT_PATTERN_NAME, "Seeded default pattern");
    }

    Ok(())
}

pub async fn seed_defaults(db: &DatabaseConnection) -> Result<(), DbErr> {
    seed_settings(db).await?;
    seed_default_pattern(db).await?;
    Ok(())
}
