#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a participant session.
///
/// Transitions are one-way: `Active` may move to `Finished` or
/// `Disqualified`; neither terminal status ever transitions again. When the
/// `sea-orm` feature is enabled, this enum can be used directly in entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Session is in progress; progress writes and run attempts are accepted.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "active"))]
    Active,
    /// Every pattern in the catalog was completed before time ran out.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "finished"))]
    Finished,
    /// The countdown reached zero while the session was still active.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "disqualified"))]
    Disqualified,
}

impl SessionStatus {
    /// Returns true if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }

    /// All possible status values.
    pub const ALL: &'static [SessionStatus] = &[Self::Active, Self::Finished, Self::Disqualified];

    /// Returns the string representation (lowercase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Finished => "finished",
            Self::Disqualified => "disqualified",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid session status '{invalid}'")]
pub struct ParseStatusError {
    invalid: String,
}

impl FromStr for SessionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "finished" => Ok(Self::Finished),
            "disqualified" => Ok(Self::Disqualified),
            other => Err(ParseStatusError {
                invalid: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_strings() {
        for status in SessionStatus::ALL {
            assert_eq!(status.as_str().parse::<SessionStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn only_active_is_non_terminal() {
        assert!(!SessionStatus::Active.is_terminal());
        assert!(SessionStatus::Finished.is_terminal());
        assert!(SessionStatus::Disqualified.is_terminal());
    }

    #[test]
    fn rejects_unknown_status() {
        assert!("paused".parse::<SessionStatus>().is_err());
    }
}
