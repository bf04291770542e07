//! Wire contract for the external code-execution backend.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Languages participants may submit in. Each language has its own execution
/// queue, limits, and pinned runtime version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Java,
}

impl Language {
    /// Runtime version requested from the execution backend.
    pub fn runtime_version(&self) -> &'static str {
        match self {
            Self::C => "10.2.0",
            Self::Java => "15.0.2",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::C => "c",
            Self::Java => "java",
        }
    }

    pub const ALL: &'static [Language] = &[Self::C, Self::Java];
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an unsupported language tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language '{invalid}'")]
pub struct ParseLanguageError {
    invalid: String,
}

impl FromStr for Language {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "c" => Ok(Self::C),
            "java" => Ok(Self::Java),
            other => Err(ParseLanguageError {
                invalid: other.to_string(),
            }),
        }
    }
}

/// One source file sent to the backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecuteFile {
    /// Source code content.
    pub content: String,
}

/// Request body for the backend's execute endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// Language tag (e.g. "c", "java").
    pub language: String,
    /// Pinned runtime version.
    pub version: String,
    /// Source files; a single file for this system.
    pub files: Vec<ExecuteFile>,
    /// Run timeout in milliseconds, enforced backend-side.
    pub run_timeout: u64,
}

impl ExecuteRequest {
    pub fn new(language: Language, source: String, run_timeout: u64) -> Self {
        Self {
            language: language.as_str().to_string(),
            version: language.runtime_version().to_string(),
            files: vec![ExecuteFile { content: source }],
            run_timeout,
        }
    }
}

/// One process stage of a backend response.
#[derive(Clone, Debug, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProcessStage {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    /// Exit code, absent when the process was killed.
    #[serde(default)]
    pub code: Option<i32>,
    /// Termination signal name. Non-empty means abnormal termination
    /// (time or memory limit) and must never count as a pattern match.
    #[serde(default)]
    pub signal: Option<String>,
}

/// Full backend response for one execution.
#[derive(Clone, Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ExecutionOutcome {
    pub run: ProcessStage,
}

impl ExecutionOutcome {
    /// A run eligible for pattern matching: exited normally with no stderr.
    pub fn is_clean(&self) -> bool {
        self.run.signal.as_deref().is_none_or(str::is_empty) && self.run.stderr.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_round_trips() {
        for lang in Language::ALL {
            assert_eq!(lang.as_str().parse::<Language>().unwrap(), *lang);
        }
        assert!("python".parse::<Language>().is_err());
    }

    #[test]
    fn signalled_runs_are_never_clean() {
        let outcome = ExecutionOutcome {
            run: ProcessStage {
                stdout: "* * *".into(),
                signal: Some("SIGKILL".into()),
                ..Default::default()
            },
        };
        assert!(!outcome.is_clean());
    }

    #[test]
    fn stderr_disqualifies_a_run() {
        let outcome = ExecutionOutcome {
            run: ProcessStage {
                stdout: "ok".into(),
                stderr: "warning: deprecated".into(),
                ..Default::default()
            },
        };
        assert!(!outcome.is_clean());
    }

    #[test]
    fn clean_run_requires_no_signal_and_empty_stderr() {
        let outcome = ExecutionOutcome {
            run: ProcessStage {
                stdout: "ok".into(),
                code: Some(0),
                ..Default::default()
            },
        };
        assert!(outcome.is_clean());
    }
}
