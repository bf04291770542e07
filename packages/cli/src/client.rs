//! HTTP client for the Gauntlet server.

use std::collections::BTreeMap;

use anyhow::Context;
use async_trait::async_trait;
use common::ExecutionOutcome;
use serde::Deserialize;
use serde_json::json;

use crate::session::{PatternInfo, SessionReport};

/// Persistence calls the session engine needs. HTTP in production; tests
/// substitute a recording stub.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    async fn login(&self) -> anyhow::Result<()>;
    async fn sync_progress(&self, report: &SessionReport) -> anyhow::Result<()>;
    async fn finish(&self, report: &SessionReport) -> anyhow::Result<()>;
    async fn disqualify(&self) -> anyhow::Result<()>;
}

/// Who is driving this session.
#[derive(Clone, Debug)]
pub struct Identity {
    pub lot_number: String,
    pub lot_name: String,
    pub college_name: Option<String>,
}

/// Result of an execute call: either the backend outcome or a structured
/// server rejection (cooldown, capacity, inactive session).
pub enum RunResponse {
    Completed(Box<ExecutionOutcome>),
    Rejected { status: u16, message: String },
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatternDto {
    id: i32,
    name: String,
    target_output: String,
    level_order: i32,
}

/// Leaderboard row as served by the API.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub lot_number: String,
    pub lot_name: String,
    pub status: String,
    pub patterns_completed: i32,
    pub total_time: i64,
    pub no_of_loops: i32,
    pub lines_of_code: i32,
    pub warnings: i32,
    pub attempts: i32,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    identity: Identity,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, identity: Identity) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            identity,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    fn report_body(&self, report: &SessionReport) -> serde_json::Value {
        let code_map: BTreeMap<String, &String> = report
            .code_map
            .iter()
            .map(|(id, code)| (id.to_string(), code))
            .collect();
        json!({
            "lotNumber": self.identity.lot_number,
            "codeMap": code_map,
            "totalTime": report.total_time_ms,
            "warnings": report.warnings,
            "linesOfCode": report.lines_of_code,
            "noOfLoops": report.no_of_loops,
            "attempts": report.attempts,
            "patternsCompleted": report.patterns_completed,
        })
    }

    async fn post_checked(&self, path: &str, body: &serde_json::Value) -> anyhow::Result<()> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {path}"))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("POST {path} returned {status}");
        }
        Ok(())
    }

    pub async fn fetch_settings(&self) -> anyhow::Result<BTreeMap<String, String>> {
        let response = self
            .http
            .get(self.url("/api/settings"))
            .send()
            .await
            .context("GET /api/settings")?;
        Ok(response.json().await.context("decode settings snapshot")?)
    }

    pub async fn update_setting(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.post_checked("/api/settings", &json!({ "key": key, "value": value }))
            .await
    }

    pub async fn fetch_patterns(&self) -> anyhow::Result<Vec<PatternInfo>> {
        let response = self
            .http
            .get(self.url("/api/patterns"))
            .send()
            .await
            .context("GET /api/patterns")?;
        let patterns: Vec<PatternDto> = response.json().await.context("decode pattern catalog")?;
        Ok(patterns
            .into_iter()
            .map(|p| PatternInfo {
                id: p.id,
                name: p.name,
                target_output: p.target_output,
                level_order: p.level_order,
            })
            .collect())
    }

    pub async fn fetch_leaderboard(&self) -> anyhow::Result<Vec<LeaderboardRow>> {
        let response = self
            .http
            .get(self.url("/api/leaderboard"))
            .send()
            .await
            .context("GET /api/leaderboard")?;
        Ok(response.json().await.context("decode leaderboard")?)
    }

    /// Submit code for execution. Server rejections (429, 503, 403, 404)
    /// come back as `RunResponse::Rejected`; only transport failures error.
    pub async fn execute(&self, language: &str, code: &str) -> anyhow::Result<RunResponse> {
        let response = self
            .http
            .post(self.url("/api/execute"))
            .json(&json!({
                "language": language,
                "code": code,
                "lotNumber": self.identity.lot_number,
            }))
            .send()
            .await
            .context("POST /api/execute")?;

        let status = response.status();
        if status.is_success() {
            let outcome = response.json().await.context("decode execution outcome")?;
            return Ok(RunResponse::Completed(Box::new(outcome)));
        }

        let body: ErrorBody = response.json().await.unwrap_or(ErrorBody {
            message: status.to_string(),
        });
        Ok(RunResponse::Rejected {
            status: status.as_u16(),
            message: body.message,
        })
    }
}

#[async_trait]
impl SessionTransport for ApiClient {
    async fn login(&self) -> anyhow::Result<()> {
        self.post_checked(
            "/api/login",
            &json!({
                "lotNumber": self.identity.lot_number,
                "lotName": self.identity.lot_name,
                "collegeName": self.identity.college_name,
            }),
        )
        .await
    }

    async fn sync_progress(&self, report: &SessionReport) -> anyhow::Result<()> {
        self.post_checked("/api/update-progress", &self.report_body(report))
            .await
    }

    async fn finish(&self, report: &SessionReport) -> anyhow::Result<()> {
        self.post_checked("/api/finish", &self.report_body(report))
            .await
    }

    async fn disqualify(&self) -> anyhow::Result<()> {
        self.post_checked(
            "/api/disqualify",
            &json!({ "lotNumber": self.identity.lot_number }),
        )
        .await
    }
}
