use common::Language;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    #[serde(default)]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec![],
            max_age: default_cors_max_age(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Static shared-secret admin credentials. Override via
/// `GAUNTLET__ADMIN__EMAIL` / `GAUNTLET__ADMIN__PASSWORD` / `GAUNTLET__ADMIN__TOKEN`.
#[derive(Debug, Deserialize, Clone)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
    /// Bearer token issued on admin login and checked on admin mutations.
    pub token: String,
}

/// Queue and backend limits for one language.
#[derive(Debug, Deserialize, Clone)]
pub struct LanguageLimits {
    /// Max concurrent in-flight backend calls.
    pub max_parallel: usize,
    /// Max pending jobs before submissions are rejected.
    pub max_queue: usize,
    /// Run timeout forwarded to the backend, in milliseconds.
    pub time_limit_ms: u64,
    /// Reserved: parsed but never transmitted to the backend.
    pub memory_limit_bytes: u64,
    /// Minimum interval between one participant's submissions, in milliseconds.
    pub cooldown_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExecutionConfig {
    /// Execute endpoint of the external code-execution backend.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default = "default_c_limits")]
    pub c: LanguageLimits,
    #[serde(default = "default_java_limits")]
    pub java: LanguageLimits,
}

fn default_backend_url() -> String {
    "https://emkc.org/api/v2/piston/execute".into()
}

fn default_c_limits() -> LanguageLimits {
    LanguageLimits {
        max_parallel: 5,
        max_queue: 40,
        time_limit_ms: 2000,
        memory_limit_bytes: 64 * 1024 * 1024,
        cooldown_ms: 5000,
    }
}

fn default_java_limits() -> LanguageLimits {
    LanguageLimits {
        max_parallel: 1,
        max_queue: 20,
        time_limit_ms: 2000,
        memory_limit_bytes: 128 * 1024 * 1024,
        cooldown_ms: 5000,
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            c: default_c_limits(),
            java: default_java_limits(),
        }
    }
}

impl ExecutionConfig {
    pub fn limits(&self, language: Language) -> &LanguageLimits {
        match language {
            Language::C => &self.c,
            Language::Java => &self.java,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub admin: AdminConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("database.url", "postgres://localhost:5432/gauntlet")?
            .set_default("admin.email", "admin@gauntlet.local")?
            .set_default("admin.password", "change-me")?
            .set_default("admin.token", "admin-secret-token-123")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., GAUNTLET__DATABASE__URL)
            .add_source(Environment::with_prefix("GAUNTLET").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
