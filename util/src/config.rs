//! Application configuration.
//!
//! `AppConfig` holds the runtime values loaded from `.env` and environment
//! variables. It is constructed once by the binary and handed to the pieces
//! that need it; nothing reads it through a global.

use std::env;
use std::str::FromStr;

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    /// Root of the JSON result store and the log directory.
    pub storage_root: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub oracle_timeout_secs: u64,
    pub max_parallel_parts: usize,
    pub max_concurrent_runs: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: "development".into(),
            project_name: "part-grader".into(),
            log_level: "info".into(),
            log_file: "grader.log".into(),
            log_to_stdout: false,
            storage_root: "data".into(),
            gemini_api_key: String::new(),
            gemini_model: "gemini-2.0-flash".into(),
            oracle_timeout_secs: 30,
            max_parallel_parts: 4,
            max_concurrent_runs: 4,
        }
    }
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Missing variables fall back to [`AppConfig::default`]. Malformed
    /// numeric values are logged and replaced by their default as well.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_vars()
    }

    /// Same as [`AppConfig::from_env`] without touching `.env`.
    pub fn from_vars() -> Self {
        let d = Self::default();
        Self {
            env: env::var("APP_ENV").unwrap_or(d.env),
            project_name: env::var("PROJECT_NAME").unwrap_or(d.project_name),
            log_level: env::var("LOG_LEVEL").unwrap_or(d.log_level),
            log_file: env::var("LOG_FILE").unwrap_or(d.log_file),
            log_to_stdout: env::var("LOG_TO_STDOUT")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(d.log_to_stdout),
            storage_root: env::var("STORAGE_ROOT").unwrap_or(d.storage_root),
            gemini_api_key: env::var("GEMINI_API_KEY").unwrap_or(d.gemini_api_key),
            gemini_model: env::var("GEMINI_MODEL").unwrap_or(d.gemini_model),
            oracle_timeout_secs: parse_or("ORACLE_TIMEOUT_SECS", d.oracle_timeout_secs),
            max_parallel_parts: parse_or("MAX_PARALLEL_PARTS", d.max_parallel_parts).max(1),
            max_concurrent_runs: parse_or("MAX_CONCURRENT_RUNS", d.max_concurrent_runs).max(1),
        }
    }

    /// `true` when an API key is configured for the hosted oracle.
    pub fn has_gemini_key(&self) -> bool {
        !self.gemini_api_key.trim().is_empty()
    }
}

fn parse_or<T: FromStr + Copy>(key: &str, fallback: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring malformed config value");
                fallback
            }
        },
        Err(_) => fallback,
    }
}
