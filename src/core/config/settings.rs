//! Typed views over the merged config value.
//!
//! Components receive these explicitly at construction instead of reading
//! the environment themselves.

use std::time::Duration;

use serde_json::Value;

use crate::core::errors::ConfigError;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 20;
const DEFAULT_HISTORY_LIMIT: i64 = 20;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCredentials {
    pub api_key: String,
    pub engine_id: String,
}

impl SearchCredentials {
    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            engine_id: engine_id.into(),
        }
    }

    pub fn from_config(config: &Value) -> Result<Self, ConfigError> {
        let api_key = non_empty_str(config, &["tools", "google_search_api_key"])
            .ok_or(ConfigError::MissingCredential("GOOGLE_CSE_API_KEY"))?;
        let engine_id = non_empty_str(config, &["tools", "google_search_engine_id"])
            .ok_or(ConfigError::MissingCredential("GOOGLE_CSE_CX"))?;
        Ok(Self::new(api_key, engine_id))
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl LlmSettings {
    pub fn from_config(config: &Value) -> Result<Self, ConfigError> {
        let api_key = non_empty_str(config, &["llm", "api_key"])
            .ok_or(ConfigError::MissingCredential("GROQ_API_KEY"))?;
        let base_url = non_empty_str(config, &["llm", "base_url"])
            .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string());
        let model = non_empty_str(config, &["llm", "model"])
            .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string());

        Ok(Self {
            api_key,
            base_url,
            model,
            timeout: llm_timeout(config),
        })
    }
}

/// Completion deadline; independent of the key so clients can be built
/// before any credential is known.
pub fn llm_timeout(config: &Value) -> Duration {
    let secs = config
        .get("llm")
        .and_then(|v| v.get("timeout_secs"))
        .and_then(|v| v.as_u64())
        .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

/// Listen address. `HOST` and `PORT` win over `server.host` and `server.port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn from_config<F>(config: &Value, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .or_else(|| non_empty_str(config, &["server", "host"]))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = lookup("PORT")
            .and_then(|v| v.trim().parse::<u16>().ok())
            .or_else(|| {
                config
                    .get("server")
                    .and_then(|v| v.get("port"))
                    .and_then(|v| v.as_u64())
                    .and_then(|v| u16::try_from(v).ok())
            })
            .unwrap_or(DEFAULT_PORT);
        Self { host, port }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn history_limit(config: &Value) -> i64 {
    config
        .get("chat_history")
        .and_then(|v| v.get("default_limit"))
        .and_then(|v| v.as_i64())
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
}

fn non_empty_str(config: &Value, path: &[&str]) -> Option<String> {
    let mut current = config;
    for key in path {
        current = current.get(*key)?;
    }
    current
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
