use std::{collections::HashMap, net::SocketAddr, path::Path};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ConfigError;
use crate::recognition::ValidationPolicy;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineConfig {
    pub channel_secret: String,
    pub channel_access_token: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub line: Option<LineConfig>,
    pub bind_addr: SocketAddr,
    pub policy: ValidationPolicy,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout_ms: 20_000,
        }
    }
}

/// Process environment layered over a `.env` file. Real variables win.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    file: HashMap<String, String>,
}

impl EnvSource {
    /// Reads `path` without touching the process environment. A missing file is empty.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let entries = match dotenvy::from_path_iter(path) {
            Ok(entries) => entries,
            Err(e) if e.not_found() => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::invalid(".env", e.to_string())),
        };

        let mut file = HashMap::new();
        for entry in entries {
            let (key, value) = entry.map_err(|e| ConfigError::invalid(".env", e.to_string()))?;
            file.insert(key, value);
        }
        Ok(Self { file })
    }

    pub fn file_value(&self, key: &str) -> Option<String> {
        self.file.get(key).cloned()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().or_else(|| self.file_value(key))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `VALIDATION_POLICY` alone, for commands that need no credentials.
pub fn policy_from_lookup<F>(lookup: F) -> Result<ValidationPolicy, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match non_blank(lookup("VALIDATION_POLICY")) {
        Some(raw) => ValidationPolicy::parse(&raw).ok_or_else(|| {
            ConfigError::invalid("VALIDATION_POLICY", format!("unknown policy '{}'", raw))
        }),
        None => Ok(ValidationPolicy::default()),
    }
}

impl AppConfig {
    pub fn from_source(source: &EnvSource) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| source.get(key))
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_blank(lookup(key));
        let defaults = GeminiConfig::default();

        let base_url = get("GEMINI_BASE_URL").unwrap_or(defaults.base_url);
        Url::parse(&base_url).map_err(|e| ConfigError::invalid("GEMINI_BASE_URL", e.to_string()))?;

        let timeout_ms = match get("GEMINI_TIMEOUT_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| ConfigError::invalid("GEMINI_TIMEOUT_MS", e.to_string()))?
                .clamp(1_000, 120_000),
            None => defaults.timeout_ms,
        };

        let gemini = GeminiConfig {
            api_key: get("GEMINI_API_KEY").ok_or_else(|| ConfigError::missing("GEMINI_API_KEY"))?,
            model: get("GEMINI_MODEL").unwrap_or(defaults.model),
            base_url,
            timeout_ms,
        };

        let line = match (get("LINE_CHANNEL_SECRET"), get("LINE_CHANNEL_ACCESS_TOKEN")) {
            (Some(channel_secret), Some(channel_access_token)) => Some(LineConfig {
                channel_secret,
                channel_access_token,
            }),
            _ => None,
        };

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid("BIND_ADDR", e.to_string()))?;

        let policy = policy_from_lookup(&lookup)?;

        Ok(Self {
            gemini,
            line,
            bind_addr,
            policy,
        })
    }

    /// LINE credentials, required only by the webhook server.
    pub fn require_line(&self) -> Result<&LineConfig, ConfigError> {
        self.line
            .as_ref()
            .ok_or_else(|| ConfigError::missing("LINE_CHANNEL_SECRET / LINE_CHANNEL_ACCESS_TOKEN"))
    }
}
