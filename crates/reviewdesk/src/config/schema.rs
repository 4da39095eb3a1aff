use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub version: String,
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default)]
    pub in_flight_policy: InFlightPolicy,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default)]
    pub accept: AcceptConfig,
    #[serde(default)]
    pub api_keys: ApiKeysConfig,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_models() -> Vec<String> {
    [
        "gpt-4o-mini",
        "gpt-4o",
        "gpt-4.1-mini",
        "gemini-1.5-flash",
        "gemini-1.5-pro",
    ]
    .iter()
    .map(|m| m.to_string())
    .collect()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            server_url: default_server_url(),
            models: default_models(),
            default_model: default_model(),
            in_flight_policy: InFlightPolicy::default(),
            connect_timeout_secs: None,
            accept: AcceptConfig::default(),
            api_keys: ApiKeysConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// What happens when a stage is triggered while its previous invocation is
/// still waiting for the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InFlightPolicy {
    /// Issue the new call; only the most recently started invocation may
    /// write the stage's result and status.
    #[default]
    Supersede,
    /// Refuse the new trigger without issuing a call.
    Reject,
}

/// Advisory file-picker filters. Never enforced, only logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptConfig {
    #[serde(default = "default_submission_accept")]
    pub submission: Vec<String>,
    #[serde(default = "default_checklist_accept")]
    pub checklist: Vec<String>,
}

fn default_submission_accept() -> Vec<String> {
    vec![".pdf".to_string(), ".txt".to_string(), ".md".to_string()]
}

fn default_checklist_accept() -> Vec<String> {
    vec![".txt".to_string(), ".md".to_string(), ".csv".to_string()]
}

impl Default for AcceptConfig {
    fn default() -> Self {
        Self {
            submission: default_submission_accept(),
            checklist: default_checklist_accept(),
        }
    }
}

/// Where each provider key comes from. Resolved in order: value, file, env vars.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeySourceConfig {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub env: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    #[serde(default = "default_openai_source")]
    pub openai: KeySourceConfig,
    #[serde(default = "default_gemini_source")]
    pub gemini: KeySourceConfig,
}

fn default_openai_source() -> KeySourceConfig {
    KeySourceConfig {
        env: vec!["OPENAI_API_KEY".to_string()],
        ..Default::default()
    }
}

fn default_gemini_source() -> KeySourceConfig {
    KeySourceConfig {
        env: vec!["GEMINI_API_KEY".to_string(), "GOOGLE_API_KEY".to_string()],
        ..Default::default()
    }
}

impl Default for ApiKeysConfig {
    fn default() -> Self {
        Self {
            openai: default_openai_source(),
            gemini: default_gemini_source(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}
