use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::schema::ClientConfig;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "REVIEWDESK_CONFIG";

/// Environment variable overriding `server_url`.
pub const SERVER_URL_ENV_VAR: &str = "REVIEWDESK_SERVER_URL";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<ClientConfig, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: ClientConfig = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Default location: `<config dir>/reviewdesk/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("reviewdesk").join("config.json"))
}

/// Resolves the effective configuration.
///
/// Lookup order: explicit path, `$REVIEWDESK_CONFIG`, the default location if
/// the file exists, built-in defaults. `$REVIEWDESK_SERVER_URL` is applied last.
pub fn resolve_config(explicit: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    let from_env = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);

    let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(&path)?
        }
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(path) => {
                info!("Loading configuration from {:?}", path);
                load_config(&path)?
            }
            None => {
                debug!("No configuration file found, using defaults");
                ClientConfig::default()
            }
        },
    };

    apply_env_overrides(&mut config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut ClientConfig) -> Result<(), ConfigError> {
    if let Ok(url) = std::env::var(SERVER_URL_ENV_VAR) {
        if !url.trim().is_empty() {
            debug!("{} overrides server_url", SERVER_URL_ENV_VAR);
            config.server_url = url.trim().to_string();
            validate_server_url(&config.server_url)?;
        }
    }
    Ok(())
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &ClientConfig) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    validate_server_url(&config.server_url)?;

    if config.models.is_empty() {
        return Err(ConfigError::InvalidCatalog {
            reason: "at least one model is required".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for model in &config.models {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidCatalog {
                reason: "model identifiers must not be blank".to_string(),
            });
        }
        if !seen.insert(model.as_str()) {
            return Err(ConfigError::InvalidCatalog {
                reason: format!("duplicate model '{}'", model),
            });
        }
    }

    if !seen.contains(config.default_model.as_str()) {
        return Err(ConfigError::InvalidCatalog {
            reason: format!(
                "default model '{}' is not one of the configured models",
                config.default_model
            ),
        });
    }

    Ok(())
}

pub fn validate_server_url(url: &str) -> Result<(), ConfigError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| ConfigError::InvalidServerUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidServerUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}
