//! Secret resolution for provider API keys.
//!
//! A key can come from several places, checked in priority order:
//!
//! 1. **Direct value** - inline in the config (quick local testing)
//! 2. **File reference** - e.g. a Docker secret at `/run/secrets/openai`
//! 3. **Env var references** - tried in order, e.g. `GEMINI_API_KEY` then `GOOGLE_API_KEY`
//!
//! Empty values at any level count as absent.

use secrecy::SecretString;
use std::fs;

use crate::config::KeySourceConfig;

/// Error type for secret resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable(s) {names} not set")]
    EnvVarNotSet { names: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

/// Result type for secret resolution.
pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a secret from a direct value, a file, or a list of env vars.
///
/// # Examples
///
/// ```ignore
/// use reviewdesk::secrets::resolve_secret;
///
/// let key = resolve_secret(None, None, &["GEMINI_API_KEY", "GOOGLE_API_KEY"])?;
/// ```
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_vars: &[&str],
) -> Result<SecretString> {
    if let Some(value) = direct {
        if !value.is_empty() {
            return Ok(SecretString::from(value.to_string()));
        }
    }

    if let Some(path) = file_path {
        if !path.is_empty() {
            let expanded = expand_home(path);
            let content = fs::read_to_string(&expanded).map_err(|e| SecretError::FileReadError {
                path: expanded.clone(),
                source: e,
            })?;
            let trimmed = content.trim();
            if !trimmed.is_empty() {
                return Ok(SecretString::from(trimmed.to_string()));
            }
            log::warn!("Secret file '{}' is empty", expanded);
        }
    }

    let env_vars: Vec<&str> = env_vars.iter().copied().filter(|n| !n.is_empty()).collect();
    for var_name in &env_vars {
        match std::env::var(var_name) {
            Ok(value) => {
                // Env vars may carry trailing newlines.
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    log::debug!("Resolved secret from environment variable {}", var_name);
                    return Ok(SecretString::from(trimmed.to_string()));
                }
            }
            Err(std::env::VarError::NotPresent) => {}
            Err(std::env::VarError::NotUnicode(_)) => {
                return Err(SecretError::EnvVarNotUnicode {
                    name: var_name.to_string(),
                })
            }
        }
    }

    if env_vars.is_empty() {
        Err(SecretError::NoSourceProvided)
    } else {
        Err(SecretError::EnvVarNotSet {
            names: env_vars.join(", "),
        })
    }
}

/// Like [`resolve_secret`], but a missing value is `Ok(None)`.
///
/// Unreadable files and non-UTF-8 variables are still errors.
pub fn resolve_secret_optional(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_vars: &[&str],
) -> Result<Option<SecretString>> {
    match resolve_secret(direct, file_path, env_vars) {
        Ok(secret) => Ok(Some(secret)),
        Err(SecretError::NoSourceProvided) | Err(SecretError::EnvVarNotSet { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Resolves a configured key source.
pub fn resolve_key_source(source: &KeySourceConfig) -> Result<Option<SecretString>> {
    let env_vars: Vec<&str> = source.env.iter().map(String::as_str).collect();
    resolve_secret_optional(source.value.as_deref(), source.file.as_deref(), &env_vars)
}

/// Expands `~` and `~/path` to the user's home directory (HOME, then USERPROFILE).
/// `~user/path` is not supported.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            if path == "~" {
                return home.to_string_lossy().into_owned();
            }
            return path.replacen("~", &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
