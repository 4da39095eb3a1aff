//! Provider API keys forwarded to the service's key store.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};

use crate::config::ApiKeysConfig;
use crate::models::Provider;
use crate::secrets::{resolve_key_source, SecretError};

/// Keys for the providers the service can route to. Absent keys are never
/// sent, so the service keeps whatever it already holds for that provider.
#[derive(Debug, Default)]
pub struct ApiKeys {
    pub openai: Option<SecretString>,
    pub gemini: Option<SecretString>,
}

impl ApiKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a key, trimmed like keys read from files and env vars. A blank
    /// string clears it.
    pub fn with_key(mut self, provider: Provider, key: impl Into<String>) -> Self {
        let key: String = key.into();
        let trimmed = key.trim();
        let value = if trimmed.is_empty() {
            None
        } else {
            Some(SecretString::from(trimmed.to_string()))
        };
        match provider {
            Provider::OpenAI => self.openai = value,
            Provider::Gemini => self.gemini = value,
        }
        self
    }

    /// Resolves every configured key source. Providers without a key are left
    /// empty rather than treated as an error.
    pub fn from_config(config: &ApiKeysConfig) -> Result<Self, SecretError> {
        Ok(Self {
            openai: resolve_key_source(&config.openai)?,
            gemini: resolve_key_source(&config.gemini)?,
        })
    }

    pub fn get(&self, provider: Provider) -> Option<&SecretString> {
        let key = match provider {
            Provider::OpenAI => self.openai.as_ref(),
            Provider::Gemini => self.gemini.as_ref(),
        };
        key.filter(|k| !k.expose_secret().is_empty())
    }

    /// Providers that have a key, in a stable order.
    pub fn providers(&self) -> Vec<Provider> {
        [Provider::OpenAI, Provider::Gemini]
            .into_iter()
            .filter(|p| self.get(*p).is_some())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers().is_empty()
    }

    /// JSON body for `/set_api_keys`. Absent keys are omitted entirely.
    pub fn to_request_body(&self) -> Value {
        let mut body = Map::new();
        for provider in self.providers() {
            if let Some(key) = self.get(provider) {
                body.insert(
                    provider.key_field().to_string(),
                    Value::String(key.expose_secret().to_string()),
                );
            }
        }
        Value::Object(body)
    }
}
