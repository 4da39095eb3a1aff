//! Model catalog.
//!
//! Every stage runs with a model drawn from a fixed, configured set. The
//! identifiers are opaque to the client; the service maps them to a vendor.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ClientConfig;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Unknown model '{model}' (available: {available})")]
    Unknown { model: String, available: String },

    #[error("Model catalog is empty")]
    EmptyCatalog,
}

/// Vendor behind a model identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAI,
    Gemini,
}

impl Provider {
    /// Infers the provider the service will route a model to.
    ///
    /// `gpt*` goes to OpenAI, `gemini*` to Gemini, and anything else falls
    /// back to OpenAI.
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("gemini") {
            Provider::Gemini
        } else {
            Provider::OpenAI
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OpenAI",
            Provider::Gemini => "Gemini",
        }
    }

    /// Field name used by `/set_api_keys`.
    pub fn key_field(&self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Gemini => "gemini",
        }
    }
}

/// A model identifier known to be a member of a [`ModelCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn provider(&self) -> Provider {
        Provider::for_model(&self.0)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The enumerated set of selectable models, in display order.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<String>,
    default_index: usize,
}

impl ModelCatalog {
    /// Builds a catalog; the first entry is the default model.
    pub fn new<I, S>(models: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for model in models {
            let model = model.into();
            if !unique.contains(&model) {
                unique.push(model);
            }
        }
        if unique.is_empty() {
            return Err(ModelError::EmptyCatalog);
        }
        Ok(Self {
            models: unique,
            default_index: 0,
        })
    }

    /// Builds the catalog from a validated client configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ModelError> {
        let catalog = Self::new(config.models.iter().cloned())?;
        catalog.with_default(&config.default_model)
    }

    pub fn with_default(mut self, model: &str) -> Result<Self, ModelError> {
        self.default_index = self.index_of(model)?;
        Ok(self)
    }

    pub fn default_model(&self) -> ModelId {
        ModelId(self.models[self.default_index].clone())
    }

    /// Validates `model` against the catalog.
    pub fn resolve(&self, model: &str) -> Result<ModelId, ModelError> {
        self.index_of(model).map(|i| ModelId(self.models[i].clone()))
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    fn index_of(&self, model: &str) -> Result<usize, ModelError> {
        self.models
            .iter()
            .position(|m| m == model)
            .ok_or_else(|| ModelError::Unknown {
                model: model.to_string(),
                available: self.models.join(", "),
            })
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        let config = ClientConfig::default();
        Self {
            models: config.models,
            default_index: 0,
        }
    }
}
