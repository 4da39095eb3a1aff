//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::endpoint::Endpoint;
use super::error::InvokeError;
use super::form::{FieldValue, FormFields};
use super::transport::{interpret_response, ServiceReply, StageTransport};
use crate::config::ClientConfig;

/// Sends stage requests to the review service over HTTP.
///
/// No request timeout is set; a call completes or fails exactly once.
#[derive(Debug, Clone)]
pub struct HttpInvoker {
    client: Client,
    base_url: String,
}

impl HttpInvoker {
    pub fn new(base_url: impl Into<String>) -> Result<Self, InvokeError> {
        Self::with_connect_timeout(base_url, None)
    }

    pub fn with_connect_timeout(
        base_url: impl Into<String>,
        connect_timeout: Option<Duration>,
    ) -> Result<Self, InvokeError> {
        let mut builder = Client::builder();
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| InvokeError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, InvokeError> {
        Self::with_connect_timeout(
            config.server_url.clone(),
            config.connect_timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn finish(
        &self,
        endpoint: Endpoint,
        request: reqwest::RequestBuilder,
    ) -> Result<ServiceReply, InvokeError> {
        let response = request.send().await.map_err(|e| InvokeError::Transport {
            endpoint,
            message: error_chain(&e),
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| InvokeError::Transport {
            endpoint,
            message: error_chain(&e),
        })?;

        debug!(%endpoint, status = status.as_u16(), bytes = body.len(), "Response received");
        interpret_response(endpoint, status.as_u16(), &body)
    }
}

/// reqwest's top-level message omits the cause ("error sending request for
/// url"), so append the source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Builds the multipart body. A file whose content type cannot be parsed
/// fails the request before anything is sent.
fn build_multipart(endpoint: Endpoint, form: FormFields) -> Result<Form, InvokeError> {
    let mut multipart = Form::new();
    for (name, value) in form {
        multipart = match value {
            FieldValue::Text(text) => multipart.text(name, text),
            FieldValue::File(upload) => {
                let part = Part::bytes(upload.bytes)
                    .file_name(upload.name.clone())
                    .mime_str(&upload.content_type)
                    .map_err(|e| InvokeError::Transport {
                        endpoint,
                        message: format!(
                            "Invalid content type '{}' for file '{}': {}",
                            upload.content_type, upload.name, e
                        ),
                    })?;
                multipart.part(name, part)
            }
        };
    }
    Ok(multipart)
}

#[async_trait]
impl StageTransport for HttpInvoker {
    async fn post_form(
        &self,
        endpoint: Endpoint,
        form: FormFields,
    ) -> Result<ServiceReply, InvokeError> {
        let url = endpoint.url(&self.base_url);
        debug!(%endpoint, %url, fields = ?form.names(), "Sending multipart request");

        let request = self.client.post(url).multipart(build_multipart(endpoint, form)?);
        self.finish(endpoint, request).await
    }

    async fn post_json(
        &self,
        endpoint: Endpoint,
        body: Value,
    ) -> Result<ServiceReply, InvokeError> {
        let url = endpoint.url(&self.base_url);
        debug!(%endpoint, %url, "Sending JSON request");

        let request = self.client.post(url).json(&body);
        self.finish(endpoint, request).await
    }
}
