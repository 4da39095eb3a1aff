use async_trait::async_trait;
use serde_json::{Map, Value};

use super::endpoint::Endpoint;
use super::error::InvokeError;
use super::form::FormFields;

/// Maximum length of a raw body quoted in a decode error.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Parsed JSON object returned by the service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceReply {
    body: Map<String, Value>,
}

impl ServiceReply {
    pub fn new(body: Map<String, Value>) -> Self {
        Self { body }
    }

    /// A string field, if present and a string.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }

    /// The `result` field of a stage reply. The content is opaque; a missing
    /// field is treated as an empty result.
    pub fn result_text(&self) -> String {
        self.text("result").unwrap_or_default().to_string()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.body
    }
}

/// One request/response cycle against the review service.
///
/// Implementations issue exactly one call per method invocation, with no
/// retries and no timeout of their own.
#[async_trait]
pub trait StageTransport: Send + Sync {
    /// Sends a multipart request.
    async fn post_form(
        &self,
        endpoint: Endpoint,
        form: FormFields,
    ) -> Result<ServiceReply, InvokeError>;

    /// Sends a JSON request.
    async fn post_json(&self, endpoint: Endpoint, body: Value)
        -> Result<ServiceReply, InvokeError>;
}

/// Turns a status code and raw body into a reply or a typed failure.
///
/// Success is decided by the status alone. On failure the service's `error`
/// message is used when present, otherwise a generic message naming the
/// endpoint.
pub fn interpret_response(
    endpoint: Endpoint,
    status: u16,
    body: &str,
) -> Result<ServiceReply, InvokeError> {
    let parsed: Option<Map<String, Value>> = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        });

    if !(200..300).contains(&status) {
        let message = parsed
            .as_ref()
            .and_then(|m| m.get("error"))
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty());
        return Err(match message {
            Some(message) => InvokeError::Service {
                endpoint,
                status,
                message: message.to_string(),
            },
            None => InvokeError::ServiceUnlabeled { endpoint, status },
        });
    }

    parsed.map(ServiceReply::new).ok_or_else(|| InvokeError::Decode {
        endpoint,
        message: format!("expected a JSON object, got: {}", truncate_body(body)),
    })
}

fn truncate_body(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY_LENGTH {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_reply() {
        let reply =
            interpret_response(Endpoint::TransformSubmission, 200, r#"{"result":"Organized"}"#)
                .unwrap();
        assert_eq!(reply.result_text(), "Organized");
    }

    #[test]
    fn test_success_without_result_is_empty() {
        let reply = interpret_response(Endpoint::RunReview, 200, "{}").unwrap();
        assert_eq!(reply.result_text(), "");
    }

    #[test]
    fn test_error_with_message() {
        let err = interpret_response(
            Endpoint::RunReview,
            500,
            r#"{"error":"Gemini API key not set."}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Gemini API key not set.");
    }

    #[test]
    fn test_error_without_message() {
        let err = interpret_response(Endpoint::TransformSubmission, 500, "{}").unwrap_err();
        assert!(matches!(err, InvokeError::ServiceUnlabeled { status: 500, .. }));
        assert!(err.to_string().contains("/transform_submission"));
    }

    #[test]
    fn test_error_with_non_json_body() {
        let err = interpret_response(Endpoint::TransformChecklist, 502, "Bad Gateway").unwrap_err();
        assert!(matches!(err, InvokeError::ServiceUnlabeled { status: 502, .. }));
    }

    #[test]
    fn test_success_with_non_json_body() {
        let body = "x".repeat(500);
        let err = interpret_response(Endpoint::RunReview, 200, &body).unwrap_err();
        assert!(matches!(err, InvokeError::Decode { .. }));
        assert!(err.to_string().contains("(truncated)"));
    }
}
