//! Request failure types.

use thiserror::Error;

use super::endpoint::Endpoint;

/// Failure of a single request/response cycle.
///
/// The `Display` text is what ends up as a stage's last error, so the service
/// and transport variants render their message verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    /// The service could not be reached or the connection failed.
    #[error("{message}")]
    Transport { endpoint: Endpoint, message: String },

    /// Non-success status with an `error` message from the service.
    #[error("{message}")]
    Service {
        endpoint: Endpoint,
        status: u16,
        message: String,
    },

    /// Non-success status without a message.
    #[error("Request failed: {endpoint} (HTTP {status})")]
    ServiceUnlabeled { endpoint: Endpoint, status: u16 },

    /// Success status but the body was not a JSON object.
    #[error("Invalid response from {endpoint}: {message}")]
    Decode { endpoint: Endpoint, message: String },

    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),
}

impl InvokeError {
    pub fn endpoint(&self) -> Option<Endpoint> {
        match self {
            InvokeError::Transport { endpoint, .. }
            | InvokeError::Service { endpoint, .. }
            | InvokeError::ServiceUnlabeled { endpoint, .. }
            | InvokeError::Decode { endpoint, .. } => Some(*endpoint),
            InvokeError::ClientBuild(_) => None,
        }
    }

    /// HTTP status, when the service responded at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            InvokeError::Service { status, .. } | InvokeError::ServiceUnlabeled { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}
