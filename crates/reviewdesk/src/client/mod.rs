//! Transport to the remote review service.
//!
//! [`StageTransport`] is the seam the orchestrator talks through;
//! [`HttpInvoker`] is the production implementation.

pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod form;
pub mod http;
pub mod transport;

pub use credentials::ApiKeys;
pub use endpoint::Endpoint;
pub use error::InvokeError;
pub use form::{FieldValue, FormFields};
pub use http::HttpInvoker;
pub use transport::{interpret_response, ServiceReply, StageTransport};
