pub mod client;
pub mod config;
pub mod error;
pub mod input;
pub mod models;
pub mod pipeline;
pub mod secrets;

pub use client::{ApiKeys, Endpoint, FormFields, HttpInvoker, InvokeError, StageTransport};
pub use config::{load_config, ClientConfig, InFlightPolicy};
pub use error::{ConfigError, Result, ReviewdeskError, UploadError};
pub use input::{FileUpload, InputSource, Payload};
pub use models::{ModelCatalog, ModelError, ModelId, Provider};
pub use pipeline::{
    Orchestrator, PipelineError, PipelineEvent, PipelinePhase, PipelineSnapshot, PipelineState,
    PipelineStatus, Stage, StageResult, StageStatus,
};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
