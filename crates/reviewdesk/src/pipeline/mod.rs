pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod stage;
pub mod state;

pub use error::PipelineError;
pub use orchestrator::{Orchestrator, ReviewDraft, TransformDraft};
pub use progress::{InvocationTracker, PipelineBroadcaster, PipelineEvent, PipelinePhase};
pub use stage::{Stage, UnknownStage};
pub use state::{
    Completion, InvocationToken, PipelineSnapshot, PipelineState, PipelineStatus, StageResult,
    StageSnapshot, StageStatus,
};
