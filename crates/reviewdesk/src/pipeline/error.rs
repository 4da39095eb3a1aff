use thiserror::Error;

use super::stage::Stage;
use crate::client::InvokeError;
use crate::models::ModelError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The stage already has a call in flight and the policy refuses new ones.
    #[error("The {0} stage is already running")]
    StageBusy(Stage),

    /// A newer invocation of the same stage started before this one finished;
    /// its outcome was discarded.
    #[error("The {0} invocation was superseded by a newer one")]
    Superseded(Stage),

    #[error("The {stage} stage failed: {source}")]
    Invoke {
        stage: Stage,
        #[source]
        source: InvokeError,
    },

    #[error("The {0} stage takes no pasted text or file")]
    NotATransformStage(Stage),

    #[error("The review stage has no override for {0}")]
    NoOverride(Stage),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl PipelineError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::StageBusy(stage)
            | PipelineError::Superseded(stage)
            | PipelineError::NotATransformStage(stage)
            | PipelineError::NoOverride(stage) => Some(*stage),
            PipelineError::Invoke { stage, .. } => Some(*stage),
            PipelineError::Model(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
