//! Stage progress broadcaster for real-time status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::stage::Stage;

/// Phase of a single stage invocation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    Started,
    Completed,
    Failed,
    /// The call finished after a newer invocation of the same stage started.
    Superseded,
    /// The trigger was refused because the stage was busy.
    Rejected,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Started => write!(f, "Started"),
            PipelinePhase::Completed => write!(f, "Completed"),
            PipelinePhase::Failed => write!(f, "Failed"),
            PipelinePhase::Superseded => write!(f, "Superseded"),
            PipelinePhase::Rejected => write!(f, "Rejected"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineEvent {
    /// Shared by every event of one invocation.
    pub invocation_id: String,
    pub stage: Stage,
    pub phase: PipelinePhase,
    pub message: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
    /// Set on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineEvent {
    pub fn new(
        invocation_id: &str,
        stage: Stage,
        model: &str,
        phase: PipelinePhase,
        message: &str,
    ) -> Self {
        Self {
            invocation_id: invocation_id.to_string(),
            stage,
            phase,
            message: message.to_string(),
            model: model.to_string(),
            timestamp: Utc::now(),
            error: None,
        }
    }
}

/// Fans pipeline events out to any number of subscribers.
#[derive(Clone)]
pub struct PipelineBroadcaster {
    sender: Arc<broadcast::Sender<PipelineEvent>>,
}

impl PipelineBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: PipelineEvent) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }

    /// Starts tracking one invocation and emits its `Started` event.
    pub fn start(&self, stage: Stage, model: &str) -> InvocationTracker {
        let tracker = InvocationTracker {
            invocation_id: Uuid::new_v4().to_string(),
            stage,
            model: model.to_string(),
            sender: Arc::clone(&self.sender),
        };
        tracker.emit(PipelinePhase::Started, &format!("Calling {}", stage.endpoint()));
        tracker
    }

    /// Emits a standalone `Rejected` event for a trigger that never started.
    pub fn rejected(&self, stage: Stage, model: &str) {
        let event = PipelineEvent::new(
            &Uuid::new_v4().to_string(),
            stage,
            model,
            PipelinePhase::Rejected,
            "Stage is already running",
        );
        self.send(event);
    }
}

impl Default for PipelineBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Emits the events of a single invocation.
pub struct InvocationTracker {
    invocation_id: String,
    stage: Stage,
    model: String,
    sender: Arc<broadcast::Sender<PipelineEvent>>,
}

impl InvocationTracker {
    pub fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    fn emit(&self, phase: PipelinePhase, message: &str) {
        let event = PipelineEvent::new(&self.invocation_id, self.stage, &self.model, phase, message);
        let _ = self.sender.send(event);
    }

    pub fn completed(&self) {
        self.emit(PipelinePhase::Completed, "Result stored");
    }

    pub fn failed(&self, error: &str) {
        let mut event = PipelineEvent::new(
            &self.invocation_id,
            self.stage,
            &self.model,
            PipelinePhase::Failed,
            "Stage failed",
        );
        event.error = Some(error.to_string());
        let _ = self.sender.send(event);
    }

    pub fn superseded(&self) {
        self.emit(
            PipelinePhase::Superseded,
            "Discarded; a newer invocation of this stage is running",
        );
    }
}
