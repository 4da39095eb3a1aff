//! Per-stage results and status tracking.
//!
//! Each stage owns its result slot, status and last error, plus a generation
//! token. Only the most recently started invocation of a stage may write that
//! stage's slot; completions of older invocations are discarded.

use serde::Serialize;

use super::error::{PipelineError, Result};
use super::stage::Stage;
use crate::config::InFlightPolicy;

/// Opaque text returned by the service. Never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageResult {
    pub text: String,
}

impl StageResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Idle,
    Running,
    Error,
}

/// One user-facing status for the whole pipeline, derived from the stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum PipelineStatus {
    #[default]
    Idle,
    /// The most recently started stage among those still running.
    Running(Stage),
    /// The stage whose failure is the most recent, when nothing is running.
    Error(Stage),
}

/// Proof that an invocation was started; required to record its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationToken {
    stage: Stage,
    generation: u64,
}

impl InvocationToken {
    pub fn stage(&self) -> Stage {
        self.stage
    }
}

/// Whether a finished invocation was allowed to write its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Superseded,
}

#[derive(Debug, Clone, Default)]
struct StageSlot {
    result: Option<StageResult>,
    status: StageStatus,
    last_error: Option<String>,
    generation: u64,
    in_flight: usize,
    invocations: u64,
    /// Logical time of the last status change, for the pipeline summary.
    changed_at: u64,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    submission: StageSlot,
    checklist: StageSlot,
    review: StageSlot,
    clock: u64,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, stage: Stage) -> &StageSlot {
        match stage {
            Stage::Submission => &self.submission,
            Stage::Checklist => &self.checklist,
            Stage::Review => &self.review,
        }
    }

    fn slot_mut(&mut self, stage: Stage) -> &mut StageSlot {
        match stage {
            Stage::Submission => &mut self.submission,
            Stage::Checklist => &mut self.checklist,
            Stage::Review => &mut self.review,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Marks the stage Running and clears its last error.
    ///
    /// Under [`InFlightPolicy::Reject`] a stage with a call in flight refuses
    /// the new invocation and nothing changes.
    pub fn begin(
        &mut self,
        stage: Stage,
        policy: InFlightPolicy,
    ) -> Result<InvocationToken> {
        if policy == InFlightPolicy::Reject && self.slot(stage).in_flight > 0 {
            return Err(PipelineError::StageBusy(stage));
        }

        let now = self.tick();
        let slot = self.slot_mut(stage);
        slot.generation += 1;
        slot.in_flight += 1;
        slot.invocations += 1;
        slot.status = StageStatus::Running;
        slot.last_error = None;
        slot.changed_at = now;

        Ok(InvocationToken {
            stage,
            generation: slot.generation,
        })
    }

    /// Records a successful response. The result is stored verbatim.
    pub fn complete(&mut self, token: InvocationToken, text: String) -> Completion {
        self.finish(token, |slot| {
            slot.result = Some(StageResult { text });
            slot.status = StageStatus::Idle;
        })
    }

    /// Records a failure. The stage's previous result is left untouched.
    pub fn fail(&mut self, token: InvocationToken, message: String) -> Completion {
        self.finish(token, |slot| {
            slot.last_error = Some(message);
            slot.status = StageStatus::Error;
        })
    }

    fn finish(&mut self, token: InvocationToken, apply: impl FnOnce(&mut StageSlot)) -> Completion {
        let now = self.tick();
        let slot = self.slot_mut(token.stage);
        slot.in_flight = slot.in_flight.saturating_sub(1);

        if token.generation != slot.generation {
            return Completion::Superseded;
        }

        apply(slot);
        slot.changed_at = now;
        Completion::Applied
    }

    pub fn result(&self, stage: Stage) -> Option<&StageResult> {
        self.slot(stage).result.as_ref()
    }

    /// The stage's last result, or the empty string if it never succeeded.
    pub fn result_text(&self, stage: Stage) -> &str {
        self.result(stage).map(|r| r.text.as_str()).unwrap_or("")
    }

    pub fn status(&self, stage: Stage) -> StageStatus {
        self.slot(stage).status
    }

    pub fn last_error(&self, stage: Stage) -> Option<&str> {
        self.slot(stage).last_error.as_deref()
    }

    pub fn in_flight(&self, stage: Stage) -> usize {
        self.slot(stage).in_flight
    }

    pub fn invocations(&self, stage: Stage) -> u64 {
        self.slot(stage).invocations
    }

    /// The most recent error across all stages, if that stage is still in Error.
    pub fn latest_error(&self) -> Option<(Stage, &str)> {
        Stage::ALL
            .iter()
            .filter(|s| self.status(**s) == StageStatus::Error)
            .max_by_key(|s| self.slot(**s).changed_at)
            .and_then(|s| self.last_error(*s).map(|e| (*s, e)))
    }

    pub fn summary(&self) -> PipelineStatus {
        let latest_with = |status: StageStatus| {
            Stage::ALL
                .iter()
                .copied()
                .filter(|s| self.status(*s) == status)
                .max_by_key(|s| self.slot(*s).changed_at)
        };

        if let Some(stage) = latest_with(StageStatus::Running) {
            PipelineStatus::Running(stage)
        } else if let Some(stage) = latest_with(StageStatus::Error) {
            PipelineStatus::Error(stage)
        } else {
            PipelineStatus::Idle
        }
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            status: self.summary(),
            stages: Stage::ALL
                .iter()
                .map(|stage| {
                    let slot = self.slot(*stage);
                    StageSnapshot {
                        stage: *stage,
                        status: slot.status,
                        result: slot.result.as_ref().map(|r| r.text.clone()),
                        last_error: slot.last_error.clone(),
                        in_flight: slot.in_flight,
                        invocations: slot.invocations,
                    }
                })
                .collect(),
        }
    }
}

/// Point-in-time copy of the pipeline state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSnapshot {
    pub status: PipelineStatus,
    pub stages: Vec<StageSnapshot>,
}

impl PipelineSnapshot {
    pub fn stage(&self, stage: Stage) -> Option<&StageSnapshot> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSnapshot {
    pub stage: Stage,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub in_flight: usize,
    pub invocations: u64,
}
