//! Drives the three stages against the review service.
//!
//! The orchestrator owns each stage's draft (inputs and model) and the shared
//! [`PipelineState`]. Locks are only taken for short synchronous sections and
//! are never held across a network call, so several stages may be in flight
//! at once.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tracing::{debug, info, info_span, warn, Instrument};

use super::error::{PipelineError, Result};
use super::progress::{PipelineBroadcaster, PipelineEvent};
use super::stage::Stage;
use super::state::{
    Completion, PipelineSnapshot, PipelineState, PipelineStatus, StageResult, StageStatus,
};
use crate::client::{ApiKeys, Endpoint, FormFields, HttpInvoker, InvokeError, StageTransport};
use crate::config::{validate_server_url, AcceptConfig, ApiKeysConfig, ClientConfig, InFlightPolicy};
use crate::input::{FileUpload, InputSource};
use crate::models::{ModelCatalog, ModelId, Provider};

/// Editable inputs of a transform stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformDraft {
    pub source: InputSource,
    pub model: ModelId,
}

/// Editable inputs of the review stage. An absent override means the
/// corresponding stage's last result is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    pub submission_override: Option<String>,
    pub checklist_override: Option<String>,
    pub model: ModelId,
}

#[derive(Debug)]
struct Drafts {
    submission: TransformDraft,
    checklist: TransformDraft,
    review: ReviewDraft,
}

impl Drafts {
    fn new(model: ModelId) -> Self {
        Self {
            submission: TransformDraft {
                source: InputSource::default(),
                model: model.clone(),
            },
            checklist: TransformDraft {
                source: InputSource::default(),
                model: model.clone(),
            },
            review: ReviewDraft {
                submission_override: None,
                checklist_override: None,
                model,
            },
        }
    }

    fn transform_mut(&mut self, stage: Stage) -> Result<&mut TransformDraft> {
        match stage {
            Stage::Submission => Ok(&mut self.submission),
            Stage::Checklist => Ok(&mut self.checklist),
            Stage::Review => Err(PipelineError::NotATransformStage(stage)),
        }
    }

    fn model(&self, stage: Stage) -> &ModelId {
        match stage {
            Stage::Submission => &self.submission.model,
            Stage::Checklist => &self.checklist.model,
            Stage::Review => &self.review.model,
        }
    }

    fn model_mut(&mut self, stage: Stage) -> &mut ModelId {
        match stage {
            Stage::Submission => &mut self.submission.model,
            Stage::Checklist => &mut self.checklist.model,
            Stage::Review => &mut self.review.model,
        }
    }
}

pub struct Orchestrator {
    transport: Arc<dyn StageTransport>,
    catalog: ModelCatalog,
    policy: InFlightPolicy,
    accept: AcceptConfig,
    state: Mutex<PipelineState>,
    drafts: Mutex<Drafts>,
    keys_sent: Mutex<Vec<Provider>>,
    events: PipelineBroadcaster,
}

impl Orchestrator {
    pub fn new(transport: Arc<dyn StageTransport>, catalog: ModelCatalog) -> Self {
        let drafts = Drafts::new(catalog.default_model());
        Self {
            transport,
            catalog,
            policy: InFlightPolicy::default(),
            accept: AcceptConfig::default(),
            state: Mutex::new(PipelineState::new()),
            drafts: Mutex::new(drafts),
            keys_sent: Mutex::new(Vec::new()),
            events: PipelineBroadcaster::default(),
        }
    }

    /// Production constructor: HTTP transport, catalog and policy from config.
    /// The server URL is checked here too, since a config may be built in code.
    pub fn from_config(config: &ClientConfig) -> crate::Result<Self> {
        validate_server_url(&config.server_url)?;
        let transport = HttpInvoker::from_config(config)?;
        let catalog = ModelCatalog::from_config(config)?;
        Ok(Self::new(Arc::new(transport), catalog)
            .with_policy(config.in_flight_policy)
            .with_accept(config.accept.clone()))
    }

    pub fn with_policy(mut self, policy: InFlightPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_accept(mut self, accept: AcceptConfig) -> Self {
        self.accept = accept;
        self
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn policy(&self) -> InFlightPolicy {
        self.policy
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    // A panic while holding a lock leaves plain data behind, so poisoning is
    // recovered rather than propagated.
    fn state(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn drafts(&self) -> MutexGuard<'_, Drafts> {
        self.drafts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn keys(&self) -> MutexGuard<'_, Vec<Provider>> {
        self.keys_sent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---- Draft editing. None of these touch stage status. ----

    pub fn set_pasted_text(
        &self,
        stage: Stage,
        text: impl Into<String>,
    ) -> Result<()> {
        let mut drafts = self.drafts();
        drafts.transform_mut(stage)?.source.pasted_text = text.into();
        Ok(())
    }

    /// Attaches a file to a transform stage. Files outside the stage's accept
    /// list are still attached; only a warning is logged.
    pub fn attach_file(
        &self,
        stage: Stage,
        file: FileUpload,
    ) -> Result<()> {
        let accept = match stage {
            Stage::Submission => &self.accept.submission,
            Stage::Checklist => &self.accept.checklist,
            Stage::Review => return Err(PipelineError::NotATransformStage(stage)),
        };
        debug!(stage = %stage, file = %file.name, size = file.len(), "Attaching file");
        let mut drafts = self.drafts();
        drafts.transform_mut(stage)?.source.attach(file, accept);
        Ok(())
    }

    /// Reads a file from disk and attaches it to a transform stage. Returns a
    /// copy of the attached upload.
    pub async fn attach_path(&self, stage: Stage, path: impl AsRef<Path>) -> crate::Result<FileUpload> {
        if stage == Stage::Review {
            return Err(PipelineError::NotATransformStage(stage).into());
        }
        let upload = FileUpload::from_path(path).await?;
        self.attach_file(stage, upload.clone())?;
        Ok(upload)
    }

    pub fn detach_file(
        &self,
        stage: Stage,
    ) -> Result<Option<FileUpload>> {
        let mut drafts = self.drafts();
        Ok(drafts.transform_mut(stage)?.source.detach())
    }

    pub fn select_model(
        &self,
        stage: Stage,
        model: &str,
    ) -> Result<ModelId> {
        let model = self.catalog.resolve(model)?;
        *self.drafts().model_mut(stage) = model.clone();
        Ok(model)
    }

    pub fn model(&self, stage: Stage) -> ModelId {
        self.drafts().model(stage).clone()
    }

    /// Sets or clears the review's override for `target`.
    ///
    /// `Some("")` is an explicit empty override; pass `None` to fall back to
    /// the target stage's last result.
    pub fn set_review_override(
        &self,
        target: Stage,
        text: Option<String>,
    ) -> Result<()> {
        let mut drafts = self.drafts();
        match target {
            Stage::Submission => drafts.review.submission_override = text,
            Stage::Checklist => drafts.review.checklist_override = text,
            Stage::Review => return Err(PipelineError::NoOverride(target)),
        }
        Ok(())
    }

    pub fn transform_draft(&self, stage: Stage) -> Option<TransformDraft> {
        let drafts = self.drafts();
        match stage {
            Stage::Submission => Some(drafts.submission.clone()),
            Stage::Checklist => Some(drafts.checklist.clone()),
            Stage::Review => None,
        }
    }

    pub fn review_draft(&self) -> ReviewDraft {
        self.drafts().review.clone()
    }

    // ---- State queries ----

    pub fn status(&self, stage: Stage) -> StageStatus {
        self.state().status(stage)
    }

    pub fn summary(&self) -> PipelineStatus {
        self.state().summary()
    }

    pub fn result_text(&self, stage: Stage) -> String {
        self.state().result_text(stage).to_string()
    }

    pub fn last_error(&self, stage: Stage) -> Option<String> {
        self.state().last_error(stage).map(str::to_string)
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        self.state().snapshot()
    }

    // ---- Credentials ----

    /// Forwards provider keys to the service. Absent keys are omitted from
    /// the request body.
    pub async fn set_api_keys(&self, keys: &ApiKeys) -> std::result::Result<Vec<Provider>, InvokeError> {
        let providers = keys.providers();
        let span = info_span!("set_api_keys", providers = providers.len());

        async {
            let reply = self
                .transport
                .post_json(Endpoint::SetApiKeys, keys.to_request_body())
                .await?;

            let mut sent = self.keys();
            for provider in &providers {
                if !sent.contains(provider) {
                    sent.push(*provider);
                }
            }
            drop(sent);

            info!(
                status = reply.text("status").unwrap_or("ok"),
                "API keys forwarded"
            );
            Ok::<_, InvokeError>(providers)
        }
        .instrument(span)
        .await
    }

    /// Resolves the configured key sources and forwards whatever keys were
    /// found. Nothing is sent when no key is configured.
    pub async fn forward_configured_keys(&self, config: &ApiKeysConfig) -> crate::Result<Vec<Provider>> {
        let keys = ApiKeys::from_config(config)?;
        if keys.is_empty() {
            warn!("No API keys configured; the service will use whatever keys it already holds");
            return Ok(Vec::new());
        }
        Ok(self.set_api_keys(&keys).await?)
    }

    /// Providers whose key has been forwarded during this session.
    pub fn keys_sent(&self) -> Vec<Provider> {
        self.keys().clone()
    }

    // ---- Stage actions ----

    pub async fn run_submission_transform(&self) -> Result<StageResult> {
        self.run_transform(Stage::Submission).await
    }

    pub async fn run_checklist_transform(&self) -> Result<StageResult> {
        self.run_transform(Stage::Checklist).await
    }

    /// Runs the review with each input taken from its override when present,
    /// else from the corresponding stage's last result (empty if none).
    pub async fn run_review(&self) -> Result<StageResult> {
        let draft = self.review_draft();
        let (submission, checklist) = {
            let state = self.state();
            (
                draft
                    .submission_override
                    .unwrap_or_else(|| state.result_text(Stage::Submission).to_string()),
                draft
                    .checklist_override
                    .unwrap_or_else(|| state.result_text(Stage::Checklist).to_string()),
            )
        };

        let form = FormFields::for_review(&submission, &checklist, &draft.model);
        self.invoke(Stage::Review, draft.model, form).await
    }

    pub async fn run(&self, stage: Stage) -> Result<StageResult> {
        match stage {
            Stage::Submission => self.run_submission_transform().await,
            Stage::Checklist => self.run_checklist_transform().await,
            Stage::Review => self.run_review().await,
        }
    }

    async fn run_transform(&self, stage: Stage) -> Result<StageResult> {
        let (payload, model) = {
            let mut drafts = self.drafts();
            let draft = drafts.transform_mut(stage)?;
            (draft.source.resolve_payload(), draft.model.clone())
        };

        let form = FormFields::for_transform(&payload, &model);
        self.invoke(stage, model, form).await
    }

    /// One invocation: begin, exactly one call, then record the outcome if
    /// this invocation is still the latest of its stage.
    async fn invoke(
        &self,
        stage: Stage,
        model: ModelId,
        form: FormFields,
    ) -> Result<StageResult> {
        let begun = self.state().begin(stage, self.policy);
        let token = match begun {
            Ok(token) => token,
            Err(e) => {
                warn!(stage = %stage, "Trigger refused: stage already running");
                self.events.rejected(stage, model.as_str());
                return Err(e);
            }
        };

        let tracker = self.events.start(stage, model.as_str());
        let span = info_span!(
            "stage",
            stage = %stage,
            invocation_id = %tracker.invocation_id(),
            model = %model,
        );

        let provider = model.provider();
        if !self.keys().contains(&provider) {
            span.in_scope(|| {
                warn!(
                    provider = provider.display_name(),
                    "No API key was forwarded for this model's provider"
                );
            });
        }

        let outcome = self
            .transport
            .post_form(stage.endpoint(), form)
            .instrument(span.clone())
            .await;

        match outcome {
            Ok(reply) => {
                let text = reply.result_text();
                let completion = self.state().complete(token, text.clone());
                span.in_scope(|| match completion {
                    Completion::Applied => {
                        info!(length = text.len(), "Stage completed");
                        tracker.completed();
                        Ok(StageResult::new(text))
                    }
                    Completion::Superseded => {
                        debug!("Discarding result of superseded invocation");
                        tracker.superseded();
                        Err(PipelineError::Superseded(stage))
                    }
                })
            }
            Err(source) => {
                let message = source.to_string();
                let completion = self.state().fail(token, message.clone());
                span.in_scope(|| match completion {
                    Completion::Applied => {
                        warn!(error = %message, "Stage failed");
                        tracker.failed(&message);
                        Err(PipelineError::Invoke { stage, source })
                    }
                    Completion::Superseded => {
                        debug!(error = %message, "Discarding failure of superseded invocation");
                        tracker.superseded();
                        Err(PipelineError::Superseded(stage))
                    }
                })
            }
        }
    }
}
