//! Non-interactive pipeline run.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{error, warn};

use reviewdesk::config::ClientConfig;
use reviewdesk::{Orchestrator, Stage};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Submission document to upload
    #[arg(long, value_name = "PATH")]
    submission_file: Option<PathBuf>,

    /// Submission text (ignored when a file is given)
    #[arg(long, value_name = "TEXT")]
    submission_text: Option<String>,

    /// Checklist document to upload
    #[arg(long, value_name = "PATH")]
    checklist_file: Option<PathBuf>,

    /// Checklist text (ignored when a file is given)
    #[arg(long, value_name = "TEXT")]
    checklist_text: Option<String>,

    /// Model used for every stage
    #[arg(long, value_name = "ID")]
    model: Option<String>,

    /// Skip forwarding the configured API keys
    #[arg(long)]
    no_keys: bool,
}

async fn prepare(
    orchestrator: &Orchestrator,
    stage: Stage,
    file: Option<&PathBuf>,
    text: Option<&String>,
) -> Result<()> {
    if let Some(text) = text {
        orchestrator.set_pasted_text(stage, text.as_str())?;
    }
    if let Some(path) = file {
        orchestrator
            .attach_path(stage, path)
            .await
            .with_context(|| format!("cannot attach {} file", stage))?;
    }
    Ok(())
}

pub async fn run(orchestrator: Arc<Orchestrator>, config: &ClientConfig, args: RunArgs) -> Result<()> {
    if let Some(model) = &args.model {
        for stage in Stage::ALL {
            orchestrator.select_model(stage, model)?;
        }
    }

    prepare(
        &orchestrator,
        Stage::Submission,
        args.submission_file.as_ref(),
        args.submission_text.as_ref(),
    )
    .await?;
    prepare(
        &orchestrator,
        Stage::Checklist,
        args.checklist_file.as_ref(),
        args.checklist_text.as_ref(),
    )
    .await?;

    if !args.no_keys {
        crate::forward_keys(&orchestrator, config).await?;
    }

    let (submission, checklist) = tokio::join!(
        orchestrator.run_submission_transform(),
        orchestrator.run_checklist_transform()
    );

    let mut failed = Vec::new();
    for (stage, outcome) in [(Stage::Submission, submission), (Stage::Checklist, checklist)] {
        if let Err(e) = outcome {
            // Review still runs; a failed stage contributes an empty string.
            warn!(stage = %stage, "{}", e);
            failed.push(stage);
        }
    }

    match orchestrator.run_review().await {
        Ok(review) => println!("{}", review.text),
        Err(e) => {
            error!("{}", e);
            failed.push(Stage::Review);
        }
    }

    if !failed.is_empty() {
        let names: Vec<&str> = failed.iter().map(Stage::name).collect();
        bail!("stage(s) failed: {}", names.join(", "));
    }
    Ok(())
}
