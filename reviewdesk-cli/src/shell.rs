//! Interactive line-oriented session.
//!
//! Each line is split with shell quoting rules and parsed by clap. Stage runs
//! are spawned so that several stages can be in flight while the prompt stays
//! responsive; their progress is printed as events arrive.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use reviewdesk::config::ClientConfig;
use reviewdesk::pipeline::PipelineEvent;
use reviewdesk::{Orchestrator, PipelineError, PipelinePhase, Stage};

#[derive(Parser, Debug)]
#[command(
    name = "reviewdesk",
    no_binary_name = true,
    disable_version_flag = true,
    help_template = "{subcommands}"
)]
struct Line {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    /// Set the pasted text of a transform stage
    Text {
        stage: Stage,
        #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },
    /// Attach a file to a transform stage; it takes precedence over pasted text
    File { stage: Stage, path: PathBuf },
    /// Remove the attached file of a transform stage
    Unfile { stage: Stage },
    /// Select the model of a stage
    Model { stage: Stage, id: String },
    /// Override the review's submission or checklist input; no text clears it
    Override {
        target: Stage,
        #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },
    /// Run a stage in the background
    Run { stage: Stage },
    /// Show every stage's status
    Status {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stage's last result, error and draft
    Show { stage: Stage },
    /// List the available models
    Models,
    /// Forward the configured API keys to the service
    Keys,
    /// Exit the session
    #[command(alias = "exit")]
    Quit,
}

enum Flow {
    Continue,
    Quit,
}

pub async fn run(orchestrator: Arc<Orchestrator>, config: &ClientConfig) -> Result<()> {
    let printer = tokio::spawn(print_events(orchestrator.subscribe()));

    println!(
        "reviewdesk shell connected to {} (type 'help' for commands)",
        config.server_url
    );
    if let Err(e) = crate::forward_keys(&orchestrator, config).await {
        eprintln!("warning: {:#}", e);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt().await?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read from stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match handle_line(&orchestrator, config, &line).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => eprintln!("error: {:#}", e),
        }
    }

    printer.abort();
    Ok(())
}

async fn prompt() -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"reviewdesk> ").await?;
    stdout.flush().await?;
    Ok(())
}

async fn handle_line(
    orchestrator: &Arc<Orchestrator>,
    config: &ClientConfig,
    line: &str,
) -> Result<Flow> {
    let words = shell_words::split(line).context("unbalanced quotes")?;
    if words.is_empty() {
        return Ok(Flow::Continue);
    }

    let command = match Line::try_parse_from(&words) {
        Ok(parsed) => parsed.command,
        Err(e) => {
            // Covers `help` as well as usage errors.
            print!("{}", e.render());
            return Ok(Flow::Continue);
        }
    };
    debug!(?command, "Shell command");

    match command {
        ShellCommand::Text { stage, words } => {
            orchestrator.set_pasted_text(stage, words.join(" "))?;
        }
        ShellCommand::File { stage, path } => {
            let upload = orchestrator.attach_path(stage, &path).await?;
            println!(
                "attached {} ({} bytes, {})",
                upload.name,
                upload.len(),
                upload.content_type
            );
        }
        ShellCommand::Unfile { stage } => match orchestrator.detach_file(stage)? {
            Some(file) => println!("detached {}", file.name),
            None => println!("no file attached to {}", stage),
        },
        ShellCommand::Model { stage, id } => {
            let model = orchestrator.select_model(stage, &id)?;
            println!("{} uses {} ({})", stage, model, model.provider().display_name());
        }
        ShellCommand::Override { target, words } => {
            // Only an empty override means "use the previous stage's result".
            let text = Some(words.join(" ")).filter(|t| !t.is_empty());
            let cleared = text.is_none();
            orchestrator.set_review_override(target, text)?;
            if cleared {
                println!("review uses the {} result", target);
            }
        }
        ShellCommand::Run { stage } => {
            let orchestrator = Arc::clone(orchestrator);
            tokio::spawn(async move {
                match orchestrator.run(stage).await {
                    Ok(result) => println!("\n[{}] result:\n{}", stage, result.text),
                    Err(PipelineError::Superseded(_)) => {}
                    Err(e) => println!("\n[{}] {}", stage, e),
                }
            });
        }
        ShellCommand::Status { json } => print_status(orchestrator, json)?,
        ShellCommand::Show { stage } => print_stage(orchestrator, stage),
        ShellCommand::Models => {
            for model in orchestrator.catalog().iter() {
                let users: Vec<&str> = Stage::ALL
                    .iter()
                    .filter(|s| orchestrator.model(**s).as_str() == model)
                    .map(|s| s.name())
                    .collect();
                if users.is_empty() {
                    println!("  {}", model);
                } else {
                    println!("* {} ({})", model, users.join(", "));
                }
            }
        }
        ShellCommand::Keys => {
            let sent = crate::forward_keys(orchestrator, config).await?;
            let names: Vec<&str> = sent.iter().map(|p| p.display_name()).collect();
            if names.is_empty() {
                println!("no keys forwarded");
            } else {
                println!("forwarded keys: {}", names.join(", "));
            }
        }
        ShellCommand::Quit => return Ok(Flow::Quit),
    }

    Ok(Flow::Continue)
}

fn print_status(orchestrator: &Orchestrator, json: bool) -> Result<()> {
    let snapshot = orchestrator.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("pipeline: {:?}", snapshot.status);
    for stage in &snapshot.stages {
        let result = match &stage.result {
            Some(text) => format!("{} chars", text.chars().count()),
            None => "no result".to_string(),
        };
        println!(
            "  {:<10} {:<8} {:<12} {}",
            stage.stage.name(),
            format!("{:?}", stage.status).to_lowercase(),
            result,
            stage.last_error.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn print_stage(orchestrator: &Orchestrator, stage: Stage) {
    let status = format!("{:?}", orchestrator.status(stage)).to_lowercase();
    println!("{} [{}] model {}", stage, status, orchestrator.model(stage));

    if let Some(draft) = orchestrator.transform_draft(stage) {
        match &draft.source.file {
            Some(file) => println!("input: file {} (pasted text ignored)", file.name),
            None => println!(
                "input: {} chars of pasted text",
                draft.source.pasted_text.chars().count()
            ),
        }
    } else {
        let draft = orchestrator.review_draft();
        let describe = |o: &Option<String>, from: Stage| match o {
            Some(text) => format!("override ({} chars)", text.chars().count()),
            None => format!("{} result", from),
        };
        println!("submission: {}", describe(&draft.submission_override, Stage::Submission));
        println!("checklist: {}", describe(&draft.checklist_override, Stage::Checklist));
    }

    if let Some(error) = orchestrator.last_error(stage) {
        println!("last error: {}", error);
    }
    let result = orchestrator.result_text(stage);
    if result.is_empty() {
        println!("(no result)");
    } else {
        println!("---\n{}", result);
    }
}

async fn print_events(mut events: tokio::sync::broadcast::Receiver<PipelineEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let detail = match (&event.phase, &event.error) {
                    (PipelinePhase::Failed, Some(error)) => error.clone(),
                    _ => event.message.clone(),
                };
                eprintln!("[{}] {} ({}): {}", event.stage, event.phase, event.model, detail);
            }
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "Event printer lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
