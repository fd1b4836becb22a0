//! Run command - consolidate a timeline from a document set.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use console::Style;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use docket_config::{Backend, ConfigError, LlmConfig, RenderModeSetting, TimelineSection};
use docket_llm::{OpenAiBackend, OpenAiConfig, SharedBackend};
use docket_timeline::{
    ConsolidationReport, RenderMode, SourceDocument, TimelineConfig, TimelineOutcome,
    TimelinePipeline,
};

use super::Context;

/// Printed when a run finds nothing to report.
const NO_EVENTS_MESSAGE: &str = "No timeline events were found in the provided documents.";

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Input JSON file with the documents (and optionally the query)
    pub input: PathBuf,

    /// The question to answer (overrides the query in the input file)
    #[arg(short, long)]
    pub query: Option<String>,

    /// Maximum number of events in the answer
    #[arg(long)]
    pub limit: Option<usize>,

    /// Number of concurrent map calls
    #[arg(long)]
    pub workers: Option<usize>,

    /// Remove citation tokens from the rendered answer
    #[arg(long)]
    pub strip_citations: bool,

    /// Model to use (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Check the backend is reachable before consolidating
    #[arg(long)]
    pub check: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Input
// ─────────────────────────────────────────────────────────────────────────────

/// Contents of the input file.
#[derive(Debug, Deserialize)]
struct RunInput {
    #[serde(default)]
    query: Option<String>,
    documents: Vec<InputDocument>,
}

/// A document given either as pre-split chunks or as raw text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputDocument {
    Chunks { title: String, chunks: Vec<String> },
    Text { title: String, text: String },
}

impl InputDocument {
    fn into_source(self, section: &TimelineSection) -> SourceDocument {
        match self {
            InputDocument::Chunks { title, chunks } => SourceDocument::new(title, chunks),
            InputDocument::Text { title, text } => SourceDocument::from_text(
                title,
                &text,
                section.max_chunk_chars,
                section.chunk_overlap_chars,
            ),
        }
    }
}

fn read_input(path: &Path) -> Result<RunInput> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse input file {}", path.display()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Command
// ─────────────────────────────────────────────────────────────────────────────

/// Run the run command.
pub async fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    let input = read_input(&args.input)?;
    let query = args
        .query
        .clone()
        .or(input.query)
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("No query given. Pass --query or set \"query\" in the input file"))?;

    let section = timeline_section(&args, ctx)?;
    let documents: Vec<SourceDocument> = input
        .documents
        .into_iter()
        .map(|d| d.into_source(&section))
        .collect();

    let llm = ctx.loaded.config.llm.clone().unwrap_or_default();
    let model = match args.model {
        Some(ref model) => model.clone(),
        None => llm.require_model()?.to_string(),
    };
    let backend = create_backend(&llm, &model)?;
    if args.check {
        backend
            .health_check()
            .await
            .with_context(|| format!("Backend {} is not reachable", backend.name()))?;
        info!(backend = backend.name(), "Backend health check passed");
    }
    let pipeline = TimelinePipeline::with_backend(backend, model.as_str(), timeline_config(&section));

    if ctx.verbose && !ctx.json_output {
        let dim = Style::new().dim();
        let chunks: usize = documents.iter().map(|d| d.chunks.len()).sum();
        eprintln!(
            "{}",
            dim.apply_to(format!(
                "{} documents, {} chunks, {} workers, model {}",
                documents.len(),
                chunks,
                section.map_workers,
                model
            ))
        );
    }

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling consolidation");
            trigger.cancel();
        }
    });

    info!(documents = documents.len(), "Starting consolidation");
    let (outcome, report) = pipeline
        .run(&query, &documents, &cancel)
        .await
        .context("Consolidation failed")?;

    print_outcome(&outcome, &report, ctx)
}

/// The `[timeline]` section with CLI overrides applied, validated.
fn timeline_section(args: &RunArgs, ctx: &Context) -> Result<TimelineSection> {
    let mut section = ctx.loaded.config.timeline_or_default();
    if let Some(limit) = args.limit {
        section.event_limit = limit;
    }
    if let Some(workers) = args.workers {
        section.map_workers = workers;
    }
    if args.strip_citations {
        section.render_mode = RenderModeSetting::Stripped;
    }
    section.validate()?;
    Ok(section)
}

fn timeline_config(section: &TimelineSection) -> TimelineConfig {
    TimelineConfig {
        event_limit: section.event_limit,
        similarity_threshold: section.similarity_threshold,
        map_workers: section.map_workers,
        render_mode: match section.render_mode {
            RenderModeSetting::Inline => RenderMode::Inline,
            RenderModeSetting::Stripped => RenderMode::Stripped,
        },
        include_header: section.include_header,
        map_max_tokens: section.map_max_tokens,
        extraction_max_tokens: section.extraction_max_tokens,
        temperature: Some(section.temperature),
    }
}

/// Build the backend described by `[llm]`.
fn create_backend(llm: &LlmConfig, model: &str) -> Result<SharedBackend> {
    let backend = llm.backend.unwrap_or_default();
    let api_key = docket_config::resolve_api_key(&backend, llm.api_key.as_deref()).map(|s| s.value);

    if backend.requires_api_key() && api_key.is_none() && backend != Backend::Custom {
        return Err(ConfigError::ApiKeyNotFound {
            backend: backend.display_name().to_string(),
            env_var: backend.env_var().to_string(),
        }
        .into());
    }

    let mut config = match backend {
        Backend::Openai => OpenAiConfig::openai(api_key.unwrap_or_default()),
        Backend::Groq => OpenAiConfig::groq(api_key.unwrap_or_default()),
        Backend::Ollama => OpenAiConfig::ollama(),
        Backend::Custom => {
            let base_url = llm.base_url.as_deref().ok_or_else(|| ConfigError::MissingField {
                field: "base_url".to_string(),
                context: "[llm] with backend = \"custom\"".to_string(),
            })?;
            let mut config = OpenAiConfig::openai(String::new())
                .with_base_url(base_url)
                .with_name("custom");
            config.api_key = api_key;
            config
        }
    };

    if let Some(ref base_url) = llm.base_url {
        config = config.with_base_url(base_url);
    }
    if let Some(retries) = llm.retry_max {
        config = config.with_max_retries(retries);
    }
    if let Some(ms) = llm.retry_backoff_ms {
        config = config.with_retry_backoff(Duration::from_millis(ms));
    }
    if let Some(secs) = llm.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    config = config.with_model(model);

    Ok(Arc::new(OpenAiBackend::new(config)?))
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct RunOutput<'a> {
    #[serde(flatten)]
    outcome: &'a TimelineOutcome,
    report: &'a ConsolidationReport,
}

fn print_outcome(
    outcome: &TimelineOutcome,
    report: &ConsolidationReport,
    ctx: &Context,
) -> Result<()> {
    if ctx.json_output {
        let output = RunOutput { outcome, report };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match outcome {
        TimelineOutcome::Answer(answer) => println!("{}", answer.text),
        TimelineOutcome::NoEventsFound => println!("{}", NO_EVENTS_MESSAGE),
    }

    if ctx.verbose {
        let dim = Style::new().dim();
        eprintln!();
        eprintln!("{}", dim.apply_to(report.to_string()));
    }
    if report.has_dropped_fragments() {
        let yellow = Style::new().yellow();
        eprintln!(
            "{}",
            yellow.apply_to(format!(
                "⚠ {} of {} excerpts could not be processed",
                report.fragments_dropped, report.prompts_issued
            ))
        );
    }

    Ok(())
}
