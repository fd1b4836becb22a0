//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use console::Style;

use docket_config::{self, Backend, DocketConfig, LlmConfig, TimelineSection};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the merged configuration and load warnings
    Show,

    /// Show which config files are searched and loaded
    Path,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./docket.toml) instead of user config
        #[arg(long)]
        local: bool,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(ctx),
        ConfigCommand::Init { local } => cmd_init(local),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;
    let config = &loaded.config;

    if ctx.json_output {
        let sources: Vec<String> = loaded
            .loaded_from()
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        let output = serde_json::json!({
            "config": config,
            "sources": sources,
            "warnings": loaded.warnings,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("# Docket Configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    match config.llm {
        Some(ref llm) => {
            let backend = llm.backend.unwrap_or_default();
            println!("LLM:");
            println!("  backend: {}", backend);
            println!("  model:   {}", llm.model.as_deref().unwrap_or("(not set)"));
            if let Some(ref url) = llm.base_url {
                println!("  url:     {}", url);
            }
            println!("  key:     {}", key_status(&backend, llm));
            println!();
        }
        None => println!("No [llm] section configured\n"),
    }

    let timeline = config.timeline_or_default();
    println!("Timeline:");
    println!("  event_limit:          {}", timeline.event_limit);
    println!("  similarity_threshold: {}", timeline.similarity_threshold);
    println!("  map_workers:          {}", timeline.map_workers);
    println!("  render_mode:          {:?}", timeline.render_mode);
    println!();

    if !loaded.warnings.is_empty() {
        let yellow = Style::new().yellow();
        println!("Warnings:");
        for w in &loaded.warnings {
            println!("  {} {}", yellow.apply_to("⚠"), w);
        }
        println!();
    }

    if ctx.verbose {
        println!("---\nRaw config:\n");
        if let Ok(toml_str) = config.to_toml() {
            println!("{}", toml_str);
        }
    }

    Ok(())
}

fn key_status(backend: &Backend, llm: &LlmConfig) -> String {
    if !backend.requires_api_key() {
        return "not required".to_string();
    }
    match docket_config::resolve_api_key(backend, llm.api_key.as_deref()) {
        Some(secret) => format!("✓ from {}", secret.source),
        None => format!("✗ missing (set {})", backend.env_var()),
    }
}

fn cmd_path(ctx: &Context) -> Result<()> {
    if ctx.json_output {
        let sources: Vec<serde_json::Value> = ctx
            .loaded
            .sources
            .iter()
            .map(|s| {
                serde_json::json!({
                    "path": s.path.display().to_string(),
                    "loaded": s.loaded,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    println!("Config file search order (later overrides earlier):\n");
    for source in &ctx.loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }
    Ok(())
}

fn cmd_init(local: bool) -> Result<()> {
    let path = if local {
        PathBuf::from("docket.toml")
    } else {
        docket_config::xdg_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine the user config directory"))?
    };

    if path.exists() {
        anyhow::bail!("Config file already exists: {}", path.display());
    }

    let mut config = DocketConfig::new();
    config.llm = Some(LlmConfig {
        backend: Some(Backend::Openai),
        model: Some("gpt-4o-mini".to_string()),
        ..Default::default()
    });
    config.timeline = Some(TimelineSection::default());

    docket_config::save_config(&config, &path)?;
    println!("Created {}", path.display());
    Ok(())
}
