//! CLI entrypoint for conductor
//!
//! This is the main binary that wires together all layers using
//! dependency injection. Every command runs offline: no LLM provider is
//! configured, so classification stays on the fast path, plans come from
//! templates and summaries from the heuristic summarizer.

mod commands;
mod logging;
mod offline;
mod output;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use commands::{Cli, Command, OutputFormat};
use conductor_application::{
    ClassifyQueryUseCase, CompactContextInput, CompactContextUseCase, MessageOrchestrator,
    OrchestratorConfig,
};
use conductor_domain::plan::{group_steps_by_level, parse_plan, template_plan};
use conductor_domain::{ClassificationContext, Message, QueryCategory, route};
use conductor_infrastructure::{ConfigLoader, FileConfig, JsonlCompactionStore, ThrottledHeartbeat};
use offline::OfflineWorker;
use output::ConsoleFormatter;
use serde::Serialize;
use std::io::{BufRead, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.verbose, cli.log_dir.as_deref());

    info!("Starting conductor");

    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("failed to load configuration: {}", e))?
    };

    match &cli.command {
        Command::Config => show_config(&cli, &file_config),
        command => {
            let config = orchestrator_config(&file_config)?;
            run(&cli, command, &file_config, config).await
        }
    }
}

/// Build the orchestrator config, logging warnings and failing on errors.
fn orchestrator_config(file_config: &FileConfig) -> Result<OrchestratorConfig> {
    let (config, warnings) = file_config.to_orchestrator_config()?;
    for warning in &warnings {
        warn!("{}", warning);
    }
    Ok(config)
}

async fn run(
    cli: &Cli,
    command: &Command,
    file_config: &FileConfig,
    config: OrchestratorConfig,
) -> Result<()> {
    match command {
        Command::Classify {
            text,
            pending,
            history_tokens,
        } => {
            let context = ClassificationContext::new(*pending, *history_tokens)
                .with_large_context_tokens(config.classifier.large_context_tokens);
            let outcome = ClassifyQueryUseCase::new()
                .classify(text, Some(&context))
                .await;
            emit(cli.output, &outcome.classification, || {
                ConsoleFormatter::classification(&outcome)
            })
        }

        Command::Route { text, pending } => {
            let context = ClassificationContext::new(*pending, 0)
                .with_large_context_tokens(config.classifier.large_context_tokens);
            let outcome = ClassifyQueryUseCase::new()
                .classify(text, Some(&context))
                .await;
            let target = route(&outcome.classification);
            let json = serde_json::json!({
                "classification": outcome.classification,
                "tier": outcome.tier.as_str(),
                "route": target,
            });
            emit(cli.output, &json, || ConsoleFormatter::route(&outcome, target))
        }

        Command::PlanCheck { file, template } => {
            let plan = match (template, file) {
                (Some(category), _) => {
                    let category: QueryCategory = category.parse().map_err(|e: String| anyhow!(e))?;
                    template_plan("<task>", category)
                }
                (None, Some(file)) => {
                    let text = read_input(file)?;
                    parse_plan(&text).context("no plan with at least one step found in input")?
                }
                (None, None) => bail!("either a plan file or --template is required"),
            };
            let levels = group_steps_by_level(&plan)?;
            emit(cli.output, &plan, || ConsoleFormatter::plan_levels(&plan, &levels))
        }

        Command::Compact {
            file,
            session,
            persist,
        } => {
            let text = read_input(file)?;
            let messages: Vec<Message> =
                serde_json::from_str(&text).context("expected a JSON array of messages")?;

            let mut use_case = CompactContextUseCase::new(config.compaction.clone());
            if *persist {
                let path = compaction_log_path(file_config)?;
                use_case = use_case.with_persistence(Arc::new(JsonlCompactionStore::open(&path)?));
            }
            let result = use_case
                .execute(
                    CompactContextInput::new(session, &messages)
                        .with_system_prompt(&config.system_prompt),
                )
                .await;
            emit(cli.output, &result, || ConsoleFormatter::compaction(&result))
        }

        Command::Session { session } => run_session(cli, session, file_config, config).await,

        Command::Config => show_config(cli, file_config),
    }
}

async fn run_session(
    cli: &Cli,
    session: &str,
    file_config: &FileConfig,
    config: OrchestratorConfig,
) -> Result<()> {
    let (interval, _) = file_config.heartbeat.to_interval();
    let heartbeat = Arc::new(ThrottledHeartbeat::new(interval));

    let mut orchestrator = MessageOrchestrator::new(config, Arc::new(OfflineWorker))
        .with_heartbeat(heartbeat.clone());
    if let Some(path) = file_config.persistence.compaction_log_path() {
        orchestrator = orchestrator.with_persistence(Arc::new(JsonlCompactionStore::open(&path)?));
    }

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = orchestrator.handle_message(session, &line).await?;
        match cli.output {
            OutputFormat::Text => println!("{}\n", ConsoleFormatter::response(&response)),
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string(&serde_json::json!({
                    "route": response.route,
                    "text": response.text,
                    "classification": response.classification,
                    "aggregation": response.aggregation,
                    "compacted": response.compacted,
                }))?
            ),
        }
    }

    for snapshot in heartbeat.snapshots() {
        info!(
            "heartbeat {}: {} emitted, {} suppressed",
            snapshot.name, snapshot.emitted, snapshot.suppressed
        );
    }
    Ok(())
}

fn show_config(cli: &Cli, file_config: &FileConfig) -> Result<()> {
    let issues = file_config.validate();
    match cli.output {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "config": file_config,
                "issues": issues.iter().map(|i| i.to_string()).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("Configuration sources (in priority order):");
            for line in ConfigLoader::describe_sources(cli.config.as_ref()) {
                println!("  {}", line);
            }
            println!();
            println!("{}", render_toml(file_config));
            println!("Validation: {}", ConsoleFormatter::issues(&issues));
        }
    }
    Ok(())
}

/// Effective configuration as TOML, falling back to `Debug` output.
fn render_toml(file_config: &FileConfig) -> String {
    toml::to_string_pretty(file_config).unwrap_or_else(|_| format!("{:#?}", file_config))
}

fn compaction_log_path(file_config: &FileConfig) -> Result<PathBuf> {
    file_config
        .persistence
        .compaction_log_path()
        .context("--persist needs [persistence] compaction_log in the configuration")
}

/// Read a file, or stdin for `-`.
fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn emit<T: Serialize>(
    format: OutputFormat,
    value: &T,
    text: impl FnOnce() -> String,
) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => println!("{}", text()),
    }
    Ok(())
}
