#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use draftflow::config::load_from;
use draftflow::observability::{init_logging, LogFormat};
use draftflow::prelude::*;

#[derive(Parser)]
#[command(name = "draftflow", version, about = "Multi-backend document generation pipeline")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for one intent
    Run {
        /// JSON file holding an intent, or `{ intent, files }`
        #[arg(long)]
        intent: PathBuf,
        /// Configuration JSON, merged over the defaults
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory that receives `runs/`
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Where to write the final markdown; stdout when absent
        #[arg(long)]
        out: Option<PathBuf>,
        /// Skip git commits of snapshot files
        #[arg(long)]
        no_git: bool,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

fn load_input(path: &Path) -> Result<PipelineInput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read intent file {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))?;
    if value.get("intent").is_some() {
        serde_json::from_value(value).context("invalid pipeline input")
    } else {
        let intent: Intent = serde_json::from_value(value).context("invalid intent")?;
        Ok(PipelineInput::new(intent))
    }
}

async fn run(
    intent: &Path,
    config: Option<&Path>,
    root: PathBuf,
    out: Option<PathBuf>,
    no_git: bool,
) -> Result<()> {
    let input = load_input(intent)?;
    let config = load_config(config)?;
    let registry = ClientRegistry::from_config(&config);
    if registry.is_empty() {
        warn!("No backend has an API key; every stage will use its default");
    }

    let vcs: Arc<dyn VersionControl> = if no_git {
        Arc::new(NoopVersionControl)
    } else {
        Arc::new(GitVersionControl::new())
    };
    let orchestrator = Orchestrator::new(config, Prompts::default(), registry)
        .with_root(root)
        .with_version_control(vcs);

    let cancel = Arc::new(CancellationToken::new());
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current stage");
                cancel.cancel("interrupted");
            }
        });
    }

    let options = RunOptions::new()
        .with_progress(Arc::new(LoggingProgressSink::default()))
        .with_cancel(cancel);
    let run = match orchestrator.run(input, options).await {
        Ok(run) => run,
        Err(DraftflowError::Aborted(reason)) => bail!("run aborted: {reason}"),
        Err(e) => return Err(e).context("run failed"),
    };

    let markdown = run.final_doc.map(|d| d.markdown).unwrap_or_default();
    match out {
        Some(path) => {
            std::fs::write(&path, &markdown)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(run_id = %run.id, path = %path.display(), "Final document written");
        }
        None => println!("{markdown}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    });

    match cli.command {
        Commands::Run {
            intent,
            config,
            root,
            out,
            no_git,
        } => run(&intent, config.as_deref(), root, out, no_git).await,
        Commands::Config {
            command: ConfigCommands::Show { config },
        } => {
            let config = load_config(config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
