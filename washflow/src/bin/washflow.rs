//! Command-line entry point: paint a photograph in eight watercolor stages.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

use washflow::cancellation::CancellationToken;
use washflow::config::{GeminiConfig, PromptConfig, RunnerConfig};
use washflow::core::OutputFormat;
use washflow::events::LoggingEventSink;
use washflow::observability::{init_tracing, LogFormat, DEFAULT_FILTER};
use washflow::pipeline::{RunRequest, StagePipelineRunner};
use washflow::providers::GeminiImageGenerator;

#[derive(Debug, Parser)]
#[command(name = "washflow")]
#[command(about = "Turn a photograph into a watercolor painting, one stage at a time")]
#[command(version)]
struct Cli {
    /// Log output format (text or json)
    #[arg(long, global = true, default_value = "text", env = "WASHFLOW_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run all eight stages against a photograph
    Run(RunArgs),
    /// Print the default prompt configuration as JSON
    Defaults,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Source photograph
    #[arg(long, short = 'i')]
    image: PathBuf,

    /// Directory receiving the stage artifacts
    #[arg(long, short = 'o', default_value = "output")]
    output: PathBuf,

    /// Prompt configuration file (JSON)
    #[arg(long, short = 'c', env = "WASHFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Artifact encoding (jpeg or png)
    #[arg(long, default_value = "jpeg")]
    format: OutputFormat,

    /// JPEG quality, 1-100
    #[arg(long, default_value_t = 90)]
    quality: u8,

    /// Model name, overriding WASHFLOW_MODEL
    #[arg(long)]
    model: Option<String>,

    /// Per-stage generation timeout in seconds
    #[arg(long)]
    stage_timeout: Option<f64>,

    /// Whole-run timeout in seconds; 0 disables it
    #[arg(long, default_value_t = 1800.0)]
    run_timeout: f64,

    /// Keep artifacts of an earlier run for stages this run did not produce
    #[arg(long)]
    keep_stale: bool,

    /// Write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_format, DEFAULT_FILTER).context("failed to install log subscriber")?;

    match cli.command {
        Command::Defaults => {
            println!("{}", serde_json::to_string_pretty(&PromptConfig::defaults())?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Run(args) => run(args).await,
    }
}

async fn run(args: RunArgs) -> Result<ExitCode> {
    let prompts = match &args.config {
        Some(path) => PromptConfig::load(path)?,
        None => PromptConfig::default(),
    };
    let stages = prompts.stage_set()?;

    let mut gemini = GeminiConfig::from_env()?;
    if let Some(model) = args.model {
        gemini = gemini.with_model(model);
    }
    info!(model = %gemini.model, "Using Gemini image backend");
    let generator = Arc::new(GeminiImageGenerator::new(gemini)?);

    let mut config = RunnerConfig::new()
        .with_output_format(args.format)
        .with_jpeg_quality(args.quality)
        .with_discard_stale_artifacts(!args.keep_stale);
    if let Some(seconds) = args.stage_timeout {
        config = config.with_stage_timeout(seconds);
    }
    config = if args.run_timeout > 0.0 {
        config.with_run_timeout(args.run_timeout)
    } else {
        config.without_run_timeout()
    };

    let token = Arc::new(CancellationToken::new());
    token.on_cancel(|| warn!("Cancellation requested, abandoning the current call"));
    {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel("interrupted");
            }
        });
    }

    let runner = StagePipelineRunner::new(generator)
        .with_config(config)
        .with_event_sink(Arc::new(LoggingEventSink::debug()));

    let request = RunRequest::new(args.image, args.output)
        .with_system_prompt(prompts.system_prompt)
        .with_stages(stages)
        .with_cancellation(token);

    let report = runner.run(request).await?;
    println!("{}", report.summary());

    if let Some(path) = args.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }

    Ok(if report.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
