//! CLI entrypoint for council
//!
//! This is the main binary that wires together all layers using
//! dependency injection. Config conversion logic is centralized here.

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use council_application::{
    EngineConfig, ImageFanout, ImageOutput, JobStore, MergeError, MergeOrchestrator, MergeRequest,
    ResearchPipeline, ResearchWorker,
};
use council_domain::{Job, JobStatus, ModelId, QueryMode, ResearchOptions};
use council_infrastructure::{loader, OpenRouterClient, TavilySearchClient};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[derive(Parser)]
#[command(name = "council", version, about = "Multi-model answer aggregation")]
struct Cli {
    /// Increase console log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Explicit configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable the log file
    #[arg(long, global = true)]
    no_log_file: bool,

    /// Log directory override
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge answers from several models into one
    Query {
        prompt: String,
        /// Query mode: general, coding, system-design, creative
        #[arg(long, default_value = "general")]
        mode: String,
        /// Comma-separated model ids; defaults come from the config
        #[arg(long, value_delimiter = ',')]
        models: Vec<String>,
        /// Judge model override
        #[arg(long)]
        judge: Option<String>,
        /// Skip the debate rounds for this query
        #[arg(long)]
        no_debate: bool,
    },

    /// Generate an image; the first successful model wins
    Image {
        prompt: String,
        #[arg(long, value_delimiter = ',')]
        models: Vec<String>,
    },

    /// Run a deep-research job and poll it to completion
    Research {
        query: String,
        #[arg(long, value_delimiter = ',')]
        models: Vec<String>,
        #[arg(long)]
        judge: Option<String>,
    },

    /// Show configuration sources
    Config,
}

/// Local-time log line stamps.
struct Stamp;

impl fmt::time::FormatTime for Stamp {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%d %b %H:%M:%S%.3f"))
    }
}

/// Wire up tracing: stderr at a level picked by `-v`, plus a debug-level
/// copy in a per-run log file unless `--no-log-file` was given. The guard
/// keeps the file writer flushing until the process exits.
fn setup_tracing(args: &Cli) -> Option<WorkerGuard> {
    let level = ["warn", "info", "debug", "trace"][usize::from(args.verbose.min(3))];
    let stderr_layer = fmt::layer()
        .with_timer(Stamp)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(level));

    let file_sink = if args.no_log_file {
        None
    } else {
        open_log_file(args.log_dir.as_deref())
    };

    match file_sink {
        Some((writer, guard)) => {
            let file_layer = fmt::layer()
                .with_timer(Stamp)
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new("debug"));
            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(stderr_layer).init();
            None
        }
    }
}

/// Open a per-run log file named after the start time and pid.
///
/// The directory is `--log-dir` if given, else the platform data dir, else
/// `.council/logs`. If it cannot be created, logging stays console-only.
fn open_log_file(
    dir_override: Option<&Path>,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let dir = dir_override
        .map(Path::to_path_buf)
        .or_else(|| dirs::data_dir().map(|d| d.join("council").join("logs")))
        .unwrap_or_else(|| PathBuf::from(".council/logs"));
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("council: cannot create log dir {}: {}", dir.display(), e);
        return None;
    }
    let name = format!(
        "run-{}-{}.log",
        chrono::Local::now().format("%Y%m%d-%H%M%S"),
        std::process::id()
    );
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    Some((writer, guard))
}

fn load_engine_config(cli: &Cli) -> Result<EngineConfig> {
    let file_config = loader::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {}", e))?;
    for warning in file_config.validate() {
        warn!("config: {}", warning);
    }
    Ok(file_config.to_engine_config())
}

fn build_gateway() -> Result<Arc<OpenRouterClient>> {
    let api_key = std::env::var("OPENROUTER_API_KEY")
        .context("OPENROUTER_API_KEY is not set")?;
    let base_url = std::env::var("OPENROUTER_BASE_URL").ok();
    Ok(Arc::new(OpenRouterClient::new(&api_key, base_url)?))
}

fn parse_models(raw: &[String]) -> Vec<ModelId> {
    raw.iter()
        .filter(|m| !m.trim().is_empty())
        .map(|m| ModelId::new(m.trim()))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = setup_tracing(&cli);

    match &cli.command {
        Command::Config => {
            println!("{}", loader::describe_sources());
            Ok(())
        }
        Command::Query {
            prompt,
            mode,
            models,
            judge,
            no_debate,
        } => run_query(&cli, prompt, mode, models, judge.as_deref(), *no_debate).await,
        Command::Image { prompt, models } => run_image(&cli, prompt, models).await,
        Command::Research {
            query,
            models,
            judge,
        } => run_research(&cli, query, models, judge.as_deref()).await,
    }
}

async fn run_query(
    cli: &Cli,
    prompt: &str,
    mode: &str,
    models: &[String],
    judge: Option<&str>,
    no_debate: bool,
) -> Result<()> {
    let mode = QueryMode::parse(mode)?;
    let mut config = load_engine_config(cli)?;
    if no_debate {
        config.enable_debate = false;
    }

    let requested = parse_models(models);
    let request = MergeRequest {
        prompt: prompt.to_string(),
        mode,
        models: if requested.is_empty() {
            config.models.clone()
        } else {
            requested
        },
        judge_model: judge.map(ModelId::new),
    };

    let gateway = build_gateway()?;
    let orchestrator = MergeOrchestrator::new(gateway, Arc::new(config));

    match orchestrator.orchestrate(request).await {
        Ok(response) => {
            println!("{}", response.merged_answer);
            println!();
            for result in &response.per_model_results {
                let status = if result.success { "ok" } else { "failed" };
                println!(
                    "  {:<40} {:>8} {:>7}ms",
                    result.model_id, status, result.latency_ms
                );
            }
            println!(
                "  merged in {}ms (request {})",
                response.total_latency_ms, response.request_id
            );
            Ok(())
        }
        Err(MergeError::AllModelsFailed { results }) => {
            for result in &results {
                eprintln!(
                    "  {}: {}",
                    result.model_id,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            bail!("all {} models failed", results.len());
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_image(cli: &Cli, prompt: &str, models: &[String]) -> Result<()> {
    let config = load_engine_config(cli)?;
    let requested = parse_models(models);
    let models = if requested.is_empty() {
        config.models.clone()
    } else {
        requested
    };

    let gateway = build_gateway()?;
    let fanout = ImageFanout::new(gateway, Arc::new(config));
    match fanout.generate(prompt, &models).await {
        Ok(image) => {
            match image.image {
                ImageOutput::Url(url) => println!("{}", url),
                ImageOutput::Base64(data) => println!("{}", data),
            }
            info!(model = %image.model_id, latency_ms = image.latency_ms, "image generated");
            Ok(())
        }
        Err(MergeError::AllModelsFailed { results }) => {
            for result in &results {
                eprintln!(
                    "  {}: {}",
                    result.model_id,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            bail!("no model produced an image");
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_research(
    cli: &Cli,
    query: &str,
    models: &[String],
    judge: Option<&str>,
) -> Result<()> {
    let config = Arc::new(load_engine_config(cli)?);
    let gateway = build_gateway()?;
    let search = Arc::new(
        TavilySearchClient::new(std::env::var("TAVILY_API_KEY").ok())
            .context("failed to build search client")?,
    );
    if std::env::var("TAVILY_API_KEY").is_err() {
        warn!("TAVILY_API_KEY is not set; research will run without external sources");
    }

    let pipeline = Arc::new(ResearchPipeline::new(gateway, search, Arc::clone(&config)));
    let store = JobStore::new();
    let shutdown = CancellationToken::new();
    let worker = ResearchWorker::new(store.clone(), pipeline, shutdown.clone());
    let trigger = worker.trigger();
    let worker_handle = worker.spawn();

    let options = ResearchOptions {
        models: parse_models(models),
        judge_model: judge.map(ModelId::new),
        max_results: None,
    };
    let job = store.create(query, options, None);
    println!("job {} queued", job.id);
    trigger.notify_one();

    // Poll the job like an HTTP client would, until it reaches a terminal
    // state or the user interrupts.
    let outcome = tokio::select! {
        job = poll_to_completion(&store, &job) => Some(job),
        _ = tokio::signal::ctrl_c() => None,
    };

    shutdown.cancel();
    let _ = worker_handle.await;

    let Some(job) = outcome else {
        bail!("interrupted");
    };
    match job.status {
        JobStatus::Completed => {
            let report = job
                .result
                .context("completed job is missing its result")?;
            println!("\n{}", report.summary);
            if !report.citations.is_empty() {
                println!("\nCitations:");
                for (i, url) in report.citations.iter().enumerate() {
                    println!("  [{}] {}", i + 1, url);
                }
            }
            if let Some(reason) = report.metadata.fallback_reason {
                println!("\nnote: {}", reason.as_str());
            }
            info!(
                debate_rounds = report.debate_rounds,
                sources = report.research_sources.len(),
                duration_ms = report.metadata.duration_ms,
                "research complete"
            );
            Ok(())
        }
        JobStatus::Failed => {
            let error = job.error.context("failed job is missing its error")?;
            bail!("research failed ({}): {}", error.code.as_str(), error.message);
        }
        other => bail!("job ended in unexpected state: {}", other),
    }
}

async fn poll_to_completion(store: &JobStore, job: &Job) -> Job {
    let mut last_progress = None;
    loop {
        if let Some(snapshot) = store.get(&job.id, None) {
            if last_progress != Some(snapshot.progress) {
                last_progress = Some(snapshot.progress);
                info!(
                    job_id = %snapshot.id,
                    status = %snapshot.status,
                    progress = snapshot.progress,
                    "job progress"
                );
            }
            if snapshot.status.is_terminal() {
                return snapshot;
            }
        }
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
}
