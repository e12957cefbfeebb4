//! Jimaku - batch media-to-subtitle translation pipeline
//!
//! This is the main entry point for the jimaku command line, which drives
//! the orchestration pipeline: resolve inputs, extract audio, transcribe,
//! translate through the selected backend, and synthesize subtitle and
//! lyric artifacts.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jimaku::backend::document::write_default_document;
use jimaku::backend::{Backend, BackendKind};
use jimaku::cancel::{CancelCoordinator, CancelToken};
use jimaku::cli::{Args, Commands};
use jimaku::config::Config;
use jimaku::error::PipelineError;
use jimaku::pipeline::{JobSpec, Orchestrator};
use jimaku::project::{Dictionaries, ProjectLayout};
use jimaku::status::{StatusEvent, StatusSink};
use jimaku::subtitle::OutputFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Run {
            inputs,
            backend,
            token,
            target_lang,
            formats,
            dict_before,
            dict_gpt,
            dict_after,
            extra_prompt,
        } => {
            let mut config = config;
            if let Some(backend) = backend {
                config.backend.name = backend;
            }
            if let Some(token) = token {
                config.backend.token = token;
            }
            if let Some(target_lang) = target_lang {
                config.languages.target = target_lang;
            }
            if !formats.is_empty() {
                config.output.formats = formats
                    .iter()
                    .map(|f| parse_output_format(f))
                    .collect::<Result<Vec<_>>>()?;
            }

            let mut job = JobSpec::from_config(&config, inputs)?;
            job.dictionaries = Dictionaries {
                before: read_optional_file(dict_before.as_deref())?,
                gpt: read_optional_file(dict_gpt.as_deref())?,
                after: read_optional_file(dict_after.as_deref())?,
            };
            job.extra_prompt = extra_prompt.unwrap_or_default();

            let (status, mut events) = StatusSink::channel();
            let cancel = CancelToken::new();
            let mut orchestrator = Orchestrator::new(&config, status, cancel.clone())?;
            let coordinator =
                CancelCoordinator::new(cancel, orchestrator.supervisor().clone());

            // Ctrl-C is the stop request: flag the batch and tear down every
            // supervised process; the pipeline unwinds at its next checkpoint.
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    coordinator.request_stop().await;
                }
            });

            // Status lines already reach the console through tracing; the
            // drain keeps the channel from buffering the whole run.
            let drain = tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    if let StatusEvent::Finished(summary) = event {
                        return Some(summary);
                    }
                }
                None
            });

            let summary = orchestrator.run(job).await?;
            drain.await.ok();

            println!(
                "Batch finished: {} succeeded, {} skipped, {} failed{}",
                summary.succeeded,
                summary.skipped,
                summary.failed,
                if summary.cancelled { " (cancelled)" } else { "" }
            );
        }
        Commands::Clean => {
            let layout = ProjectLayout::new(&config.project.root);
            let report = layout.clean().await?;
            println!(
                "Removed {} files ({:.2} MB)",
                report.removed_files,
                report.reclaimed_bytes as f64 / 1024.0 / 1024.0
            );
        }
        Commands::Backends => {
            println!(
                "{:<25} {:<8} {:<12} {}",
                "Name", "Kind", "Driver", "Endpoint"
            );
            println!("{}", "-".repeat(80));
            for backend in Backend::ALL {
                let kind = match backend.kind() {
                    BackendKind::LocalServer => "local",
                    BackendKind::HostedApi => "hosted",
                };
                println!(
                    "{:<25} {:<8} {:<12} {}",
                    backend.name(),
                    kind,
                    backend.engine_driver(),
                    backend.default_endpoint().unwrap_or("-")
                );
            }
        }
        Commands::Init { force } => {
            let config_path = std::path::Path::new("config.toml");
            if config_path.exists() && !force {
                anyhow::bail!("config.toml already exists; pass --force to overwrite");
            }
            config.save_to_file(config_path)?;
            println!("Wrote {}", config_path.display());

            let document_path = &config.backend.document;
            if !document_path.exists() || force {
                write_default_document(document_path)?;
                println!("Wrote {}", document_path.display());
            }
        }
    }

    Ok(())
}

/// Setup logging to both console and a daily-rolling file under the
/// project log directory.
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".jimaku").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "jimaku.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer().with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

fn read_optional_file(path: Option<&std::path::Path>) -> Result<String> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => Ok(String::new()),
    }
}

/// Parse an output format name from the command line
fn parse_output_format(name: &str) -> Result<OutputFormat> {
    match name.to_lowercase().as_str() {
        "source-srt" => Ok(OutputFormat::SourceSrt),
        "translated-srt" => Ok(OutputFormat::TranslatedSrt),
        "bilingual-srt" => Ok(OutputFormat::BilingualSrt),
        "source-lrc" => Ok(OutputFormat::SourceLrc),
        "translated-lrc" => Ok(OutputFormat::TranslatedLrc),
        _ => Err(PipelineError::Config(format!(
            "Invalid output format '{}'. Valid formats: source-srt, translated-srt, bilingual-srt, source-lrc, translated-lrc",
            name
        ))
        .into()),
    }
}
