//! planlink command-line runner.
//!
//! ```bash
//! planlink --config planlink.toml check
//! planlink upload 113000000001 data/sales.csv
//! planlink run 112000000001
//! planlink download 116000000003 --output out/sales.csv
//! planlink batch
//! ```

mod config;
mod jobs;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use planlink::{ApiClient, Session, TaskResult, log_outcome};
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML). Defaults to $PLANLINK_CONFIG, then
    /// ~/.config/planlink/planlink.toml.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authenticate and confirm the model accepts the token.
    Check,
    /// Upload a local file into a model file.
    Upload {
        file_id: String,
        source: PathBuf,
        /// Chunk size in MiB, overriding the configuration.
        #[arg(long)]
        chunk_size_mb: Option<u32>,
    },
    /// Run an import, export, delete action or process.
    Run { action_id: String },
    /// Run an export and save its content.
    Download {
        action_id: String,
        /// Output file; standard output when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run the configured jobs, continuing past failures.
    Batch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let path = config::resolve_path(args.config);
    let config = Config::load(&path)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %path.display(),
        "starting planlink"
    );

    match args.command {
        Command::Check => {
            let session = connect(&config).await;
            let usable = session.is_ok();
            println!("{}", log_outcome("Check", session));
            if !usable {
                anyhow::bail!("connection check failed");
            }
        }
        Command::Upload {
            file_id,
            source,
            chunk_size_mb,
        } => {
            let session = connect(&config).await?;
            let session = match chunk_size_mb {
                Some(mb) => session.with_chunk_size_mb(mb),
                None => session,
            };
            let outcome = session.upload(&file_id, source).await?;
            println!("{outcome}");
        }
        Command::Run { action_id } => {
            let session = connect(&config).await?;
            let result = session.execute_action(&action_id).await?;
            print_result(&action_id, &result);
        }
        Command::Download { action_id, output } => {
            let session = connect(&config).await?;
            let content = session.download(&action_id).await?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &content)
                        .await
                        .with_context(|| format!("cannot write {}", path.display()))?;
                    println!("Wrote {} bytes to {}", content.len(), path.display());
                }
                None => {
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&content).await?;
                    stdout.write_all(b"\n").await?;
                    stdout.flush().await?;
                }
            }
        }
        Command::Batch => {
            if config.jobs.is_empty() {
                anyhow::bail!("no [[jobs]] configured in {}", path.display());
            }
            let session = connect(&config).await?;
            let report = jobs::run_jobs(&session, &config.jobs).await;
            println!("{}", report.summary());
            report.into_result()?;
        }
    }

    Ok(())
}

async fn connect(config: &Config) -> anyhow::Result<Session> {
    let api = ApiClient::new(config.endpoints())?;
    let session = Session::connect_with(
        &config.auth_settings()?,
        api,
        &config.workspace_id,
        &config.model_id,
        config.validation_policy(),
    )
    .await?;
    Ok(session
        .with_retry_count(config.retry_count)
        .with_chunk_size_mb(config.chunk_size_mb)
        .with_download_options(config.download))
}

fn print_result(action_id: &str, result: &TaskResult) {
    println!("Action {action_id} ({}): {}", result.kind, result.current_step);
    for detail in &result.details {
        println!("  {detail}");
    }
    for nested in &result.nested {
        let state = if nested.successful { "ok" } else { "failed" };
        println!("  step {}: {state}", nested.object_id);
        for detail in &nested.details {
            println!("    {detail}");
        }
        if let Some(dump) = &nested.error_dump {
            println!("    {} error rows", dump.len());
        }
    }
    if let Some(dump) = &result.error_dump {
        println!("  error dump: {} rows", dump.len());
        for row in dump.rows.iter().take(10) {
            println!("    {}", row.join(","));
        }
    }
    if result.truncated {
        println!("  warning: export payload incomplete");
    }
}
