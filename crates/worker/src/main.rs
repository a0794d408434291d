//! `quire-worker` -- publishes the weekly newsletter to the platform.
//!
//! Invoked by the scheduler once per edition. Results are printed to stdout
//! as JSON; logs go to stderr. The process exits non-zero when any requested
//! tier fails.
//!
//! # Commands
//!
//! | Command                                 | Effect                                   |
//! |-----------------------------------------|------------------------------------------|
//! | `publish --free <FILE> --paid <FILE>`   | Publish one or both tiers                |
//! | `verify`                                | Acquire a session, print the publication |
//! | `preview <FILE>`                        | Print the editor tree, no network        |
//!
//! See [`WorkerConfig::from_env`] for environment variables. `LOG_FORMAT=json`
//! switches log output to JSON lines.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quire_core::document::Tier;
use quire_core::prose::to_editor_doc;
use quire_worker::config::WorkerConfig;
use quire_worker::source::DocumentSource;
use quire_worker::wiring;

const DEFAULT_LOG_FILTER: &str = "quire_worker=info,quire_pipeline=info,quire_platform=info";

#[derive(Parser)]
#[command(name = "quire-worker", version, about = "Tiered newsletter publisher")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Publish the free and/or paid edition.
    Publish {
        /// Free-tier document (JSON).
        #[arg(long, required_unless_present = "paid")]
        free: Option<PathBuf>,
        /// Paid-tier document (JSON).
        #[arg(long)]
        paid: Option<PathBuf>,
    },
    /// Check that a session can be acquired and print the publication.
    Verify,
    /// Print the editor tree a document would be sent as.
    Preview {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Publish { free, paid } => publish(free.as_deref(), paid.as_deref()).await,
        Command::Verify => verify().await,
        Command::Preview { file } => preview(&file),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn publish(free: Option<&Path>, paid: Option<&Path>) -> anyhow::Result<ExitCode> {
    let config = WorkerConfig::from_env().context("Invalid configuration")?;
    let free = free
        .map(|path| DocumentSource::load(path).map(|s| s.into_document(Tier::Free)))
        .transpose()?;
    let paid = paid
        .map(|path| DocumentSource::load(path).map(|s| s.into_document(Tier::Paid)))
        .transpose()?;

    let publisher = wiring::build_publisher(&config).context("Failed to set up publisher")?;
    tracing::info!(
        publication = %config.publication_url,
        free = free.is_some(),
        paid = paid.is_some(),
        "Publishing",
    );

    match (free, paid) {
        (Some(free), Some(paid)) => {
            let results = publisher.publish_both(free, paid).await;
            print_json(&results)?;
            Ok(exit_code(results.all_succeeded()))
        }
        (Some(doc), None) => {
            let result = publisher.publish_tier(Tier::Free, doc).await;
            print_json(&result)?;
            Ok(exit_code(result.success))
        }
        (None, Some(doc)) => {
            let result = publisher.publish_tier(Tier::Paid, doc).await;
            print_json(&result)?;
            Ok(exit_code(result.success))
        }
        (None, None) => anyhow::bail!("Nothing to publish: pass --free and/or --paid"),
    }
}

async fn verify() -> anyhow::Result<ExitCode> {
    let config = WorkerConfig::from_env().context("Invalid configuration")?;
    let publisher = wiring::build_publisher(&config).context("Failed to set up publisher")?;

    match publisher.verify().await {
        Ok(publication) => {
            print_json(&publication)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(error = %e, "Verification failed");
            print_json(&serde_json::json!({ "success": false, "error": e.to_string() }))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn preview(file: &Path) -> anyhow::Result<ExitCode> {
    let doc = DocumentSource::load(file)?.into_document(Tier::Free);
    if let Err(e) = doc.validate() {
        tracing::warn!(error = %e, "Document would be rejected at publish time");
    }
    print_json(&serde_json::json!({
        "title": doc.title,
        "subtitle": doc.subtitle,
        "draft_body": to_editor_doc(&doc.body),
    }))?;
    Ok(ExitCode::SUCCESS)
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
