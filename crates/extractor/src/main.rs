//! Gazette extraction CLI
//!
//! `extract` parses a gazette and prints what it found without touching a
//! database. `ingest` records a gazette file, or every PDF in a directory,
//! in Postgres with one ingestion job per document.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gazette_common::{config::AppConfig, db::DbPool, Repository, VERSION};
use gazette_extractor::processor::{load_document, pdf_files, source_name};
use gazette_extractor::store::{StoredEntry, StoredPerson};
use gazette_extractor::{run_tracked, Document, GazetteProcessor, IngestionReport, MemoryStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gazette-extract", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a gazette (.pdf or .txt) and print the notices as JSON
    Extract {
        /// Gazette file
        path: PathBuf,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Store a gazette file, or every PDF in a directory, in the database
    Ingest {
        /// Gazette file or directory of PDFs
        path: PathBuf,
        /// Source label (defaults to the file name)
        #[arg(short, long)]
        source: Option<String>,
    },
}

/// Output of a dry run against the in-memory store
#[derive(Serialize)]
struct DryRun {
    report: IngestionReport,
    people: Vec<StoredPerson>,
    entries: Vec<StoredEntry>,
}

/// Summary line for one ingested document
#[derive(Serialize)]
struct IngestedDocument {
    source: String,
    job_id: uuid::Uuid,
    report: IngestionReport,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config);

    let cli = Cli::parse();
    match cli.command {
        Commands::Extract { path, pretty } => extract(&config, &path, pretty).await,
        Commands::Ingest { path, source } => ingest(&config, &path, source).await,
    }
}

/// Logs go to stderr so stdout stays valid JSON
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn extract(config: &AppConfig, path: &Path, pretty: bool) -> Result<()> {
    let text = load_document(path)?;

    let store = Arc::new(MemoryStore::new());
    let processor = GazetteProcessor::new(config.extraction.clone(), store.clone());
    let report = processor.process_text(&text, &source_name(path)).await;

    let output = DryRun {
        report,
        people: store.people().await,
        entries: store.entries().await,
    };

    let json = if pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", json);

    Ok(())
}

async fn ingest(config: &AppConfig, path: &Path, source: Option<String>) -> Result<()> {
    info!("Starting gazette-extract v{}", VERSION);

    let db = DbPool::new(&config.database).await?;
    if config.database.run_migrations {
        db.run_migrations().await?;
    }
    let repository = Repository::new(db);
    let processor = GazetteProcessor::new(config.extraction.clone(), Arc::new(repository.clone()));

    let files = if path.is_dir() {
        pdf_files(path)?
    } else {
        vec![path.to_path_buf()]
    };

    let mut ingested = Vec::new();
    for file in files {
        let source = source.clone().unwrap_or_else(|| source_name(&file));
        match run_tracked(&repository, &processor, &source, Document::File(file.clone())).await {
            Ok((job, report)) => ingested.push(IngestedDocument {
                source,
                job_id: job.id,
                report,
            }),
            Err(e) => {
                error!(path = %file.display(), error = %e, "Failed to ingest gazette");
            }
        }
    }

    info!(documents = ingested.len(), "Ingestion complete");
    println!("{}", serde_json::to_string_pretty(&ingested)?);

    Ok(())
}
