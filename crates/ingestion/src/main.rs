//! ContractForge ingestion CLI
//!
//! Runs the upload pipeline against local files:
//! - `ingest <path>` processes one PDF or every PDF in a directory
//! - `reprocess <id>` re-runs analysis for a stored document
//! - `sample <path>` writes a small contract PDF for trying things out

use anyhow::Context;
use clap::{Parser, Subcommand};
use contractforge_common::analysis::ContractAnalyzer;
use contractforge_common::config::AppConfig;
use contractforge_common::db::{ContractStore, DbPool, MemoryStore, Repository};
use contractforge_common::embeddings::create_embedder;
use contractforge_common::storage::create_object_store;
use contractforge_common::VERSION;
use contractforge_ingestion::pdf::render_text_pdf;
use contractforge_ingestion::{ItemReport, UploadFile, UploadProcessor};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "ingestion", version, about = "ContractForge PDF ingestion")]
struct Args {
    /// Keep everything in memory instead of connecting to Postgres
    #[arg(long, env = "CONTRACTFORGE_IN_MEMORY")]
    in_memory: bool,

    /// Configuration file to load instead of the config/ directory
    #[arg(long, env = "CONTRACTFORGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process a PDF file or a directory of PDFs
    Ingest { path: PathBuf },

    /// Re-run analysis and indexing for a stored document
    Reprocess { document_id: Uuid },

    /// Write a sample contract PDF
    Sample { path: PathBuf },
}

const SAMPLE_CONTRACT: &[&str] = &[
    "Contract Document: Master Supply Agreement",
    "Party A: Northwind Components Ltd.",
    "Party B: Contoso Manufacturing Inc.",
    "Effective Date: January 1, 2025",
    "Payment Terms: Net 30 days from invoice date",
    "Late Penalty: 1.5% per month on overdue balances",
    "Delivery Timeline: Within 14 business days of each purchase order",
    "Termination Clause: Either party may terminate with 90 days written notice",
    "Confidentiality Clause: Each party shall keep the other party's confidential information secret for five years",
    "Governing Law: State of Delaware",
    "Arbitration: Binding arbitration under AAA Commercial Rules",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::from_file(&path.to_string_lossy()),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level)),
        )
        .with_target(true)
        .init();

    info!("ContractForge ingestion v{}", VERSION);

    if let Command::Sample { path } = &args.command {
        let lines: Vec<String> = SAMPLE_CONTRACT.iter().map(|s| s.to_string()).collect();
        let bytes = render_text_pdf(&[lines])?;
        tokio::fs::write(path, bytes).await?;
        info!(path = %path.display(), "Sample contract written");
        return Ok(());
    }

    let store: Arc<dyn ContractStore> = if args.in_memory {
        info!("Using in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        let pool = DbPool::new(&config.database).await?;
        if config.database.run_migrations {
            pool.run_migrations().await?;
        }
        Arc::new(Repository::new(pool))
    };

    let processor = UploadProcessor::new(
        store,
        create_object_store(&config.storage),
        create_embedder(&config.embedding)?,
        Arc::new(ContractAnalyzer::from_config(&config.analysis)),
        config.upload.clone(),
    );

    let reports = match args.command {
        Command::Ingest { path } if path.is_dir() => processor.process_directory(&path).await?,
        Command::Ingest { path } => {
            let file = UploadFile::from_path(&path).await?;
            vec![processor.process_file(file).await]
        }
        Command::Reprocess { document_id } => vec![processor.reprocess(document_id).await?],
        Command::Sample { .. } => Vec::new(),
    };

    print_reports(&reports)?;

    let failed = reports.iter().filter(|r| !r.is_done()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} file(s) failed", failed, reports.len());
    }
    Ok(())
}

fn print_reports(reports: &[ItemReport]) -> anyhow::Result<()> {
    for report in reports {
        println!("{}", serde_json::to_string_pretty(report)?);
    }
    Ok(())
}
