// src/main.rs
use anyhow::Result;
use clap::{Parser, ValueEnum};
use nbkscraper::{config::Settings, pipeline, warehouse::PgWarehouse};
use reqwest::Client;
use std::fs;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Scrape National Bank lending reports and load them into the warehouse.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Report family to run.
    #[arg(long, value_enum)]
    pipeline: PipelineKind,

    /// Print the final records as JSON lines instead of writing them.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PipelineKind {
    /// Aggregate business lending, agriculture row.
    Agri,
    /// Lending by economic activity, selected industries.
    Industries,
    /// Economy-wide lending with weighted average rates.
    Total,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    dotenvy::dotenv().ok();
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    // ─── 2) configure ────────────────────────────────────────────────
    let args = Args::parse();
    let settings = Settings::from_env()?;
    fs::create_dir_all(&settings.download_dir)?;

    let spec = match args.pipeline {
        PipelineKind::Agri => pipeline::agri::spec(),
        PipelineKind::Industries => pipeline::industries::spec(),
        PipelineKind::Total => pipeline::total::spec(),
    };
    info!(pipeline = spec.name, dry_run = args.dry_run, "startup");

    // ─── 3) connect and run ──────────────────────────────────────────
    let client = Client::new();
    let warehouse = PgWarehouse::connect(&settings.warehouse).await?;
    let summary = pipeline::run(&spec, &settings, &client, &warehouse, args.dry_run).await?;

    info!(
        package_id = summary.package_id,
        documents = summary.documents,
        skipped_documents = summary.skipped_documents,
        records = summary.records,
        inserted = summary.inserted,
        failed = summary.failed,
        "done"
    );
    Ok(())
}
