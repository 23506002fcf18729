// src/pipeline/mod.rs
//! The one engine all pipelines run through.
//!
//! A pipeline is configuration: the discovery phrases, the type catalog, the
//! rollup and write policies, the target table and an extraction function
//! assembled from the sheet and normalize components. The engine drives
//! discovery, retrieval, extraction, batch normalization and the load, and
//! contains no pipeline-specific literals of its own.

pub mod agri;
pub mod industries;
pub mod total;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use reqwest::Client;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::fetch::{self, links::ReportLink};
use crate::normalize::{
    classify::synthesize_totals, collapse_duplicates, rollup::yearly_rollups, CanonicalRecord,
    PeriodKind, RollupPolicy, TypeCatalog,
};
use crate::sheet::{SheetError, Workbook};
use crate::warehouse::{TableSpec, Warehouse, WriteDiscipline};

/// One extracted monthly observation, before batch stamping.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedValue {
    pub type_code: i32,
    pub description: String,
    pub period: NaiveDate,
    pub value: f64,
    pub rate: Option<f64>,
}

/// Extraction half of a pipeline: workbook in, monthly observations out.
/// Structural problems are `SheetError`s and skip the whole document;
/// individual undecodable observations are simply absent from the result.
pub type Extractor = fn(&Workbook, &PipelineSpec) -> Result<Vec<ExtractedValue>, SheetError>;

/// Everything that distinguishes one pipeline from another.
pub struct PipelineSpec {
    pub name: &'static str,
    pub table: TableSpec,
    pub listing_urls: &'static [&'static str],
    /// Anchor text must contain this phrase...
    pub include_phrase: &'static str,
    /// ...and none of these.
    pub exclude_phrases: &'static [&'static str],
    pub catalog: TypeCatalog,
    /// `None` for layouts whose table has no period-kind column.
    pub rollup: Option<RollupPolicy>,
    pub write: WriteDiscipline,
    pub extract: Extractor,
}

/// Counters reported when a run finishes.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub package_id: i64,
    pub documents: usize,
    pub skipped_documents: usize,
    pub records: usize,
    pub inserted: usize,
    pub failed: usize,
}

/// Run one pipeline end-to-end. With `dry_run` the engine stops short of the
/// warehouse insert and prints the final records as JSON lines instead.
pub async fn run<W: Warehouse + Sync>(
    spec: &PipelineSpec,
    settings: &Settings,
    client: &Client,
    warehouse: &W,
    dry_run: bool,
) -> Result<RunSummary> {
    // ─── 1) version the batch ────────────────────────────────────────
    let package_id = warehouse.next_package_id(&spec.table).await?;
    let load_date = Local::now().naive_local();
    info!(pipeline = spec.name, package_id, "starting run");

    // ─── 2) discover candidate documents ─────────────────────────────
    let links = fetch::links::discover_report_links(
        client,
        spec.listing_urls,
        spec.include_phrase,
        spec.exclude_phrases,
    )
    .await?;
    if links.is_empty() {
        warn!(pipeline = spec.name, "no report links matched the phrases");
    }

    // ─── 3) fetch and extract, one document at a time ────────────────
    let mut monthly: Vec<CanonicalRecord> = Vec::new();
    let mut summary = RunSummary {
        package_id,
        ..RunSummary::default()
    };
    for link in &links {
        match process_document(spec, settings, client, link, load_date, package_id).await {
            Ok(mut records) => {
                summary.documents += 1;
                info!(title = %link.title, records = records.len(), "document extracted");
                monthly.append(&mut records);
            }
            Err(err) => {
                summary.skipped_documents += 1;
                error!(title = %link.title, url = %link.url, error = %err, "skipping document");
            }
        }
    }

    // ─── 4) normalize and load ───────────────────────────────────────
    load_batch(spec, warehouse, dry_run, monthly, summary).await
}

async fn process_document(
    spec: &PipelineSpec,
    settings: &Settings,
    client: &Client,
    link: &ReportLink,
    load_date: NaiveDateTime,
    package_id: i64,
) -> Result<Vec<CanonicalRecord>> {
    let document = fetch::documents::fetch_document(client, link, &settings.download_dir).await?;
    let workbook = Workbook::from_bytes(&document.bytes)
        .with_context(|| format!("parsing workbook from {}", document.url))?;
    let extracted = (spec.extract)(&workbook, spec)
        .with_context(|| format!("extracting values from {:?}", document.title))?;
    Ok(stamp_records(extracted, load_date, package_id))
}

/// Stamp extracted observations with the batch identity.
fn stamp_records(
    extracted: Vec<ExtractedValue>,
    load_date: NaiveDateTime,
    package_id: i64,
) -> Vec<CanonicalRecord> {
    extracted
        .into_iter()
        .map(|value| CanonicalRecord {
            load_date,
            package_id,
            type_code: value.type_code,
            type_description: value.description,
            value: value.value,
            rate: value.rate,
            period: value.period,
            period_kind: PeriodKind::Month,
        })
        .collect()
}

/// Dedup, synthetic totals, rollups, final dedup. Monthly duplicates are
/// collapsed before anything is summed, so overlapping source documents
/// cannot inflate a total or a yearly value.
fn finalize_batch(spec: &PipelineSpec, monthly: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
    let mut records = collapse_duplicates(monthly);
    if let Some(total) = spec.catalog.total() {
        let totals = synthesize_totals(&records, total);
        records.extend(totals);
    }
    if let Some(policy) = spec.rollup {
        let yearly = yearly_rollups(&records, policy);
        records.extend(yearly);
    }
    collapse_duplicates(records)
}

/// Finish a run from collected monthly records. An empty batch is fatal
/// before anything touches the warehouse: a run that found nothing is a
/// broken run, not an empty month.
async fn load_batch<W: Warehouse + Sync>(
    spec: &PipelineSpec,
    warehouse: &W,
    dry_run: bool,
    monthly: Vec<CanonicalRecord>,
    mut summary: RunSummary,
) -> Result<RunSummary> {
    if monthly.is_empty() {
        bail!(
            "pipeline {} produced no records from {} documents; nothing will be written",
            spec.name,
            summary.documents
        );
    }

    let records = finalize_batch(spec, monthly);
    summary.records = records.len();

    if dry_run {
        for record in &records {
            println!("{}", serde_json::to_string(record)?);
        }
        info!(
            pipeline = spec.name,
            records = records.len(),
            "dry run; warehouse untouched"
        );
        return Ok(summary);
    }

    let outcome = warehouse
        .insert_records(&spec.table, spec.write, &records)
        .await
        .with_context(|| format!("loading {} records into {}", records.len(), spec.table.name))?;
    summary.inserted = outcome.inserted;
    summary.failed = outcome.failed;
    info!(
        pipeline = spec.name,
        package_id = summary.package_id,
        records = summary.records,
        inserted = summary.inserted,
        failed = summary.failed,
        "run finished"
    );
    Ok(summary)
}
