// src/fetch/documents.rs
//! Report retrieval with an on-disk cache.
//!
//! Downloads go through a per-day cache (`<file-id>_<YYYYMMDD>.xlsx`), so a
//! rerun on the same day never refetches, while a new day always does. Some
//! rubric anchors point at an HTML landing page rather than the file; those
//! are resolved to the first spreadsheet link on the page.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use scraper::{Html, Selector};
use tokio::fs;
use tracing::debug;
use url::Url;

use super::links::ReportLink;

/// One downloaded report, bytes still unparsed. Consumed once by the
/// workbook parser and dropped.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub title: String,
    pub url: Url,
    pub bytes: Vec<u8>,
}

/// Fetch one report through the cache. Any failure here is the caller's cue
/// to skip this document and move on.
pub async fn fetch_document(
    client: &Client,
    link: &ReportLink,
    cache_dir: &Path,
) -> Result<RawDocument> {
    let path = cache_dir.join(cache_file_name(&link.url));
    let bytes = if path.exists() {
        debug!(path = %path.display(), "cache hit");
        fs::read(&path)
            .await
            .with_context(|| format!("reading cached report {}", path.display()))?
    } else {
        let bytes = download(client, &link.url).await?;
        fs::write(&path, &bytes)
            .await
            .with_context(|| format!("caching report to {}", path.display()))?;
        bytes
    };
    Ok(RawDocument {
        title: link.title.clone(),
        url: link.url.clone(),
        bytes,
    })
}

fn cache_file_name(url: &Url) -> String {
    let file_id = url
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("report");
    format!("{}_{}.xlsx", file_id, Local::now().format("%Y%m%d"))
}

async fn download(client: &Client, url: &Url) -> Result<Vec<u8>> {
    let resp = client.get(url.clone()).send().await?.error_for_status()?;
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_lowercase();

    if is_spreadsheet(&content_type) {
        return Ok(resp.bytes().await?.to_vec());
    }
    if content_type.contains("text/html") {
        let html = resp.text().await?;
        let href = find_spreadsheet_href(&html)
            .ok_or_else(|| anyhow!("landing page at {url} has no spreadsheet link"))?;
        let file_url = url
            .join(&href)
            .with_context(|| format!("joining landing page href {href:?}"))?;
        debug!(url = %file_url, "resolved landing page to spreadsheet");
        let resp = client.get(file_url).send().await?.error_for_status()?;
        return Ok(resp.bytes().await?.to_vec());
    }
    bail!("unexpected content type {content_type:?} at {url}")
}

fn is_spreadsheet(content_type: &str) -> bool {
    content_type.contains("spreadsheet") || content_type.contains("excel")
}

/// First `.xlsx` href on a landing page.
fn find_spreadsheet_href(html: &str) -> Option<String> {
    let selector = Selector::parse("a[href]").expect("anchor selector");
    Html::parse_document(html)
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .find(|href| href.to_lowercase().contains(".xlsx"))
        .map(|href| href.to_string())
}
