// src/fetch/links.rs
//! Report link discovery on the bank's rubric listing pages.

use anyhow::Result;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{error, info};
use url::Url;

/// Site root that relative document hrefs resolve against.
pub const BASE_URL: &str = "https://www.nationalbank.kz";

/// Rubric pages that publish the monthly lending reports. Every pipeline
/// crawls the same set; its inclusion/exclusion phrases decide which anchors
/// belong to it.
pub static LISTING_URLS: &[&str] = &[
    "https://www.nationalbank.kz/ru/news/banking-sector-loans-to-economy-analytics/rubrics/1907",
    "https://www.nationalbank.kz/ru/news/banking-sector-loans-to-economy-analytics/rubrics/1985",
    "https://www.nationalbank.kz/ru/news/banking-sector-loans-to-economy-analytics/rubrics/2204",
    "https://www.nationalbank.kz/ru/news/banking-sector-loans-to-economy-analytics/rubrics/2319",
];

/// A report anchor that survived filtering.
#[derive(Debug, Clone)]
pub struct ReportLink {
    /// Anchor text as published, whitespace-normalized.
    pub title: String,
    pub url: Url,
}

/// Crawl the listing pages and collect anchors whose text contains
/// `include` and none of `exclude`. A listing page that fails to load is
/// logged and skipped; retrying is the scheduler's job, not ours.
pub async fn discover_report_links(
    client: &Client,
    listing_urls: &[&str],
    include: &str,
    exclude: &[&str],
) -> Result<Vec<ReportLink>> {
    let base = Url::parse(BASE_URL)?;
    let mut links = Vec::new();
    for &listing in listing_urls {
        let html = match fetch_listing(client, listing).await {
            Ok(html) => html,
            Err(err) => {
                error!(url = %listing, error = %err, "listing page unavailable; skipping");
                continue;
            }
        };
        let found = extract_links(&html, &base, include, exclude);
        info!(url = %listing, count = found.len(), "collected report links");
        links.extend(found);
    }
    Ok(links)
}

async fn fetch_listing(client: &Client, url: &str) -> Result<String> {
    let resp = client.get(url).send().await?.error_for_status()?;
    Ok(resp.text().await?)
}

/// Filter the anchors of one listing page. Pure so the phrase logic is
/// testable without a network.
fn extract_links(html: &str, base: &Url, include: &str, exclude: &[&str]) -> Vec<ReportLink> {
    let selector = Selector::parse("a[href]").expect("anchor selector");
    Html::parse_document(html)
        .select(&selector)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            let title = anchor
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if !title.contains(include) {
                return None;
            }
            if exclude.iter().any(|phrase| title.contains(phrase)) {
                return None;
            }
            let url = base.join(href).ok()?;
            Some(ReportLink { title, url })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <div class="posts-files__item">
            <a href="/file/download/101">Кредиты банковского сектора субъектам предпринимательства</a>
          </div>
          <div class="posts-files__item">
            <a href="/file/download/102">Кредиты банковского сектора субъектам предпринимательства
               по видам экономической деятельности</a>
          </div>
          <a href="/file/download/103">Сводный баланс банков</a>
          <a href="https://www.nationalbank.kz/file/download/104">Кредиты банковского сектора экономике</a>
        </body></html>
    "#;

    fn base() -> Url {
        Url::parse(BASE_URL).unwrap()
    }

    #[test]
    fn include_phrase_selects_matching_anchors() {
        let links = extract_links(
            LISTING,
            &base(),
            "Кредиты банковского сектора субъектам предпринимательства",
            &[],
        );
        assert_eq!(links.len(), 2);
        assert_eq!(
            links[0].url.as_str(),
            "https://www.nationalbank.kz/file/download/101"
        );
    }

    #[test]
    fn exclude_phrases_drop_their_anchors() {
        let links = extract_links(
            LISTING,
            &base(),
            "Кредиты банковского сектора субъектам предпринимательства",
            &["по видам экономической деятельности"],
        );
        assert_eq!(links.len(), 1);
        assert_eq!(
            links[0].title,
            "Кредиты банковского сектора субъектам предпринимательства"
        );
    }

    #[test]
    fn multiline_anchor_text_is_normalized_before_matching() {
        let links = extract_links(
            LISTING,
            &base(),
            "по видам экономической деятельности",
            &[],
        );
        assert_eq!(links.len(), 1);
        assert!(links[0].title.ends_with("по видам экономической деятельности"));
    }

    #[test]
    fn absolute_hrefs_pass_through_join() {
        let links = extract_links(LISTING, &base(), "Кредиты банковского сектора экономике", &[]);
        assert_eq!(links.len(), 1);
        assert_eq!(
            links[0].url.as_str(),
            "https://www.nationalbank.kz/file/download/104"
        );
    }

    #[test]
    fn nothing_matches_nothing_returned() {
        assert!(extract_links(LISTING, &base(), "Платежный баланс", &[]).is_empty());
    }
}
