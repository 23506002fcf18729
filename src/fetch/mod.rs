// src/fetch/mod.rs
pub mod documents;
pub mod links;

pub use documents::{fetch_document, RawDocument};
pub use links::{discover_report_links, ReportLink};
