//! Scraper and normalization engine for the National Bank's published
//! lending statistics: crawls the rubric listing pages, downloads the
//! monthly XLSX reports, reconstructs their merged-cell headers into
//! canonical records and loads them into the analytical warehouse.

pub mod config;
pub mod fetch;
pub mod normalize;
pub mod pipeline;
pub mod sheet;
pub mod warehouse;
