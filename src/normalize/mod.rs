// src/normalize/mod.rs
pub mod classify;
pub mod dedupe;
pub mod period;
pub mod rollup;

pub use classify::{CatalogEntry, Currency, TotalBasis, TotalSpec, TypeCatalog};
pub use dedupe::collapse_duplicates;
pub use rollup::RollupPolicy;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Whether a record covers one month or a whole year. Stored verbatim in the
/// PERIOD_TYPE column where the target table has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Month,
    Year,
}

impl PeriodKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PeriodKind::Month => "month",
            PeriodKind::Year => "year",
        }
    }
}

/// One normalized observation, in exactly the shape the warehouse stores.
#[derive(Debug, Clone, Serialize)]
pub struct CanonicalRecord {
    pub load_date: NaiveDateTime,
    pub package_id: i64,
    pub type_code: i32,
    pub type_description: String,
    /// Issued amount, millions of tenge.
    pub value: f64,
    /// Weighted average rate, where the layout publishes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    /// Last day of the covered month (or Dec 31 for yearly rollups).
    pub period: NaiveDate,
    pub period_kind: PeriodKind,
}

/// (period, type code, period kind): unique within one package once the
/// batch has been through `dedupe`.
pub type RecordKey = (NaiveDate, i32, PeriodKind);

impl CanonicalRecord {
    pub fn key(&self) -> RecordKey {
        (self.period, self.type_code, self.period_kind)
    }
}

/// Round to two decimals, the precision the reports publish.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
