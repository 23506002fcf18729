// src/normalize/classify.rs
//! Type classification against a closed catalog.
//!
//! Every pipeline owns a fixed list of category labels with stable integer
//! codes. Matching is exact on a normalized form, never by substring, so a
//! new category appearing in a report can only ever be skipped, not silently
//! folded into an existing code.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{round2, CanonicalRecord, PeriodKind};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static ORDINAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s*").expect("ordinal prefix regex"));

/// Normalize a label for comparison: collapse whitespace runs to one space,
/// strip a leading `"<digits>. "` enumeration prefix, case-fold. The reports
/// renumber their row lists between editions, so the enumeration prefix
/// carries no meaning.
pub fn normalize_label(raw: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(raw.trim(), " ");
    let stripped = ORDINAL_RE.replace(&collapsed, "");
    stripped.to_lowercase()
}

/// Which of the paired value columns an entry reads, in layouts that split a
/// category into national/foreign currency columns. Also selects which
/// average rate attaches to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    National,
    Foreign,
}

/// One entry of a pipeline's catalog.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Source label this entry matches, compared after normalization.
    pub label: &'static str,
    /// Stable type code stored in the warehouse.
    pub code: i32,
    /// Canonical description stored alongside the code; the raw sheet text
    /// never reaches the warehouse.
    pub description: &'static str,
    /// Set where the layout distinguishes currency by column position.
    pub currency: Option<Currency>,
}

/// How the synthetic total sums the classified records of a period.
#[derive(Debug, Clone, Copy)]
pub enum TotalBasis {
    /// Every non-total record of the period.
    AllClassified,
    /// Only the named codes. Used where the catalog itself contains
    /// subtotals whose sum would double-count the detail rows.
    Codes(&'static [i32]),
}

/// The reserved, always computed total pseudo-category.
#[derive(Debug, Clone)]
pub struct TotalSpec {
    pub code: i32,
    pub description: &'static str,
    pub basis: TotalBasis,
}

/// Closed catalog of the types one pipeline may produce.
#[derive(Debug, Clone)]
pub struct TypeCatalog {
    entries: Vec<CatalogEntry>,
    normalized: Vec<String>,
    total: Option<TotalSpec>,
}

impl TypeCatalog {
    pub fn new(entries: Vec<CatalogEntry>, total: Option<TotalSpec>) -> Self {
        let normalized = entries
            .iter()
            .map(|entry| normalize_label(entry.label))
            .collect();
        TypeCatalog {
            entries,
            normalized,
            total,
        }
    }

    /// Classify a raw source label. Exact match on the normalized form;
    /// `None` means "not in this pipeline's catalog" and the caller skips
    /// the observation. Where two entries share a label (currency-split
    /// layouts), the first one wins; such catalogs are driven through
    /// `entries()` instead.
    pub fn classify(&self, raw: &str) -> Option<&CatalogEntry> {
        let needle = normalize_label(raw);
        self.normalized
            .iter()
            .position(|normalized| *normalized == needle)
            .map(|index| &self.entries[index])
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn total(&self) -> Option<&TotalSpec> {
        self.total.as_ref()
    }
}

/// Compute the synthetic per-period total records from already classified
/// monthly records. The total is always derived, never read off the sheet;
/// periods with no contributing records produce no total at all.
pub fn synthesize_totals(records: &[CanonicalRecord], total: &TotalSpec) -> Vec<CanonicalRecord> {
    let mut sums: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut stamp: Option<(NaiveDateTime, i64)> = None;

    for record in records {
        if record.period_kind != PeriodKind::Month || record.type_code == total.code {
            continue;
        }
        let counted = match total.basis {
            TotalBasis::AllClassified => true,
            TotalBasis::Codes(codes) => codes.contains(&record.type_code),
        };
        if counted {
            *sums.entry(record.period).or_insert(0.0) += record.value;
            stamp.get_or_insert((record.load_date, record.package_id));
        }
    }

    let Some((load_date, package_id)) = stamp else {
        return Vec::new();
    };
    sums.into_iter()
        .map(|(period, value)| CanonicalRecord {
            load_date,
            package_id,
            type_code: total.code,
            type_description: total.description.to_string(),
            value: round2(value),
            rate: None,
            period,
            period_kind: PeriodKind::Month,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> TypeCatalog {
        TypeCatalog::new(
            vec![
                CatalogEntry {
                    label: "2. Обрабатывающая промышленность",
                    code: 1,
                    description: "Обрабатывающая промышленность",
                    currency: None,
                },
                CatalogEntry {
                    label: "Транспорт и складирование",
                    code: 3,
                    description: "Транспорт и складирование",
                    currency: None,
                },
            ],
            None,
        )
    }

    fn record(code: i32, period: NaiveDate, value: f64) -> CanonicalRecord {
        CanonicalRecord {
            load_date: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            package_id: 3,
            type_code: code,
            type_description: format!("type {code}"),
            value,
            rate: None,
            period,
            period_kind: PeriodKind::Month,
        }
    }

    #[test]
    fn normalization_collapses_whitespace_and_prefix() {
        assert_eq!(
            normalize_label("  2.   Обрабатывающая\n промышленность "),
            "обрабатывающая промышленность"
        );
        assert_eq!(normalize_label("Транспорт и складирование"), "транспорт и складирование");
    }

    #[test]
    fn classification_survives_renormalization() {
        let catalog = catalog();
        let raw = "2. Обрабатывающая  промышленность";
        let direct = catalog.classify(raw).map(|e| e.code);
        let renormalized = catalog.classify(&normalize_label(raw)).map(|e| e.code);
        assert_eq!(direct, Some(1));
        assert_eq!(direct, renormalized);
    }

    #[test]
    fn matching_is_exact_not_substring() {
        let catalog = catalog();
        assert!(catalog.classify("Обрабатывающая").is_none());
        assert!(catalog.classify("Транспорт и складирование грузов").is_none());
        assert_eq!(catalog.classify("транспорт И складирование").map(|e| e.code), Some(3));
    }

    #[test]
    fn totals_sum_each_period_separately() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let feb = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let total = TotalSpec {
            code: 1,
            description: "Всего",
            basis: TotalBasis::AllClassified,
        };
        let records = vec![
            record(2, jan, 100.0),
            record(3, jan, 50.5),
            record(2, feb, 10.0),
        ];
        let totals = synthesize_totals(&records, &total);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].period, jan);
        assert_eq!(totals[0].value, 150.5);
        assert_eq!(totals[0].type_code, 1);
        assert_eq!(totals[0].type_description, "Всего");
        assert_eq!(totals[1].period, feb);
        assert_eq!(totals[1].value, 10.0);
    }

    #[test]
    fn code_basis_skips_everything_else() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let total = TotalSpec {
            code: 1,
            description: "Всего",
            basis: TotalBasis::Codes(&[2, 3]),
        };
        let records = vec![
            record(2, jan, 100.0),
            record(3, jan, 40.0),
            record(4, jan, 999.0),
            record(9, jan, 999.0),
        ];
        let totals = synthesize_totals(&records, &total);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].value, 140.0);
    }

    #[test]
    fn existing_totals_and_yearly_rows_do_not_feed_the_sum() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let total = TotalSpec {
            code: 1,
            description: "Всего",
            basis: TotalBasis::AllClassified,
        };
        let mut yearly = record(2, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(), 500.0);
        yearly.period_kind = PeriodKind::Year;
        let records = vec![record(1, jan, 77.0), yearly, record(2, jan, 5.0)];
        let totals = synthesize_totals(&records, &total);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].value, 5.0);
    }

    #[test]
    fn no_contributions_no_total() {
        let total = TotalSpec {
            code: 1,
            description: "Всего",
            basis: TotalBasis::Codes(&[2]),
        };
        assert!(synthesize_totals(&[], &total).is_empty());
        let jan = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert!(synthesize_totals(&[record(7, jan, 1.0)], &total).is_empty());
    }
}
