// src/normalize/dedupe.rs
//! Batch deduplication.
//!
//! The rubric pages overlap, so the same report (and thus the same
//! observation) routinely arrives more than once per run. Records are
//! collapsed on the (period, type, period-kind) key; the first occurrence
//! wins, mirroring the first-match contract of the keyword locator.

use std::collections::HashSet;

use super::{CanonicalRecord, RecordKey};

/// Collapse duplicate records, keeping the first of each key in input order.
pub fn collapse_duplicates(records: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
    let mut seen: HashSet<RecordKey> = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::PeriodKind;
    use chrono::NaiveDate;

    fn record(code: i32, day: u32, kind: PeriodKind, value: f64) -> CanonicalRecord {
        CanonicalRecord {
            load_date: NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            package_id: 1,
            type_code: code,
            type_description: String::new(),
            value,
            rate: None,
            period: NaiveDate::from_ymd_opt(2024, 12, day).unwrap(),
            period_kind: kind,
        }
    }

    #[test]
    fn first_occurrence_wins() {
        let records = vec![
            record(2, 31, PeriodKind::Month, 100.0),
            record(2, 31, PeriodKind::Month, 999.0),
            record(3, 31, PeriodKind::Month, 50.0),
        ];
        let unique = collapse_duplicates(records);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].value, 100.0);
        assert_eq!(unique[1].value, 50.0);
    }

    #[test]
    fn period_kind_is_part_of_the_key() {
        // A December month record and the yearly rollup share the date.
        let records = vec![
            record(2, 31, PeriodKind::Month, 7.0),
            record(2, 31, PeriodKind::Year, 84.0),
        ];
        assert_eq!(collapse_duplicates(records).len(), 2);
    }
}
