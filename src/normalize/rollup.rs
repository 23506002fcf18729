// src/normalize/rollup.rs
//! Yearly rollups derived from monthly records.

use std::collections::BTreeMap;

use chrono::Datelike;

use super::period::year_end;
use super::{CanonicalRecord, PeriodKind};

/// Completeness gate for yearly rollups. Deliberately no `Default`: each
/// pipeline has to state which behavior its consumers expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollupPolicy {
    /// Sum whatever months are present; mid-year this yields year-to-date.
    Unconditional,
    /// Emit a year only when all twelve months are present.
    CompleteYearsOnly,
}

/// Derive yearly records from monthly ones: per (type, year) the value is
/// the sum of the monthly values and the period is Dec 31. The input must
/// already be deduplicated; overlapping documents would otherwise count the
/// same month twice.
pub fn yearly_rollups(monthly: &[CanonicalRecord], policy: RollupPolicy) -> Vec<CanonicalRecord> {
    struct Group<'a> {
        sum: f64,
        seen_months: u16,
        first: &'a CanonicalRecord,
    }

    let mut groups: BTreeMap<(i32, i32), Group<'_>> = BTreeMap::new();
    for record in monthly {
        if record.period_kind != PeriodKind::Month {
            continue;
        }
        let group = groups
            .entry((record.type_code, record.period.year()))
            .or_insert(Group {
                sum: 0.0,
                seen_months: 0,
                first: record,
            });
        group.sum += record.value;
        group.seen_months |= 1 << (record.period.month() - 1);
    }

    let mut yearly = Vec::new();
    for ((type_code, year), group) in groups {
        if policy == RollupPolicy::CompleteYearsOnly && group.seen_months.count_ones() != 12 {
            continue;
        }
        let Some(period) = year_end(year) else { continue };
        yearly.push(CanonicalRecord {
            load_date: group.first.load_date,
            package_id: group.first.package_id,
            type_code,
            type_description: group.first.type_description.clone(),
            value: group.sum,
            rate: None,
            period,
            period_kind: PeriodKind::Year,
        });
    }
    yearly
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::period::last_day_of_month;
    use chrono::NaiveDate;

    fn month_record(code: i32, year: i32, month: u32, value: f64) -> CanonicalRecord {
        CanonicalRecord {
            load_date: NaiveDate::from_ymd_opt(2025, 1, 10)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap(),
            package_id: 11,
            type_code: code,
            type_description: format!("type {code}"),
            value,
            rate: None,
            period: last_day_of_month(year, month).unwrap(),
            period_kind: PeriodKind::Month,
        }
    }

    #[test]
    fn twelve_months_roll_into_one_year_record() {
        let monthly: Vec<_> = (1..=12).map(|m| month_record(2, 2023, m, 1.0)).collect();
        let yearly = yearly_rollups(&monthly, RollupPolicy::CompleteYearsOnly);
        assert_eq!(yearly.len(), 1);
        let year = &yearly[0];
        assert_eq!(year.value, 12.0);
        assert_eq!(year.period, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(year.period_kind, PeriodKind::Year);
        assert_eq!(year.type_description, "type 2");
        assert_eq!(year.package_id, 11);
    }

    #[test]
    fn incomplete_years_are_suppressed_by_the_strict_policy() {
        let monthly: Vec<_> = (1..=11).map(|m| month_record(2, 2023, m, 1.0)).collect();
        assert!(yearly_rollups(&monthly, RollupPolicy::CompleteYearsOnly).is_empty());
    }

    #[test]
    fn unconditional_policy_sums_what_is_there() {
        let monthly: Vec<_> = (1..=3).map(|m| month_record(2, 2024, m, 10.0)).collect();
        let yearly = yearly_rollups(&monthly, RollupPolicy::Unconditional);
        assert_eq!(yearly.len(), 1);
        assert_eq!(yearly[0].value, 30.0);
        assert_eq!(yearly[0].period, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn types_and_years_group_independently() {
        let mut monthly = vec![
            month_record(2, 2023, 12, 5.0),
            month_record(2, 2024, 1, 7.0),
        ];
        monthly.push(month_record(4, 2024, 1, 100.0));
        let mut yearly = yearly_rollups(&monthly, RollupPolicy::Unconditional);
        yearly.sort_by_key(|r| (r.type_code, r.period));
        assert_eq!(yearly.len(), 3);
        assert_eq!((yearly[0].type_code, yearly[0].value), (2, 5.0));
        assert_eq!((yearly[1].type_code, yearly[1].value), (2, 7.0));
        assert_eq!((yearly[2].type_code, yearly[2].value), (4, 100.0));
    }

    #[test]
    fn existing_yearly_rows_are_ignored() {
        let mut year_row = month_record(2, 2023, 6, 40.0);
        year_row.period_kind = PeriodKind::Year;
        let monthly = vec![year_row, month_record(2, 2023, 1, 1.0)];
        let yearly = yearly_rollups(&monthly, RollupPolicy::Unconditional);
        assert_eq!(yearly.len(), 1);
        assert_eq!(yearly[0].value, 1.0);
    }
}
