// src/warehouse/mod.rs
pub mod pg;

pub use pg::PgWarehouse;

use anyhow::Result;
use async_trait::async_trait;

use crate::normalize::CanonicalRecord;

/// Which column set a target table carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableColumns {
    /// Value plus PERIOD and PERIOD_TYPE; monthly and yearly rows side by
    /// side.
    ValueWithKind,
    /// Value plus RATE_PERCENTAGE and PERIOD; monthly rows only.
    IssuedWithRate,
}

/// One target table: its name, its pipeline-specific value column and which
/// of the two column shapes it uses.
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: &'static str,
    pub value_column: &'static str,
    pub columns: TableColumns,
}

impl TableSpec {
    /// INSERT statement for this table. Bind order must match
    /// `pg::bind_record`.
    pub fn insert_sql(&self) -> String {
        match self.columns {
            TableColumns::ValueWithKind => format!(
                "INSERT INTO {} (LOAD_DATE, PACKAGE_ID, TYPE, TYPE_DESCRIPTION, {}, PERIOD, PERIOD_TYPE) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                self.name, self.value_column
            ),
            TableColumns::IssuedWithRate => format!(
                "INSERT INTO {} (LOAD_DATE, PACKAGE_ID, TYPE, TYPE_DESCRIPTION, {}, RATE_PERCENTAGE, PERIOD) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                self.name, self.value_column
            ),
        }
    }
}

/// Whether a batch loads in one transaction or row by row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDiscipline {
    /// Single transaction; any failure rolls the whole batch back.
    Atomic,
    /// Row by row; failures are counted and logged, the rest still lands.
    PerRecord,
}

/// What an insert attempt did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub inserted: usize,
    pub failed: usize,
}

/// The two operations the engine needs from the analytical store, plus the
/// derived package versioning. Tests slot in a memory implementation.
#[async_trait]
pub trait Warehouse {
    /// Highest PACKAGE_ID currently in `table`, 0 when empty.
    async fn current_max_package_id(&self, table: &TableSpec) -> Result<i64>;

    async fn insert_records(
        &self,
        table: &TableSpec,
        discipline: WriteDiscipline,
        records: &[CanonicalRecord],
    ) -> Result<InsertOutcome>;

    /// Version for the batch being built: current max plus one, so an empty
    /// table starts at 1. Read once per run, before any record is stamped;
    /// concurrent runs are excluded by the scheduler, not here.
    async fn next_package_id(&self, table: &TableSpec) -> Result<i64> {
        Ok(self.current_max_package_id(table).await? + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_with_kind_tables_write_period_type() {
        let table = TableSpec {
            name: "DWH.D_LENDING_APK_BVU_RK",
            value_column: "AGRICULTURAL_INDUSTRY",
            columns: TableColumns::ValueWithKind,
        };
        assert_eq!(
            table.insert_sql(),
            "INSERT INTO DWH.D_LENDING_APK_BVU_RK (LOAD_DATE, PACKAGE_ID, TYPE, \
             TYPE_DESCRIPTION, AGRICULTURAL_INDUSTRY, PERIOD, PERIOD_TYPE) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)"
        );
    }

    #[test]
    fn rate_tables_write_the_rate_instead() {
        let table = TableSpec {
            name: "DWH.D_LENDING_TOTAL_BVU_RK",
            value_column: "ISSUED_MONTH_KZT",
            columns: TableColumns::IssuedWithRate,
        };
        assert_eq!(
            table.insert_sql(),
            "INSERT INTO DWH.D_LENDING_TOTAL_BVU_RK (LOAD_DATE, PACKAGE_ID, TYPE, \
             TYPE_DESCRIPTION, ISSUED_MONTH_KZT, RATE_PERCENTAGE, PERIOD) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)"
        );
    }
}
