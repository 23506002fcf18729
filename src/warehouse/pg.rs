// src/warehouse/pg.rs
//! Postgres-protocol warehouse client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};
use tracing::{error, info};

use super::{InsertOutcome, TableColumns, TableSpec, Warehouse, WriteDiscipline};
use crate::config::WarehouseSettings;
use crate::normalize::CanonicalRecord;

pub struct PgWarehouse {
    pool: PgPool,
}

impl PgWarehouse {
    /// Connect a small pool. The engine is strictly sequential, so two
    /// connections cover the occasional reconnect without holding more.
    pub async fn connect(settings: &WarehouseSettings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&settings.connect_url())
            .await
            .with_context(|| {
                format!(
                    "connecting to warehouse at {}:{}",
                    settings.host, settings.port
                )
            })?;
        Ok(PgWarehouse { pool })
    }
}

/// Bind one record in the order `TableSpec::insert_sql` lays its columns out.
fn bind_record<'q>(
    sql: &'q str,
    table: &TableSpec,
    record: &'q CanonicalRecord,
) -> Query<'q, Postgres, PgArguments> {
    let query = sqlx::query(sql)
        .bind(record.load_date)
        .bind(record.package_id)
        .bind(record.type_code)
        .bind(&record.type_description);
    match table.columns {
        TableColumns::ValueWithKind => query
            .bind(record.value)
            .bind(record.period)
            .bind(record.period_kind.as_str()),
        TableColumns::IssuedWithRate => query
            .bind(record.value)
            .bind(record.rate)
            .bind(record.period),
    }
}

#[async_trait]
impl Warehouse for PgWarehouse {
    async fn current_max_package_id(&self, table: &TableSpec) -> Result<i64> {
        let sql = format!(
            "SELECT COALESCE(MAX(PACKAGE_ID), 0)::BIGINT FROM {}",
            table.name
        );
        let max: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("reading max package id from {}", table.name))?;
        Ok(max)
    }

    async fn insert_records(
        &self,
        table: &TableSpec,
        discipline: WriteDiscipline,
        records: &[CanonicalRecord],
    ) -> Result<InsertOutcome> {
        let sql = table.insert_sql();
        match discipline {
            WriteDiscipline::Atomic => {
                let mut tx = self.pool.begin().await.context("opening transaction")?;
                for record in records {
                    bind_record(&sql, table, record)
                        .execute(&mut *tx)
                        .await
                        .with_context(|| {
                            format!(
                                "inserting type {} for {} into {}",
                                record.type_code, record.period, table.name
                            )
                        })?;
                }
                tx.commit().await.context("committing batch")?;
                info!(table = table.name, rows = records.len(), "batch committed");
                Ok(InsertOutcome {
                    inserted: records.len(),
                    failed: 0,
                })
            }
            WriteDiscipline::PerRecord => {
                let mut outcome = InsertOutcome::default();
                for record in records {
                    match bind_record(&sql, table, record).execute(&self.pool).await {
                        Ok(_) => outcome.inserted += 1,
                        Err(err) => {
                            error!(
                                table = table.name,
                                type_code = record.type_code,
                                period = %record.period,
                                error = %err,
                                "insert failed; continuing"
                            );
                            outcome.failed += 1;
                        }
                    }
                }
                info!(
                    table = table.name,
                    inserted = outcome.inserted,
                    failed = outcome.failed,
                    "per-record load finished"
                );
                Ok(outcome)
            }
        }
    }
}
