// src/pipeline/industries.rs
//! Business lending by economic activity, selected industry rows.
//!
//! Two stacked header rows: a compact "MM.YY" period over a metric name.
//! Every period publishes a sum column and a rate column; only the sums are
//! loaded. Rows are industries, four of which are tracked.

use tracing::debug;

use super::{ExtractedValue, PipelineSpec};
use crate::fetch::links::LISTING_URLS;
use crate::normalize::period::decode_period;
use crate::normalize::{round2, CatalogEntry, RollupPolicy, TypeCatalog};
use crate::sheet::{headers, SheetError, Workbook};
use crate::warehouse::{TableColumns, TableSpec, WriteDiscipline};

const SHEET_NAME: &str = "Выдано";
const PERIOD_ROW: usize = 3;
const METRIC_ROW: usize = 4;
const DATA_START_ROW: usize = 5;
const SUM_METRIC_SUFFIX: &str = "Сумма";
/// Year-to-date columns are labelled "за январь-..." and must not be loaded
/// next to the plain monthly ones.
const CUMULATIVE_PREFIX: &str = "за";

fn entry(label: &'static str, code: i32, description: &'static str) -> CatalogEntry {
    CatalogEntry {
        label,
        code,
        description,
        currency: None,
    }
}

fn catalog() -> TypeCatalog {
    TypeCatalog::new(
        vec![
            entry(
                "2. Обрабатывающая промышленность",
                1,
                "Обрабатывающая промышленность",
            ),
            entry(
                "3. Прочие отрасли промышленности",
                2,
                "Прочие отрасли промышленности",
            ),
            entry("Транспорт и складирование", 3, "Транспорт и складирование"),
            entry("Информация и связь", 4, "Информация и связь"),
        ],
        None,
    )
}

pub fn spec() -> PipelineSpec {
    PipelineSpec {
        name: "industries",
        table: TableSpec {
            name: "DWH.D_LENDING_MANUFACTURING_BVU_RK",
            value_column: "ISSUED_LOAN_SUM",
            columns: TableColumns::ValueWithKind,
        },
        listing_urls: LISTING_URLS,
        include_phrase: "Кредиты банковского сектора субъектам предпринимательства по видам экономической деятельности",
        exclude_phrases: &[],
        catalog: catalog(),
        rollup: Some(RollupPolicy::CompleteYearsOnly),
        write: WriteDiscipline::Atomic,
        extract,
    }
}

fn extract(workbook: &Workbook, spec: &PipelineSpec) -> Result<Vec<ExtractedValue>, SheetError> {
    let sheet = workbook
        .sheet(SHEET_NAME)
        .ok_or_else(|| SheetError::MissingSheet {
            name: SHEET_NAME.to_string(),
        })?;
    let labels = headers::compose_labels(sheet, &[PERIOD_ROW, METRIC_ROW])?;

    let mut sum_columns = Vec::new();
    for (col, label) in labels.iter().enumerate() {
        let Some(label) = label else { continue };
        let Some((period_part, metric_part)) = label.split_once('|') else {
            continue;
        };
        if !metric_part.trim().ends_with(SUM_METRIC_SUFFIX) {
            continue;
        }
        if period_part.trim().starts_with(CUMULATIVE_PREFIX) {
            continue;
        }
        let Some(period) = decode_period(period_part) else {
            debug!(column = col, header = %period_part.trim(), "column period not decodable");
            continue;
        };
        sum_columns.push((col, period));
    }

    let mut values = Vec::new();
    for row in DATA_START_ROW..sheet.height() {
        let Some(industry) = sheet.cell(row, 0).text() else {
            continue;
        };
        let Some(entry) = spec.catalog.classify(industry) else {
            debug!(row, industry = %industry, "row industry not in catalog");
            continue;
        };
        for &(col, period) in &sum_columns {
            // dashes and blanks are unpublished cells; they yield no record
            let Some(value) = sheet.cell(row, col).to_number() else {
                continue;
            };
            values.push(ExtractedValue {
                type_code: entry.code,
                description: entry.description.to_string(),
                period,
                value: round2(value),
                rate: None,
            });
        }
    }
    Ok(values)
}
