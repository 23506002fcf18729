// src/pipeline/agri.rs
//! Aggregate business lending, agriculture row.
//!
//! The source reports stack three merged-cell header rows over the data:
//! period, borrower category, currency. One row holds the agriculture
//! industry series; each classified column yields one monthly observation.

use tracing::debug;

use super::{ExtractedValue, PipelineSpec};
use crate::fetch::links::LISTING_URLS;
use crate::normalize::period::decode_period;
use crate::normalize::{
    round2, CatalogEntry, Currency, RollupPolicy, TotalBasis, TotalSpec, TypeCatalog,
};
use crate::sheet::{headers, locate, Cell, SheetError, Workbook};
use crate::warehouse::{TableColumns, TableSpec, WriteDiscipline};

const SHEET_NAME: &str = "Выдано";
const PERIOD_ROW: usize = 4;
const CATEGORY_ROW: usize = 5;
const CURRENCY_ROW: usize = 6;
const TARGET_ROW_PHRASE: &str = "сельское";

fn entry(label: &'static str, code: i32, currency: Currency) -> CatalogEntry {
    CatalogEntry {
        label,
        code,
        description: label,
        currency: Some(currency),
    }
}

fn catalog() -> TypeCatalog {
    TypeCatalog::new(
        vec![
            entry(
                "субъектам малого предпринимательства в национальной валюте",
                2,
                Currency::National,
            ),
            entry(
                "субъектам малого предпринимательства в иностранной валюте",
                3,
                Currency::Foreign,
            ),
            entry(
                "субъектам среднего предпринимательства в национальной валюте",
                4,
                Currency::National,
            ),
            entry(
                "субъектам среднего предпринимательства в иностранной валюте",
                5,
                Currency::Foreign,
            ),
            entry(
                "субъектам крупного предпринимательства в национальной валюте",
                6,
                Currency::National,
            ),
            entry(
                "субъектам крупного предпринимательства в иностранной валюте",
                7,
                Currency::Foreign,
            ),
        ],
        Some(TotalSpec {
            code: 1,
            description: "Всего",
            basis: TotalBasis::AllClassified,
        }),
    )
}

pub fn spec() -> PipelineSpec {
    PipelineSpec {
        name: "agri",
        table: TableSpec {
            name: "DWH.D_LENDING_APK_BVU_RK",
            value_column: "AGRICULTURAL_INDUSTRY",
            columns: TableColumns::ValueWithKind,
        },
        listing_urls: LISTING_URLS,
        include_phrase: "Кредиты банковского сектора субъектам предпринимательства",
        exclude_phrases: &[
            "по видам экономической деятельности",
            "по расширенной классификации",
        ],
        catalog: catalog(),
        rollup: Some(RollupPolicy::Unconditional),
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
    let labels = headers::compose_labels(sheet, &[PERIOD_ROW, CATEGORY_ROW, CURRENCY_ROW])?;
    let target_row =
        locate::find_row(sheet, TARGET_ROW_PHRASE).ok_or_else(|| SheetError::RowNotFound {
            keyword: TARGET_ROW_PHRASE.to_string(),
        })?;

    let mut values = Vec::new();
    for (col, label) in labels.iter().enumerate().skip(1) {
        let Some(label) = label else { continue };
        let Some((period_part, category_part)) = label.split_once('|') else {
            continue;
        };
        let Some(period) = decode_period(period_part) else {
            debug!(column = col, header = %period_part.trim(), "column period not decodable");
            continue;
        };
        let Some(entry) = spec.catalog.classify(category_part) else {
            debug!(column = col, category = %category_part.trim(), "column category not in catalog");
            continue;
        };
        let value = match sheet.cell(target_row, col) {
            // a blank cell in a classified column is zero lending, not a gap
            Cell::Empty => 0.0,
            cell => match cell.to_number() {
                Some(number) => number,
                // dashes are unpublished cells; they yield no record
                None => continue,
            },
        };
        values.push(ExtractedValue {
            type_code: entry.code,
            description: entry.description.to_string(),
            period,
            value: round2(value),
            rate: None,
        });
    }
    Ok(values)
}
