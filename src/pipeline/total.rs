// src/pipeline/total.rs
//! Economy-wide lending with weighted average rates.
//!
//! Values and rates live on two worksheets found by name fragment. On the
//! issued sheet periods run along a header row, with the national-currency
//! value one column right of the label and the foreign-currency value two
//! right; series rows are located by keyword. The rates sheet repeats the
//! period tokens over currency-labelled column pairs.

use tracing::debug;

use super::{ExtractedValue, PipelineSpec};
use crate::fetch::links::LISTING_URLS;
use crate::normalize::period::decode_period;
use crate::normalize::{round2, CatalogEntry, Currency, TotalBasis, TotalSpec, TypeCatalog};
use crate::sheet::{locate, SheetError, SheetTable, Workbook};
use crate::warehouse::{TableColumns, TableSpec, WriteDiscipline};

const ISSUED_SHEET_FRAGMENT: &str = "выдано";
const RATES_SHEET_FRAGMENT: &str = "ставк";
const PERIOD_ROW: usize = 3;
const NATIONAL_OFFSET: usize = 1;
const FOREIGN_OFFSET: usize = 2;
const RATES_PERIOD_ROW: usize = 3;
const RATES_CURRENCY_ROW: usize = 4;
const RATES_VALUE_ROW: usize = 5;

fn entry(
    label: &'static str,
    code: i32,
    description: &'static str,
    currency: Currency,
) -> CatalogEntry {
    CatalogEntry {
        label,
        code,
        description,
        currency: Some(currency),
    }
}

fn catalog() -> TypeCatalog {
    TypeCatalog::new(
        vec![
            entry(
                "всего кредиты выданные",
                2,
                "Всего в национальной валюте",
                Currency::National,
            ),
            entry(
                "всего кредиты выданные",
                3,
                "Всего в иностранной валюте",
                Currency::Foreign,
            ),
            entry(
                "малого предпринимательства",
                4,
                "В нац. валюте, малое предпринимательство",
                Currency::National,
            ),
            entry(
                "среднего предпринимательства",
                5,
                "В нац. валюте, среднее предпринимательство",
                Currency::National,
            ),
            entry(
                "крупного предпринимательства",
                6,
                "В нац. валюте, крупное предпринимательство",
                Currency::National,
            ),
            entry(
                "малого предпринимательства",
                7,
                "В ин. валюте, малое предпринимательство",
                Currency::Foreign,
            ),
            entry(
                "среднего предпринимательства",
                8,
                "В ин. валюте, среднее предпринимательство",
                Currency::Foreign,
            ),
            entry(
                "крупного предпринимательства",
                9,
                "В ин. валюте, крупное предпринимательство",
                Currency::Foreign,
            ),
        ],
        Some(TotalSpec {
            code: 1,
            description: "Всего",
            basis: TotalBasis::Codes(&[2, 3]),
        }),
    )
}

pub fn spec() -> PipelineSpec {
    PipelineSpec {
        name: "total",
        table: TableSpec {
            name: "DWH.D_LENDING_TOTAL_BVU_RK",
            value_column: "ISSUED_MONTH_KZT",
            columns: TableColumns::IssuedWithRate,
        },
        listing_urls: LISTING_URLS,
        include_phrase: "Кредиты банковского сектора экономике",
        exclude_phrases: &[],
        catalog: catalog(),
        rollup: None,
        write: WriteDiscipline::PerRecord,
        extract,
    }
}

fn extract(workbook: &Workbook, spec: &PipelineSpec) -> Result<Vec<ExtractedValue>, SheetError> {
    let issued =
        workbook
            .sheet_containing(ISSUED_SHEET_FRAGMENT)
            .ok_or_else(|| SheetError::MissingSheet {
                name: ISSUED_SHEET_FRAGMENT.to_string(),
            })?;
    let rates =
        workbook
            .sheet_containing(RATES_SHEET_FRAGMENT)
            .ok_or_else(|| SheetError::MissingSheet {
                name: RATES_SHEET_FRAGMENT.to_string(),
            })?;

    // keyword rows are shared across periods; resolve them once
    let mut entry_rows = Vec::new();
    for entry in spec.catalog.entries() {
        match locate::find_row(issued, entry.label) {
            Some(row) => entry_rows.push((entry, row)),
            None => debug!(keyword = entry.label, "series row absent from issued sheet"),
        }
    }

    let mut values = Vec::new();
    for col in 1..issued.width() {
        let Some(token) = issued.cell(PERIOD_ROW, col).text() else {
            continue;
        };
        let Some(period) = decode_period(token) else {
            continue;
        };
        let (rate_national, rate_foreign) = period_rates(rates, token);

        for &(entry, row) in &entry_rows {
            let Some(currency) = entry.currency else {
                continue;
            };
            let offset = match currency {
                Currency::National => NATIONAL_OFFSET,
                Currency::Foreign => FOREIGN_OFFSET,
            };
            // unpublished cells yield no record
            let Some(value) = issued.cell(row, col + offset).to_number() else {
                continue;
            };
            let rate = match currency {
                Currency::National => rate_national,
                Currency::Foreign => rate_foreign,
            };
            values.push(ExtractedValue {
                type_code: entry.code,
                description: entry.description.to_string(),
                period,
                value: round2(value),
                rate,
            });
        }
    }
    Ok(values)
}

/// Period tokens are compared after trimming and dropping footnote stars, so
/// "12.24*" on one sheet still finds "12.24" on the other.
fn clean_token(token: &str) -> String {
    token.trim().replace('*', "")
}

/// (national, foreign) rate pair for one period token. The currency label
/// over the matched column decides which of the two adjacent rate cells is
/// which; without a label the pair reads foreign-first.
fn period_rates(rates: &SheetTable, token: &str) -> (Option<f64>, Option<f64>) {
    let needle = clean_token(token);
    let matched = (0..rates.width()).find(|&col| {
        rates
            .cell(RATES_PERIOD_ROW, col)
            .text()
            .is_some_and(|text| clean_token(text) == needle)
    });
    let Some(col) = matched else {
        return (None, None);
    };

    let first = rates.cell(RATES_VALUE_ROW, col).to_number();
    let second = rates.cell(RATES_VALUE_ROW, col + 1).to_number();
    let national_first = rates
        .cell(RATES_CURRENCY_ROW, col)
        .text()
        .is_some_and(|label| label.to_lowercase().contains("нац"));
    if national_first {
        (first, second)
    } else {
        (second, first)
    }
}
