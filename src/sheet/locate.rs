// src/sheet/locate.rs
//! Keyword location. The reports shuffle rows between editions, so values
//! are found by matching a phrase against the leading labels instead of
//! trusting fixed coordinates. First match wins: the canonical row sits
//! before any repeated or footnote occurrence of the same phrase.

use super::SheetTable;

/// First row whose leading (column 0) cell contains `phrase`,
/// case-insensitively.
pub fn find_row(sheet: &SheetTable, phrase: &str) -> Option<usize> {
    let needle = phrase.to_lowercase();
    (0..sheet.height()).find(|&row| {
        sheet
            .cell(row, 0)
            .text()
            .map(|label| label.to_lowercase().contains(&needle))
            .unwrap_or(false)
    })
}

/// First column in `row` whose cell contains `phrase`, case-insensitively.
pub fn find_col(sheet: &SheetTable, row: usize, phrase: &str) -> Option<usize> {
    let needle = phrase.to_lowercase();
    (0..sheet.width()).find(|&col| {
        sheet
            .cell(row, col)
            .text()
            .map(|label| label.to_lowercase().contains(&needle))
            .unwrap_or(false)
    })
}
