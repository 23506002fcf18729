// src/sheet/headers.rs
//! Header reconstruction for merged-cell layouts.
//!
//! The reports spread one logical column header over several physical rows
//! (period, category, currency), and merged cells arrive as a value followed
//! by blanks. Forward-filling each header row and stacking the parts
//! recovers a dense semantic label for every column.

use super::{SheetError, SheetTable};

/// Forward-fill one header row: a blank cell inherits the nearest non-blank
/// value to its left, and the last value extends to `width`, since a merged
/// header cell covers all the columns to its right.
pub fn forward_fill(sheet: &SheetTable, row: usize, width: usize) -> Vec<Option<String>> {
    let mut filled = Vec::with_capacity(width);
    let mut last: Option<String> = None;
    for col in 0..width {
        if let Some(text) = sheet.cell(row, col).render() {
            last = Some(text);
        }
        filled.push(last.clone());
    }
    filled
}

/// Compose one label per column from the given header rows. The first row is
/// the period part; the remaining parts join with single spaces after a
/// `" | "` separator, so three rows give `"P | C U"` and two give `"P | M"`.
/// A column where any constituent row is still blank after the fill gets
/// `None`. A header row index past the end of the sheet fails the whole
/// sheet: that layout is not the one this pipeline understands.
pub fn compose_labels(
    sheet: &SheetTable,
    header_rows: &[usize],
) -> Result<Vec<Option<String>>, SheetError> {
    for &row in header_rows {
        if row >= sheet.height() {
            return Err(SheetError::HeaderRowOutOfRange {
                index: row,
                height: sheet.height(),
            });
        }
    }

    let width = sheet.width();
    let filled: Vec<Vec<Option<String>>> = header_rows
        .iter()
        .map(|&row| forward_fill(sheet, row, width))
        .collect();

    let mut labels = Vec::with_capacity(width);
    for col in 0..width {
        let parts: Option<Vec<&str>> = filled.iter().map(|row| row[col].as_deref()).collect();
        labels.push(parts.and_then(|parts| {
            parts.split_first().map(|(period, rest)| {
                if rest.is_empty() {
                    (*period).to_string()
                } else {
                    format!("{} | {}", period, rest.join(" "))
                }
            })
        }));
    }
    Ok(labels)
}
