// src/sheet/mod.rs
pub mod headers;
pub mod locate;

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use thiserror::Error;

/// Structural problems with a workbook or sheet. Any of these means the
/// document's layout is not the one the pipeline was built for, and the
/// whole document is skipped.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("failed to open workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("worksheet {name:?} not found")]
    MissingSheet { name: String },
    #[error("header row {index} out of range for a sheet of {height} rows")]
    HeaderRowOutOfRange { index: usize, height: usize },
    #[error("no row whose leading cell contains {keyword:?}")]
    RowNotFound { keyword: String },
}

/// One cell as the engine sees it. Calamine's cell types are collapsed at
/// ingest; text is trimmed and whitespace-only text becomes `Empty`, which is
/// what forward-fill and keyword matching expect from merged-cell layouts.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(trimmed.to_string())
                }
            }
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.trim().to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Text content, for label matching. Numbers are not labels.
    pub fn text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The cell rendered for use inside a composite header label.
    pub fn render(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            Cell::Number(n) => Some(n.to_string()),
        }
    }

    /// Numeric content. Text cells are parsed after stripping digit-group
    /// spaces (regular and non-breaking) and turning a decimal comma into a
    /// dot, which is how the reports format numbers. Placeholder text such
    /// as "-" simply fails to parse and reads as `None`.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => {
                let cleaned: String = s
                    .chars()
                    .filter(|c| *c != ' ' && *c != '\u{a0}')
                    .map(|c| if c == ',' { '.' } else { c })
                    .collect();
                cleaned.parse().ok()
            }
            Cell::Empty => None,
        }
    }
}

/// A dense grid over one worksheet, indexed by absolute row/column. Calamine
/// trims its ranges to the used area, so the grid is padded back out to the
/// sheet origin; the fixed header positions the layouts promise then stay
/// valid even when a report starts with blank rows.
#[derive(Debug, Clone)]
pub struct SheetTable {
    name: String,
    rows: Vec<Vec<Cell>>,
}

impl SheetTable {
    pub fn from_range(name: &str, range: &Range<Data>) -> Self {
        let (start_row, start_col) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));
        let height = start_row + range.height();
        let width = start_col + range.width();
        let mut rows = vec![vec![Cell::Empty; width]; height];
        for (r, cells) in range.rows().enumerate() {
            for (c, data) in cells.iter().enumerate() {
                rows[start_row + r][start_col + c] = Cell::from_data(data);
            }
        }
        SheetTable {
            name: name.to_string(),
            rows,
        }
    }

    /// Build a table straight from cell rows (fixtures, mostly).
    pub fn from_rows(name: &str, rows: Vec<Vec<Cell>>) -> Self {
        SheetTable {
            name: name.to_string(),
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(|row| row.len()).max().unwrap_or(0)
    }

    /// Cell at (row, col); anything out of range reads as empty, the same as
    /// a blank cell inside the used area.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&EMPTY_CELL)
    }
}

/// All worksheets of one report, materialized up front.
pub struct Workbook {
    sheets: Vec<SheetTable>,
}

impl Workbook {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SheetError> {
        let mut reader = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        let names = reader.sheet_names().to_vec();
        let mut sheets = Vec::with_capacity(names.len());
        for name in names {
            let range = reader.worksheet_range(&name)?;
            sheets.push(SheetTable::from_range(&name, &range));
        }
        Ok(Workbook { sheets })
    }

    pub fn from_sheets(sheets: Vec<SheetTable>) -> Self {
        Workbook { sheets }
    }

    /// Sheet by exact name, for layouts where the name is stable.
    pub fn sheet(&self, name: &str) -> Option<&SheetTable> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    /// First sheet whose name contains `fragment`, case-insensitively.
    /// Editions rename sheets slightly ("Выдано", "выдано за месяц"), so the
    /// total-lending layout matches by fragment.
    pub fn sheet_containing(&self, fragment: &str) -> Option<&SheetTable> {
        let needle = fragment.to_lowercase();
        self.sheets
            .iter()
            .find(|sheet| sheet.name.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_numbers_are_cleaned_before_parsing() {
        assert_eq!(Cell::Text("1 234,5".into()).to_number(), Some(1234.5));
        assert_eq!(Cell::Text("12\u{a0}500".into()).to_number(), Some(12500.0));
        assert_eq!(Cell::Text("7,25".into()).to_number(), Some(7.25));
        assert_eq!(Cell::Number(42.0).to_number(), Some(42.0));
    }

    #[test]
    fn placeholders_do_not_parse() {
        assert_eq!(Cell::Text("-".into()).to_number(), None);
        assert_eq!(Cell::Text("x".into()).to_number(), None);
        assert_eq!(Cell::Empty.to_number(), None);
    }

    #[test]
    fn render_drops_float_artifacts_from_integers() {
        assert_eq!(Cell::Number(2024.0).render(), Some("2024".into()));
        assert_eq!(Cell::Number(7.5).render(), Some("7.5".into()));
        assert_eq!(Cell::Empty.render(), None);
    }

    #[test]
    fn out_of_range_reads_as_empty() {
        let sheet = SheetTable::from_rows("s", vec![vec![Cell::Text("a".into())]]);
        assert!(sheet.cell(0, 5).is_empty());
        assert!(sheet.cell(9, 0).is_empty());
        assert_eq!(sheet.cell(0, 0).text(), Some("a"));
    }

    #[test]
    fn ragged_fixture_rows_report_the_widest_width() {
        let sheet = SheetTable::from_rows(
            "s",
            vec![vec![], vec![Cell::Empty, Cell::Empty, Cell::Text("x".into())]],
        );
        assert_eq!(sheet.width(), 3);
        assert_eq!(sheet.height(), 2);
    }

    #[test]
    fn ranges_are_padded_back_to_the_sheet_origin() {
        // Used area starting at (4, 1): the grid must still address it
        // at the absolute position.
        let mut range: Range<Data> = Range::new((4, 1), (5, 2));
        range.set_value((4, 1), Data::String("за январь 2024".into()));
        range.set_value((5, 2), Data::Float(10.5));
        let sheet = SheetTable::from_range("Выдано", &range);
        assert_eq!(sheet.height(), 6);
        assert_eq!(sheet.width(), 3);
        assert_eq!(sheet.cell(4, 1).text(), Some("за январь 2024"));
        assert_eq!(sheet.cell(5, 2).to_number(), Some(10.5));
        assert!(sheet.cell(0, 0).is_empty());
    }

    #[test]
    fn sheet_lookup_by_fragment_is_case_insensitive() {
        let workbook = Workbook::from_sheets(vec![
            SheetTable::from_rows("Ставки КВ", vec![]),
            SheetTable::from_rows("Выдано за месяц", vec![]),
        ]);
        assert_eq!(
            workbook.sheet_containing("выдано").map(|s| s.name()),
            Some("Выдано за месяц")
        );
        assert_eq!(
            workbook.sheet_containing("ставк").map(|s| s.name()),
            Some("Ставки КВ")
        );
        assert!(workbook.sheet("Выдано").is_none());
        assert!(workbook.sheet_containing("баланс").is_none());
    }
}
