//! Raw tabular data as handed over by a decoder
//!
//! A grid is a header row plus data rows of loosely typed cells. Rows are
//! positionally aligned to the header; a short row reads as if its missing
//! trailing cells were empty.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single undecoded cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum RawCell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    /// Calendar date already typed by the source (spreadsheet date cells)
    Date(NaiveDate),
}

static EMPTY: RawCell = RawCell::Empty;

impl RawCell {
    /// Build a text cell, collapsing whitespace-only input to `Empty`
    pub fn text(s: impl AsRef<str>) -> Self {
        let trimmed = s.as_ref().trim();
        if trimmed.is_empty() {
            Self::Empty
        } else {
            Self::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(n) => n.is_nan(),
            Self::Date(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Human-readable rendering, used for descriptions, accounts and failure reports
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

impl From<&str> for RawCell {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<f64> for RawCell {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// Header row plus data rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGrid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
}

impl RawGrid {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<RawCell>>) -> Self {
        Self { headers, rows }
    }

    /// Cell at (row, column); missing trailing cells read as `Empty`
    pub fn cell(&self, row: usize, column: usize) -> &RawCell {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY)
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// True when the header row has no non-blank names
    pub fn has_headers(&self) -> bool {
        self.headers.iter().any(|h| !h.trim().is_empty())
    }
}

/// Cell at `column` of `row`, treating short rows as having empty trailing cells
pub fn cell_at(row: &[RawCell], column: usize) -> &RawCell {
    row.get(column).unwrap_or(&EMPTY)
}

/// True when every cell of the row is empty
pub fn is_blank_row(row: &[RawCell]) -> bool {
    row.iter().all(RawCell::is_empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_collapses_blank() {
        assert_eq!(RawCell::text("   "), RawCell::Empty);
        assert_eq!(RawCell::text(" abc "), RawCell::Text("abc".to_string()));
    }

    #[test]
    fn test_short_rows_read_as_empty() {
        let grid = RawGrid::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec![RawCell::from("x")]],
        );
        assert_eq!(grid.cell(0, 0), &RawCell::from("x"));
        assert_eq!(grid.cell(0, 2), &RawCell::Empty);
        assert_eq!(grid.cell(5, 0), &RawCell::Empty);
    }

    #[test]
    fn test_blank_row() {
        assert!(is_blank_row(&[RawCell::Empty, RawCell::text(" ")]));
        assert!(!is_blank_row(&[RawCell::Empty, RawCell::Number(0.0)]));
        assert!(is_blank_row(&[]));
    }

    #[test]
    fn test_display() {
        assert_eq!(RawCell::Number(1234.0).display(), "1234");
        assert_eq!(RawCell::Number(12.5).display(), "12.5");
        assert_eq!(
            RawCell::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()).display(),
            "2024-01-15"
        );
    }

    #[test]
    fn test_has_headers() {
        assert!(!RawGrid::new(vec![], vec![]).has_headers());
        assert!(!RawGrid::new(vec![" ".into(), "".into()], vec![]).has_headers());
        assert!(RawGrid::new(vec!["Date".into()], vec![]).has_headers());
    }
}
