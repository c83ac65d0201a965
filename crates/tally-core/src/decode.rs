//! Tabular decoding: file bytes → [`RawGrid`]
//!
//! CSV goes through the `csv` crate with delimiter sniffing; spreadsheets go
//! through `calamine` and only the first sheet is read. In both cases leading
//! blank rows are dropped and the first non-blank row is the header.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use tracing::debug;

use crate::dates::excel_serial_to_date;
use crate::error::DecodeError;
use crate::grid::{is_blank_row, RawCell, RawGrid};

/// Container family a file is decoded as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Spreadsheet,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Spreadsheet => "spreadsheet",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" | "tsv" | "txt" => Some(Self::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(Self::Spreadsheet),
            _ => None,
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        // Drop parameters such as "; charset=utf-8"
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "text/csv"
            | "application/csv"
            | "text/comma-separated-values"
            | "text/tab-separated-values"
            | "text/plain" => Some(Self::Csv),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.ms-excel"
            | "application/vnd.ms-excel.sheet.macroenabled.12"
            | "application/vnd.ms-excel.sheet.binary.macroenabled.12"
            | "application/vnd.oasis.opendocument.spreadsheet" => Some(Self::Spreadsheet),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Turns raw file bytes into a header row plus data rows
pub trait TabularDecoder {
    fn decode(&self, bytes: &[u8], kind: FileKind) -> Result<RawGrid, DecodeError>;
}

/// Default decoder backed by `csv` and `calamine`
#[derive(Debug, Clone, Copy, Default)]
pub struct GridDecoder;

impl TabularDecoder for GridDecoder {
    fn decode(&self, bytes: &[u8], kind: FileKind) -> Result<RawGrid, DecodeError> {
        match kind {
            FileKind::Csv => decode_csv(bytes),
            FileKind::Spreadsheet => decode_spreadsheet(bytes),
        }
    }
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Candidate field delimiters, in tie-break order
const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

fn decode_csv(bytes: &[u8]) -> Result<RawGrid, DecodeError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let delimiter = sniff_delimiter(bytes);
    debug!(delimiter = %(delimiter as char).escape_default(), "Decoding CSV");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        let row: Vec<RawCell> = record
            .iter()
            .map(|field| RawCell::text(String::from_utf8_lossy(field)))
            .collect();
        rows.push(row);
    }

    Ok(split_header(rows))
}

/// Pick the delimiter that appears most often (outside quotes) in the first
/// few non-blank lines
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let sample = String::from_utf8_lossy(&bytes[..bytes.len().min(8 * 1024)]);
    let lines: Vec<&str> = sample
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(5)
        .collect();

    let mut best = (b',', 0usize);
    for delimiter in DELIMITERS {
        let count: usize = lines
            .iter()
            .map(|line| count_unquoted(line, delimiter as char))
            .sum();
        if count > best.1 {
            best = (delimiter, count);
        }
    }
    best.0
}

fn count_unquoted(line: &str, delimiter: char) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for c in line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

fn decode_spreadsheet(bytes: &[u8]) -> Result<RawGrid, DecodeError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DecodeError::NoSheets)??;

    debug!(rows = range.height(), columns = range.width(), "Decoding first sheet");

    let rows = range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    Ok(split_header(rows))
}

/// Map a calamine cell onto the loosely typed grid cell
pub fn cell_from_data(data: &Data) -> RawCell {
    match data {
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Float(f) => RawCell::Number(*f),
        Data::String(s) => RawCell::text(s),
        Data::Bool(b) => RawCell::Text(b.to_string()),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            excel_serial_to_date(serial)
                .map(RawCell::Date)
                .unwrap_or(RawCell::Number(serial))
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::text(s),
        Data::Error(_) | Data::Empty => RawCell::Empty,
    }
}

/// Drop leading blank rows; the first remaining row becomes the header
fn split_header(rows: Vec<Vec<RawCell>>) -> RawGrid {
    let mut rows = rows.into_iter().skip_while(|r| is_blank_row(r));
    let headers = match rows.next() {
        Some(header) => header.iter().map(RawCell::display).collect(),
        None => return RawGrid::default(),
    };
    RawGrid::new(headers, rows.collect())
}
