//! Calendar date parsing for raw statement cells
//!
//! Resolution order, first success wins:
//! 1. Cells already typed as dates
//! 2. Machine formats (RFC 3339, RFC 2822, ISO date-times), year must exceed `min_year`
//! 3. The ordered signature table (`FORMAT_TABLE`)
//! 4. Delimiter guessing over numeric fragments
//! 5. Excel serial day counts for numeric cells
//! 6. Today's date (reported as a fallback by the caller)
//!
//! Shapes that cannot tell day from month (`01/02/2024`) are read in the
//! configured [`DateOrder`]; the other reading is only used when the preferred
//! one is not a real date.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Days, Local, NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};

use crate::config::{DateConfig, DateOrder, IngestConfig};
use crate::grid::RawCell;

/// Serial of 1970-01-01 in the 1900 date system
const SERIAL_1970: f64 = 25_569.0;

/// Serial of 2100-01-01 in the 1900 date system
const SERIAL_2100: f64 = 73_051.0;

/// Numeric cells holding a compact yyyymmdd date
const COMPACT_MIN: f64 = 19_000_101.0;
const COMPACT_MAX: f64 = 21_001_231.0;

/// Known date encodings, checked top to bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// 2024-01-15T10:30 (any trailing time/zone)
    IsoDateTime,
    /// 20240115
    Compact,
    /// 2024-01-15
    YmdDash,
    /// 2024/01/15
    YmdSlash,
    /// 2024.01.15
    YmdDot,
    /// 01/15/2024 or 15/01/2024
    SlashNumeric,
    /// 01-15-2024 or 15-01-2024
    DashNumeric,
    /// 15.01.2024
    DmyDot,
    /// 01/15/24 or 15/01/24
    ShortYear,
    /// 15 Jan 2024, 15-Jan-2024, 15th January, 2024
    DayMonthName,
    /// Jan 15, 2024, January 15th 2024
    MonthNameDay,
    /// 2024-Jan-15
    YearMonthNameDay,
    /// 45306 (days since 1899-12-30)
    ExcelSerial,
    /// 2024-01 (first of month)
    YearMonth,
    /// 01/2024 (first of month)
    MonthYear,
}

pub const FORMAT_TABLE: [DateFormat; 15] = [
    DateFormat::IsoDateTime,
    DateFormat::Compact,
    DateFormat::YmdDash,
    DateFormat::YmdSlash,
    DateFormat::YmdDot,
    DateFormat::SlashNumeric,
    DateFormat::DashNumeric,
    DateFormat::DmyDot,
    DateFormat::ShortYear,
    DateFormat::DayMonthName,
    DateFormat::MonthNameDay,
    DateFormat::YearMonthNameDay,
    DateFormat::ExcelSerial,
    DateFormat::YearMonth,
    DateFormat::MonthYear,
];

impl DateFormat {
    pub fn name(&self) -> &'static str {
        match self {
            Self::IsoDateTime => "iso_datetime",
            Self::Compact => "yyyymmdd",
            Self::YmdDash => "yyyy-mm-dd",
            Self::YmdSlash => "yyyy/mm/dd",
            Self::YmdDot => "yyyy.mm.dd",
            Self::SlashNumeric => "mm/dd/yyyy",
            Self::DashNumeric => "mm-dd-yyyy",
            Self::DmyDot => "dd.mm.yyyy",
            Self::ShortYear => "mm/dd/yy",
            Self::DayMonthName => "dd mon yyyy",
            Self::MonthNameDay => "mon dd, yyyy",
            Self::YearMonthNameDay => "yyyy-mon-dd",
            Self::ExcelSerial => "excel_serial",
            Self::YearMonth => "yyyy-mm",
            Self::MonthYear => "mm/yyyy",
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            Self::IsoDateTime => r"^(\d{4})-(\d{2})-(\d{2})[T ]\d{2}:\d{2}",
            Self::Compact => r"^(\d{4})(\d{2})(\d{2})$",
            Self::YmdDash => r"^(\d{4})-(\d{1,2})-(\d{1,2})$",
            Self::YmdSlash => r"^(\d{4})/(\d{1,2})/(\d{1,2})$",
            Self::YmdDot => r"^(\d{4})\.(\d{1,2})\.(\d{1,2})$",
            Self::SlashNumeric => r"^(\d{1,2})/(\d{1,2})/(\d{4})$",
            Self::DashNumeric => r"^(\d{1,2})-(\d{1,2})-(\d{4})$",
            Self::DmyDot => r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$",
            Self::ShortYear => r"^(\d{1,2})[/-](\d{1,2})[/-](\d{2})$",
            Self::DayMonthName => {
                r"(?i)^(\d{1,2})(?:st|nd|rd|th)?[\s\-]+([a-z]{3,9})\.?,?[\s\-]+(\d{4})$"
            }
            Self::MonthNameDay => {
                r"(?i)^([a-z]{3,9})\.?[\s\-]+(\d{1,2})(?:st|nd|rd|th)?,?[\s\-]+(\d{4})$"
            }
            Self::YearMonthNameDay => r"(?i)^(\d{4})[\s\-]([a-z]{3,9})\.?[\s\-](\d{1,2})$",
            Self::ExcelSerial => r"^(\d{5})(?:\.\d+)?$",
            Self::YearMonth => r"^(\d{4})[-/](\d{1,2})$",
            Self::MonthYear => r"^(\d{1,2})/(\d{4})$",
        }
    }
}

fn signatures() -> &'static [(DateFormat, Regex)] {
    static SIGNATURES: OnceLock<Vec<(DateFormat, Regex)>> = OnceLock::new();
    SIGNATURES.get_or_init(|| {
        FORMAT_TABLE
            .iter()
            .map(|format| (*format, Regex::new(format.pattern()).expect("valid regex")))
            .collect()
    })
}

/// First signature in the table matching `text`
pub fn match_signature(text: &str) -> Option<DateFormat> {
    let text = text.trim();
    signatures()
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(format, _)| *format)
}

/// Convert an Excel serial day count (1900 date system) to a date
///
/// Day zero is 1899-12-30 rather than 1900-01-01: two days absorb Excel's
/// phantom 1900-02-29 and its 1-based counting.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_days(Days::new(serial.floor() as u64))
}

/// Month number from an English month name or abbreviation
fn month_from_name(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];

    let name = name.trim().trim_end_matches('.').to_lowercase();
    if name.len() < 3 {
        return None;
    }
    if name == "sept" {
        return Some(9);
    }
    MONTHS
        .iter()
        .position(|m| m.starts_with(name.as_str()))
        .map(|i| i as u32 + 1)
}

fn num<T: std::str::FromStr>(caps: &Captures<'_>, i: usize) -> Option<T> {
    caps.get(i)?.as_str().parse().ok()
}

/// Cell → calendar date parser
#[derive(Debug, Clone)]
pub struct DateParser {
    config: DateConfig,
    today: NaiveDate,
    threshold: f64,
    sample_limit: usize,
}

impl DateParser {
    pub fn new(config: DateConfig) -> Self {
        Self {
            config,
            today: Local::now().date_naive(),
            threshold: 0.7,
            sample_limit: 10,
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            threshold: config.detection.date_threshold,
            sample_limit: config.detection.sample_rows,
            ..Self::new(config.dates)
        }
    }

    /// Pin the fallback date (tests, reproducible runs)
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Parse a cell, falling back to today's date
    pub fn parse(&self, cell: &RawCell) -> NaiveDate {
        self.try_parse(cell).unwrap_or(self.today)
    }

    /// Parse a cell; `None` means the fallback would be taken
    pub fn try_parse(&self, cell: &RawCell) -> Option<NaiveDate> {
        match cell {
            RawCell::Empty => None,
            RawCell::Date(date) => Some(*date).filter(|d| self.in_year_range(d.year())),
            RawCell::Number(n) => self.from_number(*n),
            RawCell::Text(text) => self.parse_text(text.trim()),
        }
    }

    fn parse_text(&self, text: &str) -> Option<NaiveDate> {
        if text.is_empty() {
            return None;
        }

        if let Some(date) = direct_parse(text).filter(|d| d.year() > self.config.min_year) {
            return Some(date);
        }

        if let Some(date) = self.from_signature(text) {
            return Some(date);
        }

        self.guess_from_fragments(text)
    }

    fn from_signature(&self, text: &str) -> Option<NaiveDate> {
        let (format, re) = signatures().iter().find(|(_, re)| re.is_match(text))?;
        let caps = re.captures(text)?;

        match format {
            DateFormat::IsoDateTime
            | DateFormat::Compact
            | DateFormat::YmdDash
            | DateFormat::YmdSlash
            | DateFormat::YmdDot => self.ymd(num(&caps, 1)?, num(&caps, 2)?, num(&caps, 3)?),
            DateFormat::SlashNumeric | DateFormat::DashNumeric => {
                self.ambiguous(num(&caps, 1)?, num(&caps, 2)?, num(&caps, 3)?)
            }
            DateFormat::DmyDot => self.ymd(num(&caps, 3)?, num(&caps, 2)?, num(&caps, 1)?),
            DateFormat::ShortYear => {
                let yy: i32 = num(&caps, 3)?;
                let year = if yy < 70 { 2000 + yy } else { 1900 + yy };
                self.ambiguous(num(&caps, 1)?, num(&caps, 2)?, year)
            }
            DateFormat::DayMonthName => {
                let month = month_from_name(caps.get(2)?.as_str())?;
                self.ymd(num(&caps, 3)?, month, num(&caps, 1)?)
            }
            DateFormat::MonthNameDay => {
                let month = month_from_name(caps.get(1)?.as_str())?;
                self.ymd(num(&caps, 3)?, month, num(&caps, 2)?)
            }
            DateFormat::YearMonthNameDay => {
                let month = month_from_name(caps.get(2)?.as_str())?;
                self.ymd(num(&caps, 1)?, month, num(&caps, 3)?)
            }
            DateFormat::ExcelSerial => {
                let serial: f64 = text.parse().ok()?;
                excel_serial_to_date(serial).filter(|d| self.in_year_range(d.year()))
            }
            DateFormat::YearMonth => self.ymd(num(&caps, 1)?, num(&caps, 2)?, 1),
            DateFormat::MonthYear => self.ymd(num(&caps, 2)?, num(&caps, 1)?, 1),
        }
    }

    /// Split on `/ - .` and whitespace and try year-month-day assignments
    fn guess_from_fragments(&self, text: &str) -> Option<NaiveDate> {
        let fragments: Vec<u32> = text
            .split(|c: char| matches!(c, '/' | '-' | '.') || c.is_whitespace())
            .filter(|f| !f.is_empty() && f.chars().all(|c| c.is_ascii_digit()))
            .filter_map(|f| f.parse().ok())
            .collect();

        if fragments.len() < 3 {
            return None;
        }
        let (a, b, c) = (fragments[0], fragments[1], fragments[2]);

        self.ymd(a as i32, b, c)
            .or_else(|| self.ambiguous(a, b, c as i32))
    }

    fn from_number(&self, n: f64) -> Option<NaiveDate> {
        if !n.is_finite() || n < 1.0 {
            return None;
        }
        if n.fract() == 0.0 && (COMPACT_MIN..=COMPACT_MAX).contains(&n) {
            let v = n as u32;
            if let Some(date) = self.ymd((v / 10_000) as i32, (v / 100) % 100, v % 100) {
                return Some(date);
            }
        }
        excel_serial_to_date(n).filter(|d| self.in_year_range(d.year()))
    }

    /// Read `first/second/year` in the configured order, falling back to the other
    fn ambiguous(&self, first: u32, second: u32, year: i32) -> Option<NaiveDate> {
        match self.config.ambiguous_order {
            DateOrder::MonthFirst => self
                .ymd(year, first, second)
                .or_else(|| self.ymd(year, second, first)),
            DateOrder::DayFirst => self
                .ymd(year, second, first)
                .or_else(|| self.ymd(year, first, second)),
        }
    }

    fn ymd(&self, year: i32, month: u32, day: u32) -> Option<NaiveDate> {
        if !self.in_year_range(year) || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, day)
    }

    fn in_year_range(&self, year: i32) -> bool {
        (self.config.min_year..=self.config.max_year).contains(&year)
    }

    /// Whether a single sampled cell looks like a date
    pub fn looks_like_date(&self, cell: &RawCell) -> bool {
        match cell {
            RawCell::Empty => false,
            RawCell::Date(_) => true,
            RawCell::Number(n) => {
                n.fract() == 0.0
                    && ((SERIAL_1970..SERIAL_2100).contains(n)
                        || ((COMPACT_MIN..=COMPACT_MAX).contains(n)
                            && self.from_number(*n).is_some()))
            }
            RawCell::Text(text) => {
                match_signature(text).is_some()
                    || self
                        .try_parse(cell)
                        .map(|d| self.in_year_range(d.year()))
                        .unwrap_or(false)
            }
        }
    }

    /// True when enough of a bounded, non-empty sample looks like dates
    pub fn is_likely_date_column<'a, I>(&self, samples: I) -> bool
    where
        I: IntoIterator<Item = &'a RawCell>,
    {
        let (total, hits) = samples
            .into_iter()
            .filter(|c| !c.is_empty())
            .take(self.sample_limit)
            .fold((0usize, 0usize), |(total, hits), cell| {
                (total + 1, hits + usize::from(self.looks_like_date(cell)))
            });

        total > 0 && hits as f64 / total as f64 >= self.threshold
    }
}

impl Default for DateParser {
    fn default() -> Self {
        Self::new(DateConfig::default())
    }
}

/// Locale-agnostic machine formats
fn direct_parse(text: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}
