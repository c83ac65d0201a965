//! Signed amount parsing and the content predicates built on it
//!
//! Parsing never fails: anything that is not a recognisable number reads as
//! zero. Use [`AmountParser::try_parse`] to tell a real zero from garbage.

use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::config::IngestConfig;
use crate::dates::DateParser;
use crate::grid::RawCell;

/// Currency symbols stripped before parsing
const CURRENCY_SYMBOLS: [char; 5] = ['$', '£', '€', '¥', '₹'];

/// Cell → signed decimal parser
#[derive(Debug, Clone)]
pub struct AmountParser {
    amount_threshold: f64,
    description_threshold: f64,
    sample_limit: usize,
}

impl Default for AmountParser {
    fn default() -> Self {
        Self {
            amount_threshold: 0.8,
            description_threshold: 0.6,
            sample_limit: 10,
        }
    }
}

impl AmountParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            amount_threshold: config.detection.amount_threshold,
            description_threshold: config.detection.description_threshold,
            sample_limit: config.detection.sample_rows,
        }
    }

    /// Parse a cell, reading unparseable input as zero
    pub fn parse(&self, cell: &RawCell) -> Decimal {
        self.try_parse(cell).unwrap_or(Decimal::ZERO)
    }

    pub fn try_parse(&self, cell: &RawCell) -> Option<Decimal> {
        match cell {
            RawCell::Number(n) if n.is_finite() => Decimal::from_f64(*n),
            RawCell::Text(text) => parse_amount_text(text),
            RawCell::Number(_) | RawCell::Empty | RawCell::Date(_) => None,
        }
    }

    pub fn looks_like_amount(&self, cell: &RawCell) -> bool {
        self.try_parse(cell).is_some()
    }

    /// Free text longer than five characters that is neither a date nor a number
    pub fn looks_like_description(&self, cell: &RawCell, dates: &DateParser) -> bool {
        let Some(text) = cell.as_text() else {
            return false;
        };
        text.chars().count() > 5
            && text.chars().any(char::is_alphabetic)
            && !dates.looks_like_date(cell)
            && parse_amount_text(text).is_none()
    }

    pub fn is_likely_amount_column<'a, I>(&self, samples: I) -> bool
    where
        I: IntoIterator<Item = &'a RawCell>,
    {
        self.ratio(samples, |cell| self.looks_like_amount(cell)) >= self.amount_threshold
    }

    pub fn is_likely_description_column<'a, I>(&self, samples: I, dates: &DateParser) -> bool
    where
        I: IntoIterator<Item = &'a RawCell>,
    {
        self.ratio(samples, |cell| self.looks_like_description(cell, dates))
            >= self.description_threshold
    }

    /// Share of the bounded non-empty sample accepted by `pred` (0 when empty)
    fn ratio<'a, I, F>(&self, samples: I, pred: F) -> f64
    where
        I: IntoIterator<Item = &'a RawCell>,
        F: Fn(&RawCell) -> bool,
    {
        let (total, hits) = samples
            .into_iter()
            .filter(|c| !c.is_empty())
            .take(self.sample_limit)
            .fold((0usize, 0usize), |(total, hits), cell| {
                (total + 1, hits + usize::from(pred(cell)))
            });

        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Parse bank-formatted amount text
///
/// Handles `$1,234.56`, `-$50.00`, `(75.00)`, `+12` and trailing-minus
/// exports like `50.00-`. Whitespace anywhere is ignored.
pub fn parse_amount_text(text: &str) -> Option<Decimal> {
    let mut s: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && !CURRENCY_SYMBOLS.contains(c))
        .collect();

    if s.is_empty() {
        return None;
    }

    let mut negative = false;

    // Accounting notation
    let parenthesized = s.len() >= 2 && s.starts_with('(') && s.ends_with(')');
    if parenthesized {
        s = s[1..s.len() - 1].to_string();
    }

    if let Some(rest) = s.strip_suffix('-') {
        negative = !negative;
        s = rest.to_string();
    }
    if let Some(rest) = s.strip_prefix('-') {
        negative = !negative;
        s = rest.to_string();
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest.to_string();
    }

    if !is_plain_decimal(&s) {
        return None;
    }

    if s.starts_with('.') {
        s.insert(0, '0');
    }

    let value = Decimal::from_str(&s).ok()?;
    if parenthesized {
        Some(-value.abs())
    } else if negative {
        Some(-value)
    } else {
        Some(value)
    }
}

/// Digits with at most one decimal point and at least one digit
fn is_plain_decimal(s: &str) -> bool {
    let mut dots = 0;
    let mut digits = 0;
    for c in s.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1 && !s.ends_with('.')
}
