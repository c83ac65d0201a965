//! Row materialization: classified grid rows → transactions
//!
//! Every non-blank data row yields either a [`Transaction`] or a
//! [`RowFailure`]; a bad row never stops the rest of the batch.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::amounts::AmountParser;
use crate::classify::ColumnRoleMap;
use crate::config::IngestConfig;
use crate::dates::DateParser;
use crate::error::RowError;
use crate::grid::{cell_at, is_blank_row, RawCell};
use crate::models::{account_label, RowFailure, Transaction};

/// Typed value extraction for a single cell
pub trait CellExtractor {
    /// `Ok(None)` means the cell could not be read and the fallback date applies
    fn date(&self, cell: &RawCell) -> Result<Option<NaiveDate>, RowError>;

    /// `Ok(None)` means the cell could not be read and the amount falls back to zero
    fn amount(&self, cell: &RawCell) -> Result<Option<Decimal>, RowError>;

    /// Date used when there is no date column or the cell is unreadable
    fn fallback_date(&self) -> NaiveDate;
}

/// The date and amount parsers as a pair
#[derive(Debug, Clone, Default)]
pub struct ValueParsers {
    pub dates: DateParser,
    pub amounts: AmountParser,
}

impl ValueParsers {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            dates: DateParser::from_config(config),
            amounts: AmountParser::from_config(config),
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.dates = self.dates.with_today(today);
        self
    }
}

impl CellExtractor for ValueParsers {
    fn date(&self, cell: &RawCell) -> Result<Option<NaiveDate>, RowError> {
        Ok(self.dates.try_parse(cell))
    }

    fn amount(&self, cell: &RawCell) -> Result<Option<Decimal>, RowError> {
        Ok(self.amounts.try_parse(cell))
    }

    fn fallback_date(&self) -> NaiveDate {
        self.dates.today()
    }
}

/// Result of materializing one grid
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Materialized {
    pub transactions: Vec<Transaction>,
    pub failures: Vec<RowFailure>,
    /// Row numbers whose date cell could not be read
    pub fallback_dates: Vec<usize>,
    /// Row numbers whose amount cell could not be read (empty cells included)
    pub fallback_amounts: Vec<usize>,
}

/// A built transaction plus which of its values fell back
struct BuiltRow {
    transaction: Transaction,
    date_fell_back: bool,
    amount_fell_back: bool,
}

/// Build one transaction per non-blank row
///
/// Row numbers are 1-based over `rows` (blank rows still take a number).
pub fn materialize(
    roles: &ColumnRoleMap,
    headers: &[String],
    rows: &[Vec<RawCell>],
    source_file: &str,
    extractor: &dyn CellExtractor,
) -> Materialized {
    let account_default = account_label(source_file);
    let mut out = Materialized::default();

    for (index, row) in rows.iter().enumerate() {
        if is_blank_row(row) {
            continue;
        }
        let number = index + 1;

        match build_row(roles, row, number, source_file, &account_default, extractor) {
            Ok(built) => {
                if built.date_fell_back {
                    out.fallback_dates.push(number);
                }
                if built.amount_fell_back {
                    out.fallback_amounts.push(number);
                }
                out.transactions.push(built.transaction);
            }
            Err(e) => {
                debug!(row = number, error = %e, "Row skipped");
                let width = headers.len().max(row.len());
                out.failures.push(RowFailure {
                    row: number,
                    raw: (0..width).map(|c| cell_at(row, c).display()).collect(),
                    reason: e.to_string(),
                });
            }
        }
    }

    out
}

fn build_row(
    roles: &ColumnRoleMap,
    row: &[RawCell],
    number: usize,
    source_file: &str,
    account_default: &str,
    extractor: &dyn CellExtractor,
) -> Result<BuiltRow, RowError> {
    let (date, date_fell_back) = match roles.date {
        Some(column) => match extractor.date(cell_at(row, column))? {
            Some(date) => (date, false),
            None => (extractor.fallback_date(), true),
        },
        None => (extractor.fallback_date(), false),
    };

    let (amount, amount_fell_back) = match roles.amount {
        Some(column) => match extractor.amount(cell_at(row, column))? {
            Some(amount) => (amount, false),
            None => (Decimal::ZERO, true),
        },
        None => (Decimal::ZERO, false),
    };

    let description = text_or(roles.description.map(|c| cell_at(row, c)))
        .unwrap_or_else(|| format!("Transaction {}", number));
    let account = text_or(roles.account.map(|c| cell_at(row, c)))
        .unwrap_or_else(|| account_default.to_string());

    Ok(BuiltRow {
        transaction: Transaction::new(date, amount, description, account, source_file),
        date_fell_back,
        amount_fell_back,
    })
}

/// Displayed text of a cell, or `None` when there is no cell or it is blank
fn text_or(cell: Option<&RawCell>) -> Option<String> {
    cell.map(RawCell::display).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(cells: &[&str]) -> Vec<RawCell> {
        cells.iter().map(|c| RawCell::text(*c)).collect()
    }

    fn headers() -> Vec<String> {
        vec!["Date".into(), "Amount".into(), "Description".into()]
    }

    fn roles() -> ColumnRoleMap {
        ColumnRoleMap {
            date: Some(0),
            amount: Some(1),
            description: Some(2),
            account: None,
        }
    }

    fn parsers() -> ValueParsers {
        ValueParsers::default().with_today(ymd(2030, 6, 1))
    }

    /// Fails any row whose date or amount cell reads "corrupt"
    struct FailingExtractor(ValueParsers);

    impl CellExtractor for FailingExtractor {
        fn date(&self, cell: &RawCell) -> Result<Option<NaiveDate>, RowError> {
            if cell.as_text() == Some("corrupt") {
                return Err(RowError::Date("corrupt".into()));
            }
            self.0.date(cell)
        }

        fn amount(&self, cell: &RawCell) -> Result<Option<Decimal>, RowError> {
            if cell.as_text() == Some("corrupt") {
                return Err(RowError::Amount("corrupt".into()));
            }
            self.0.amount(cell)
        }

        fn fallback_date(&self) -> NaiveDate {
            self.0.fallback_date()
        }
    }

    #[test]
    fn test_blank_row_is_skipped() {
        let rows = vec![
            row(&["2024-01-01", "10.00", "Deposit one"]),
            row(&["2024-01-02", "-5.00", "Coffee"]),
            row(&["", "", ""]),
            row(&["2024-01-04", "-7.25", "Lunch"]),
            row(&["2024-01-05", "3.00", "Refund"]),
        ];

        let out = materialize(&roles(), &headers(), &rows, "checking.csv", &parsers());
        assert_eq!(out.transactions.len(), 4);
        assert!(out.failures.is_empty());
        assert_eq!(out.transactions[2].date, ymd(2024, 1, 4));
        assert_eq!(out.transactions[2].amount, Decimal::from_str("-7.25").unwrap());
    }

    #[test]
    fn test_row_failure_does_not_abort_batch() {
        let rows = vec![
            row(&["2024-01-01", "10.00", "Deposit one"]),
            row(&["corrupt", "-5.00", "Coffee"]),
            row(&["2024-01-03", "1.00", "Snack"]),
            row(&["2024-01-04", "-7.25", "Lunch"]),
            row(&["2024-01-05", "3.00", "Refund"]),
        ];

        let out = materialize(
            &roles(),
            &headers(),
            &rows,
            "checking.csv",
            &FailingExtractor(parsers()),
        );
        assert_eq!(out.transactions.len(), 4);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].row, 2);
        assert_eq!(out.failures[0].raw, vec!["corrupt", "-5.00", "Coffee"]);
        assert!(out.failures[0].reason.contains("corrupt"));
    }

    #[test]
    fn test_all_rows_failing_is_not_an_error() {
        let rows = vec![row(&["corrupt", "1", "a"]), row(&["corrupt", "2", "b"])];
        let out = materialize(&roles(), &headers(), &rows, "x.csv", &FailingExtractor(parsers()));
        assert!(out.transactions.is_empty());
        assert_eq!(out.failures.len(), 2);
    }

    #[test]
    fn test_defaults_for_missing_roles() {
        let roles = ColumnRoleMap {
            amount: Some(0),
            ..Default::default()
        };
        let rows = vec![row(&["12.00"]), vec![], row(&["(3.50)"])];

        let out = materialize(&roles, &["Amount".to_string()], &rows, "savings.2024.csv", &parsers());
        assert_eq!(out.transactions.len(), 2);

        let first = &out.transactions[0];
        assert_eq!(first.date, ymd(2030, 6, 1));
        assert_eq!(first.description, "Transaction 1");
        assert_eq!(first.account, "savings.2024");
        assert_eq!(first.source_file, "savings.2024.csv");
        assert_eq!(out.transactions[1].description, "Transaction 3");
        assert_eq!(out.transactions[1].amount, Decimal::from_str("-3.50").unwrap());
        // No date column is not a per-row fallback
        assert!(out.fallback_dates.is_empty());
        assert!(out.fallback_amounts.is_empty());
    }

    #[test]
    fn test_unreadable_dates_are_recorded() {
        let rows = vec![
            row(&["someday", "1.00", "Mystery"]),
            row(&["2024-02-29", "2.00", "Leap"]),
        ];
        let out = materialize(&roles(), &headers(), &rows, "a.csv", &parsers());
        assert_eq!(out.fallback_dates, vec![1]);
        assert_eq!(out.transactions[0].date, ymd(2030, 6, 1));
        assert_eq!(out.transactions[1].date, ymd(2024, 2, 29));
    }

    #[test]
    fn test_unreadable_amounts_are_recorded() {
        let rows = vec![
            row(&["2024-01-01", "12.00", "Deposit"]),
            row(&["2024-01-02", "N/A", "Pending hold"]),
            row(&["2024-01-03", "", "Memo only"]),
        ];
        let out = materialize(&roles(), &headers(), &rows, "a.csv", &parsers());

        assert_eq!(out.transactions.len(), 3);
        assert!(out.failures.is_empty());
        assert_eq!(out.fallback_amounts, vec![2, 3]);
        assert_eq!(out.transactions[1].amount, Decimal::ZERO);
        assert_eq!(out.transactions[0].amount, Decimal::from_str("12.00").unwrap());
    }

    #[test]
    fn test_amount_error_becomes_row_failure() {
        let rows = vec![
            row(&["2024-01-01", "corrupt", "Deposit"]),
            row(&["2024-01-02", "4.00", "Coffee"]),
        ];
        let out = materialize(&roles(), &headers(), &rows, "a.csv", &FailingExtractor(parsers()));

        assert_eq!(out.transactions.len(), 1);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].row, 1);
        assert_eq!(out.failures[0].reason, "Unusable amount value: corrupt");
        assert!(out.fallback_amounts.is_empty());
    }

    #[test]
    fn test_blank_description_and_short_rows() {
        let roles = ColumnRoleMap {
            account: Some(3),
            ..roles()
        };
        let rows = vec![row(&["2024-01-01", "1.00", "  "]), row(&["2024-01-02", "2.00", "Shop", "Visa"])];
        let out = materialize(&roles, &headers(), &rows, "card.xlsx", &parsers());

        assert_eq!(out.transactions[0].description, "Transaction 1");
        assert_eq!(out.transactions[0].account, "card");
        assert_eq!(out.transactions[1].account, "Visa");
    }
}
