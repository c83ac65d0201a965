//! Integration tests for tally-core
//!
//! These tests exercise the full decode → classify → materialize workflow.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_core::{
    read_transactions_csv, write_transactions_csv, AmountParser, CapturingDiagnostics,
    CellExtractor, ColumnClassifier, DateOrder, DateParser, FailureKind, IngestConfig, Ingestor,
    Level, ParseOutcome, RawCell, RawGrid, RowError, SourceFile, Tier, ValueParsers,
};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn text(s: &str) -> RawCell {
    RawCell::text(s)
}

fn ingestor() -> Ingestor {
    Ingestor::default().with_today(ymd(2030, 6, 1))
}

/// Card export with a posting date, a transaction date and a category column
fn card_csv() -> &'static str {
    r#"Transaction Date,Post Date,Description,Category,Type,Amount,Memo
07/15/2023,07/16/2023,NETFLIX.COM,Entertainment,Sale,-15.49,
08/15/2023,08/16/2023,NETFLIX.COM,Entertainment,Sale,-15.49,
09/15/2023,09/16/2023,NETFLIX.COM,Entertainment,Sale,-15.49,
10/15/2023,10/16/2023,NETFLIX.COM,Entertainment,Sale,-15.49,
07/20/2023,07/21/2023,SPOTIFY USA,Entertainment,Sale,-10.99,
08/20/2023,08/21/2023,SPOTIFY USA,Entertainment,Sale,-10.99,
09/20/2023,09/21/2023,SPOTIFY USA,Entertainment,Sale,-10.99,
10/20/2023,10/21/2023,SPOTIFY USA,Entertainment,Sale,-10.99,
07/01/2023,07/02/2023,HULU,Entertainment,Sale,-17.99,
08/01/2023,08/02/2023,HULU,Entertainment,Sale,-17.99,
09/25/2023,09/26/2023,PAYMENT THANK YOU,,Payment,500.00,"#
}

// =============================================================================
// End-to-end ingestion
// =============================================================================

#[test]
fn test_card_export_end_to_end() {
    let diag = CapturingDiagnostics::new();
    let file = SourceFile::new("chase_visa.csv", card_csv().as_bytes().to_vec());

    let ingested = ingestor().ingest(&file, &diag).expect("ingest card export");

    assert_eq!(ingested.transactions.len(), 11);
    assert_eq!(ingested.roles.date, Some(0));
    assert_eq!(ingested.roles.amount, Some(5));
    assert_eq!(ingested.roles.description, Some(2));
    assert!(ingested.failed_rows.is_empty());
    assert_eq!(ingested.fallback_dates, 0);
    assert_eq!(ingested.fallback_amounts, 0);

    let first = &ingested.transactions[0];
    assert_eq!(first.date, ymd(2023, 7, 15));
    assert_eq!(first.amount, dec("-15.49"));
    assert_eq!(first.description, "NETFLIX.COM");
    assert_eq!(first.account, "chase_visa");
    assert_eq!(first.source_file, "chase_visa.csv");

    let payment = ingested.transactions.last().unwrap();
    assert_eq!(payment.amount, dec("500.00"));
    assert_eq!(diag.count(Level::Success), 1);
}

#[test]
fn test_european_semicolon_export() {
    let config = IngestConfig::default().with_date_order(DateOrder::DayFirst);
    let ingestor = Ingestor::new(config).with_today(ymd(2030, 6, 1));
    let csv = "Buchungstag;Verwendungszweck;Betrag;Konto\n\
               01.02.2024;Miete Februar;-850.00;Girokonto\n\
               03.02.2024;Supermarkt Einkauf;-42.10;Girokonto\n\
               05/02/2024;Gehalt Firma;2500.00;Girokonto\n";
    let file = SourceFile::new("konto.csv", csv.as_bytes().to_vec());

    let ingested = ingestor.ingest(&file, &CapturingDiagnostics::new()).unwrap();
    assert_eq!(ingested.transactions.len(), 3);
    assert_eq!(ingested.transactions[0].date, ymd(2024, 2, 1));
    // Ambiguous slash date read day-first
    assert_eq!(ingested.transactions[2].date, ymd(2024, 2, 5));
    assert_eq!(ingested.transactions[1].description, "Supermarkt Einkauf");
}

#[test]
fn test_mime_routes_extensionless_upload() {
    let file = SourceFile::new("download", b"Date,Amount\n2024-01-15,9.99\n".to_vec())
        .with_mime("text/csv");
    let ingested = ingestor().ingest(&file, &CapturingDiagnostics::new()).unwrap();
    assert_eq!(ingested.transactions.len(), 1);
    assert_eq!(ingested.transactions[0].account, "download");
}

#[test]
fn test_notes_file_has_no_detectable_columns() {
    let diag = CapturingDiagnostics::new();
    let file = SourceFile::new("notes.csv", b"Notes\nbuy milk\ncall the bank back\n".to_vec());

    let outcome = ParseOutcome::from(ingestor().ingest(&file, &diag));
    match outcome {
        ParseOutcome::Failure { kind, .. } => assert_eq!(kind, FailureKind::NoDetectableColumns),
        ParseOutcome::Success(_) => panic!("expected failure"),
    }
    assert_eq!(diag.count(Level::Error), 1);
}

#[test]
fn test_batch_continues_after_failures() {
    let files = vec![
        SourceFile::new("a.csv", b"Date,Amount\n2024-01-15,1.00\n".to_vec()),
        SourceFile::new("scan.pdf", b"%PDF-1.4".to_vec()),
        SourceFile::new("broken.xlsx", b"not a zip".to_vec()),
        SourceFile::new("b.csv", b"Date,Amount\n2024-01-16,2.00\n2024-01-17,3.00\n".to_vec()),
    ];

    let outcomes = ingestor().ingest_all(&files, &CapturingDiagnostics::new());
    let kinds: Vec<Option<FailureKind>> = outcomes
        .iter()
        .map(|o| match &o.outcome {
            ParseOutcome::Success(_) => None,
            ParseOutcome::Failure { kind, .. } => Some(*kind),
        })
        .collect();

    assert_eq!(
        kinds,
        vec![
            None,
            Some(FailureKind::UnsupportedFormat),
            Some(FailureKind::DecodeFailed),
            None
        ]
    );
    assert_eq!(outcomes[3].outcome.ingested().unwrap().transactions.len(), 2);
}

// =============================================================================
// Spreadsheet-shaped grids
// =============================================================================

#[test]
fn test_spreadsheet_grid_with_typed_cells() {
    let grid = RawGrid::new(
        vec!["Booked".into(), "Details".into(), "Value".into()],
        vec![
            vec![RawCell::Number(45306.0), text("Grocery Store"), RawCell::Number(-54.2)],
            vec![RawCell::Date(ymd(2024, 1, 16)), text("Electric Company"), RawCell::Number(-120.0)],
            vec![RawCell::Empty, RawCell::Empty, RawCell::Empty],
            vec![RawCell::Number(45308.0), text("Salary Deposit"), RawCell::Number(3100.0)],
        ],
    );

    let ingested = ingestor()
        .ingest_grid("budget.xlsx", &grid, &CapturingDiagnostics::new())
        .unwrap();

    assert_eq!(ingested.roles.date, Some(0));
    assert_eq!(ingested.roles.description, Some(1));
    assert_eq!(ingested.roles.amount, Some(2));
    assert_eq!(ingested.transactions.len(), 3);
    assert_eq!(ingested.transactions[0].date, ymd(2024, 1, 15));
    assert_eq!(ingested.transactions[1].date, ymd(2024, 1, 16));
    assert_eq!(ingested.transactions[2].amount, dec("3100"));
    assert_eq!(ingested.transactions[2].account, "budget");
}

#[test]
fn test_headerless_grid_is_rejected() {
    let grid = RawGrid::new(vec![String::new(), " ".into()], vec![vec![text("2024-01-15")]]);
    let err = ingestor()
        .ingest_grid("blank.xlsx", &grid, &CapturingDiagnostics::new())
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::NoHeaders);
}

// =============================================================================
// Value parsing properties
// =============================================================================

#[test]
fn test_same_calendar_day_across_formats() {
    let parser = DateParser::default();
    for s in ["2024-01-15", "15/01/2024", "01/15/2024", "2024.01.15", "15 Jan 2024", "Jan 15, 2024"] {
        assert_eq!(parser.try_parse(&text(s)), Some(ymd(2024, 1, 15)), "input {s}");
    }
}

#[test]
fn test_column_predicates() {
    let dates = DateParser::default();
    let amounts = AmountParser::default();

    let mut date_sample: Vec<RawCell> = (10..17).map(|d| text(&format!("2024-03-{d}"))).collect();
    date_sample.extend([text("Opening balance"), text("pending"), text("see note")]);
    assert!(dates.is_likely_date_column(&date_sample));

    let merchants: Vec<RawCell> = [
        "Coffee Shop", "Woolworths", "Rent", "Bakery", "Petrol", "Cinema", "Chemist", "Bookshop",
        "Hardware", "Florist",
    ]
    .iter()
    .map(|s| text(s))
    .collect();
    assert!(!dates.is_likely_date_column(&merchants));

    assert!(amounts.is_likely_amount_column(&[text("$1,234.56"), text("-$50.00"), text("(75.00)")]));
    assert!(!amounts.is_likely_amount_column(&[text("Coffee Shop"), text("Woolworths"), text("Rent")]));
}

#[test]
fn test_amount_parsing() {
    let amounts = AmountParser::default();
    assert_eq!(amounts.parse(&text("(75.00)")), dec("-75.00"));
    assert_eq!(amounts.parse(&text("$1,234.56")), dec("1234.56"));
    assert_eq!(amounts.parse(&text("-50")), dec("-50"));
    assert_eq!(amounts.parse(&text("")), Decimal::ZERO);
}

// =============================================================================
// Classifier properties
// =============================================================================

#[test]
fn test_content_evidence_beats_header_text() {
    let headers: Vec<String> = ["Posting Date", "Transaction Amount", "Merchant", "Card"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let rows = vec![
        vec![text("2024-02-01"), text("-12.00"), text("Corner Coffee"), text("1234")],
        vec![text("2024-02-02"), text("-60.15"), text("Fuel Station"), text("1234")],
        vec![text("2024-02-03"), text("250.00"), text("Refund Electronics"), text("1234")],
    ];

    let classification = ColumnClassifier::default().classify(&headers, &rows);
    let roles = classification.roles;
    assert_eq!((roles.date, roles.amount, roles.description), (Some(0), Some(1), Some(2)));

    for decision in classification.decisions.iter().take(3) {
        assert_eq!(decision.tier, Tier::Content);
    }

    let again = ColumnClassifier::default().detect_columns(&headers, &rows);
    assert_eq!(again, roles);
}

// =============================================================================
// Row materializer properties
// =============================================================================

/// Extractor that breaks on the second data row
struct SecondRowFails(ValueParsers);

impl CellExtractor for SecondRowFails {
    fn date(&self, cell: &RawCell) -> Result<Option<NaiveDate>, RowError> {
        if cell.as_text() == Some("2024-01-02") {
            return Err(RowError::Date("parser invariant violated".into()));
        }
        self.0.date(cell)
    }

    fn amount(&self, cell: &RawCell) -> Result<Option<Decimal>, RowError> {
        self.0.amount(cell)
    }

    fn fallback_date(&self) -> NaiveDate {
        self.0.fallback_date()
    }
}

fn five_row_grid(blank_third: bool) -> RawGrid {
    let mut rows: Vec<Vec<RawCell>> = (1..=5)
        .map(|d| {
            vec![
                text(&format!("2024-01-0{d}")),
                text(&format!("-{d}.00")),
                text(&format!("Purchase number {d}")),
            ]
        })
        .collect();
    if blank_third {
        rows[2] = vec![RawCell::Empty, text(" "), RawCell::Empty];
    }
    RawGrid::new(vec!["Date".into(), "Amount".into(), "Description".into()], rows)
}

#[test]
fn test_blank_row_yields_no_transaction_or_failure() {
    let ingested = ingestor()
        .ingest_grid("a.csv", &five_row_grid(true), &CapturingDiagnostics::new())
        .unwrap();
    assert_eq!(ingested.transactions.len(), 4);
    assert!(ingested.failed_rows.is_empty());
}

#[test]
fn test_injected_row_failure_is_isolated() {
    let diag = CapturingDiagnostics::new();
    let extractor = SecondRowFails(ValueParsers::default());
    let ingested = ingestor()
        .ingest_grid_with("a.csv", &five_row_grid(false), &extractor, &diag)
        .unwrap();

    assert_eq!(ingested.transactions.len(), 4);
    assert_eq!(ingested.failed_rows.len(), 1);
    assert_eq!(ingested.failed_rows[0].row, 2);
    assert_eq!(diag.count(Level::Warning), 1);
}

// =============================================================================
// Export
// =============================================================================

#[test]
fn test_ingest_then_export_and_read_back() {
    let file = SourceFile::new("chase_visa.csv", card_csv().as_bytes().to_vec());
    let ingested = ingestor().ingest(&file, &CapturingDiagnostics::new()).unwrap();

    let mut buf = Vec::new();
    write_transactions_csv(&mut buf, &ingested.transactions).unwrap();
    let restored = read_transactions_csv(buf.as_slice()).unwrap();

    assert_eq!(restored.len(), ingested.transactions.len());
    for (a, b) in restored.iter().zip(&ingested.transactions) {
        assert_eq!((a.date, a.amount, &a.description), (b.date, b.amount, &b.description));
        assert_eq!(a.account, b.account);
    }
}
