//! Column role detection
//!
//! Decides which column holds the date, amount, description and account of
//! each transaction without a user-supplied mapping. Three tiers run in
//! order, each only filling roles the previous tiers left open:
//!
//! 1. Content: sampled cell values are scored per role (authoritative)
//! 2. Header: an ordered table of header-name patterns
//! 3. Positional guess: loose substring search, only when fewer than two
//!    roles are known after tiers 1 and 2
//!
//! Classification is pure and deterministic.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{IngestConfig, ScoringWeights};
use crate::grid::{cell_at, is_blank_row, RawCell};
use crate::materialize::ValueParsers;

/// Semantic purpose a column can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Date,
    Amount,
    Description,
    Account,
}

impl Role {
    /// Resolution priority; earlier roles claim columns first
    pub const ALL: [Role; 4] = [Role::Date, Role::Amount, Role::Description, Role::Account];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Amount => "amount",
            Self::Description => "description",
            Self::Account => "account",
        }
    }

    /// Header substrings that earn the keyword bonus in content scoring
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Date => &["date", "posted", "time"],
            Self::Amount => &["amount", "amt", "debit", "credit", "value", "sum", "total"],
            Self::Description => &[
                "description",
                "desc",
                "merchant",
                "payee",
                "memo",
                "narrative",
                "details",
                "particulars",
            ],
            Self::Account => &["account", "acct", "bank", "card"],
        }
    }

    /// Loose substrings for the positional-guess tier
    fn loose_keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Date => &["date", "time", "day"],
            Self::Amount => &["amount", "amt", "debit", "credit", "sum", "value", "total"],
            Self::Description => &["desc", "memo", "payee", "merchant", "detail", "narr", "name"],
            Self::Account => &["account", "acct", "bank", "card"],
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered header-name patterns per role (case-insensitive)
const HEADER_PATTERNS: [(Role, &[&str]); 4] = [
    (
        Role::Date,
        &[
            r"^date$",
            r"^(posting|posted|post|transaction|trans|txn|value|booking|effective)[ _]?date$",
            r"^date[ _]?(posted|of transaction)$",
            r"\bdate\b",
        ],
    ),
    (
        Role::Amount,
        &[
            r"^amount$",
            r"^(transaction|trans|txn)[ _]?amount$",
            r"^amount[ _]?\(.*\)$",
            r"^(debit|credit)([ _]?amount)?$",
            r"^balance$",
            r"\bamount\b",
        ],
    ),
    (
        Role::Description,
        &[
            r"^description$",
            r"^(transaction[ _]?)?(description|details)$",
            r"^(payee|merchant|memo|narrative|narration|particulars)([ _]?name)?$",
            r"\bdescription\b",
        ],
    ),
    (
        Role::Account,
        &[
            r"^account([ _]?(name|number|no\.?))?$",
            r"^(bank|card)([ _]?(number|no\.?))?$",
            r"\baccount\b",
        ],
    ),
];

fn header_patterns() -> &'static [(Role, Vec<Regex>)] {
    static PATTERNS: OnceLock<Vec<(Role, Vec<Regex>)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        HEADER_PATTERNS
            .iter()
            .map(|(role, patterns)| {
                let compiled = patterns
                    .iter()
                    .map(|p| Regex::new(&format!("(?i){}", p)).expect("valid regex"))
                    .collect();
                (*role, compiled)
            })
            .collect()
    })
}

/// Optional column index per role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnRoleMap {
    pub date: Option<usize>,
    pub amount: Option<usize>,
    pub description: Option<usize>,
    pub account: Option<usize>,
}

impl ColumnRoleMap {
    pub fn get(&self, role: Role) -> Option<usize> {
        match role {
            Role::Date => self.date,
            Role::Amount => self.amount,
            Role::Description => self.description,
            Role::Account => self.account,
        }
    }

    fn set(&mut self, role: Role, column: usize) {
        let slot = match role {
            Role::Date => &mut self.date,
            Role::Amount => &mut self.amount,
            Role::Description => &mut self.description,
            Role::Account => &mut self.account,
        };
        *slot = Some(column);
    }

    pub fn assigned_count(&self) -> usize {
        Role::ALL.iter().filter(|r| self.get(**r).is_some()).count()
    }

    /// A file without either cannot produce meaningful transactions
    pub fn has_date_or_amount(&self) -> bool {
        self.date.is_some() || self.amount.is_some()
    }
}

/// Which tier made an assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Content,
    Header,
    Positional,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Header => "header",
            Self::Positional => "positional",
        }
    }
}

/// One role assignment, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDecision {
    pub role: Role,
    pub column: usize,
    pub header: String,
    pub tier: Tier,
    /// Content score (content tier only)
    pub score: Option<u32>,
}

/// Role map plus the decisions that produced it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Classification {
    pub roles: ColumnRoleMap,
    pub decisions: Vec<RoleDecision>,
}

/// Content score of `header`'s column for `role`
///
/// `header_keyword` points if the lowercased header contains one of the
/// role's keywords, plus `per_sample_match` points per matching sample,
/// capped at `sample_match_cap`.
pub fn score_column(
    header: &str,
    samples: &[&RawCell],
    role: Role,
    weights: &ScoringWeights,
    parsers: &ValueParsers,
) -> u32 {
    let header = header.to_lowercase();
    let keyword = if role.keywords().iter().any(|k| header.contains(k)) {
        weights.header_keyword
    } else {
        0
    };

    let matches = samples
        .iter()
        .filter(|cell| !cell.is_empty() && sample_matches(cell, role, parsers))
        .count() as u32;
    let sample_points = (matches * weights.per_sample_match).min(weights.sample_match_cap);

    keyword + sample_points
}

fn sample_matches(cell: &RawCell, role: Role, parsers: &ValueParsers) -> bool {
    match role {
        Role::Date => parsers.dates.looks_like_date(cell),
        Role::Amount => parsers.amounts.looks_like_amount(cell),
        Role::Description => parsers.amounts.looks_like_description(cell, &parsers.dates),
        Role::Account => false,
    }
}

/// Header + sample → role map
#[derive(Debug, Clone)]
pub struct ColumnClassifier {
    parsers: ValueParsers,
    weights: ScoringWeights,
    sample_rows: usize,
}

impl ColumnClassifier {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            parsers: ValueParsers::from_config(config),
            weights: config.scoring,
            sample_rows: config.detection.sample_rows,
        }
    }

    pub fn detect_columns(&self, headers: &[String], rows: &[Vec<RawCell>]) -> ColumnRoleMap {
        self.classify(headers, rows).roles
    }

    pub fn classify(&self, headers: &[String], rows: &[Vec<RawCell>]) -> Classification {
        let mut result = Classification::default();
        let mut claimed: HashSet<usize> = HashSet::new();

        self.content_tier(headers, rows, &mut result, &mut claimed);
        header_tier(headers, &mut result, &mut claimed);

        if result.roles.assigned_count() < 2 {
            positional_tier(headers, &mut result, &claimed);
        }

        debug!(
            date = ?result.roles.date,
            amount = ?result.roles.amount,
            description = ?result.roles.description,
            account = ?result.roles.account,
            "Column roles detected"
        );
        result
    }

    fn content_tier(
        &self,
        headers: &[String],
        rows: &[Vec<RawCell>],
        result: &mut Classification,
        claimed: &mut HashSet<usize>,
    ) {
        let sample: Vec<&Vec<RawCell>> = rows
            .iter()
            .filter(|r| !is_blank_row(r))
            .take(self.sample_rows)
            .collect();
        if sample.is_empty() {
            return;
        }

        let width = headers
            .len()
            .max(sample.iter().map(|r| r.len()).max().unwrap_or(0));
        let columns: Vec<Vec<&RawCell>> = (0..width)
            .map(|c| sample.iter().map(|r| cell_at(r, c)).collect())
            .collect();

        let dates = &self.parsers.dates;
        let amounts = &self.parsers.amounts;

        for role in [Role::Date, Role::Amount, Role::Description] {
            let mut best: Option<(usize, u32)> = None;

            for (c, samples) in columns.iter().enumerate() {
                if claimed.contains(&c) {
                    continue;
                }
                let cells = samples.iter().copied();
                let flagged = match role {
                    Role::Date => dates.is_likely_date_column(cells),
                    Role::Amount => amounts.is_likely_amount_column(cells),
                    Role::Description => amounts.is_likely_description_column(cells, dates),
                    Role::Account => false,
                };
                if !flagged {
                    continue;
                }

                let header = headers.get(c).map(String::as_str).unwrap_or("");
                let score = score_column(header, samples, role, &self.weights, &self.parsers);
                // Strictly greater keeps the leftmost column on ties
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((c, score));
                }
            }

            if let Some((column, score)) = best {
                debug!(role = %role, column, score, "Content tier assignment");
                assign(result, headers, role, column, Tier::Content, Some(score));
                claimed.insert(column);
            }
        }
    }
}

impl Default for ColumnClassifier {
    fn default() -> Self {
        Self::new(&IngestConfig::default())
    }
}

fn header_tier(headers: &[String], result: &mut Classification, claimed: &mut HashSet<usize>) {
    for (column, header) in headers.iter().enumerate() {
        if claimed.contains(&column) {
            continue;
        }
        let header_text = header.trim();
        if header_text.is_empty() {
            continue;
        }

        let hit = header_patterns().iter().find(|(role, patterns)| {
            result.roles.get(*role).is_none() && patterns.iter().any(|re| re.is_match(header_text))
        });

        if let Some((role, _)) = hit {
            debug!(role = %role, column, header = %header_text, "Header tier assignment");
            assign(result, headers, *role, column, Tier::Header, None);
            claimed.insert(column);
        }
    }
}

/// Last resort; may share columns between its own assignments but never
/// takes a column claimed earlier, and never puts date and amount together
fn positional_tier(headers: &[String], result: &mut Classification, claimed: &HashSet<usize>) {
    let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();

    for role in Role::ALL {
        if result.roles.get(role).is_some() {
            continue;
        }

        let conflicting = match role {
            Role::Date => result.roles.amount,
            Role::Amount => result.roles.date,
            _ => None,
        };

        let found = lowered.iter().enumerate().find(|(column, header)| {
            !claimed.contains(column)
                && Some(*column) != conflicting
                && role.loose_keywords().iter().any(|k| header.contains(k))
        });

        if let Some((column, _)) = found {
            debug!(role = %role, column, "Positional guess");
            assign(result, headers, role, column, Tier::Positional, None);
        }
    }
}

fn assign(
    result: &mut Classification,
    headers: &[String],
    role: Role,
    column: usize,
    tier: Tier,
    score: Option<u32>,
) {
    result.roles.set(role, column);
    result.decisions.push(RoleDecision {
        role,
        column,
        header: headers.get(column).cloned().unwrap_or_default(),
        tier,
        score,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn row(cells: &[&str]) -> Vec<RawCell> {
        cells.iter().map(|c| RawCell::text(*c)).collect()
    }

    fn card_rows() -> Vec<Vec<RawCell>> {
        vec![
            row(&["2024-01-15", "-45.20", "Coffee Shop Downtown", "4111"]),
            row(&["2024-01-16", "1,200.00", "Payroll Deposit", "4111"]),
            row(&["2024-01-17", "(12.99)", "Streaming Service", "4111"]),
            row(&["2024-01-18", "$8.50", "Corner Bakery", "4111"]),
        ]
    }

    #[test]
    fn test_content_tier_assigns_core_roles() {
        let classifier = ColumnClassifier::default();
        let result = classifier.classify(
            &headers(&["Posting Date", "Transaction Amount", "Merchant", "Card"]),
            &card_rows(),
        );

        assert_eq!(result.roles.date, Some(0));
        assert_eq!(result.roles.amount, Some(1));
        assert_eq!(result.roles.description, Some(2));
        assert!(result.decisions[..3].iter().all(|d| d.tier == Tier::Content));
    }

    #[test]
    fn test_content_tier_ignores_header_text() {
        let classifier = ColumnClassifier::default();
        let roles = classifier.detect_columns(&headers(&["A", "B", "C", "D"]), &card_rows());

        assert_eq!(roles.date, Some(0));
        // Column 3 also looks numeric; the tie goes to the leftmost column
        assert_eq!(roles.amount, Some(1));
        assert_eq!(roles.description, Some(2));
        assert_eq!(roles.account, None);
    }

    #[test]
    fn test_header_tier_fills_remaining_roles() {
        let classifier = ColumnClassifier::default();
        let result = classifier.classify(
            &headers(&["Posting Date", "Transaction Amount", "Merchant", "Card"]),
            &card_rows(),
        );

        assert_eq!(result.roles.account, Some(3));
        let account = result.decisions.iter().find(|d| d.role == Role::Account).unwrap();
        assert_eq!(account.tier, Tier::Header);
        assert_eq!(account.header, "Card");
    }

    #[test]
    fn test_header_tier_without_data() {
        let classifier = ColumnClassifier::default();
        let roles = classifier.detect_columns(
            &headers(&["Transaction Date", "Description", "Amount", "Balance", "Account Number"]),
            &[],
        );

        assert_eq!(roles.date, Some(0));
        assert_eq!(roles.description, Some(1));
        assert_eq!(roles.amount, Some(2));
        assert_eq!(roles.account, Some(4));
    }

    #[test]
    fn test_positional_tier_never_shares_date_and_amount() {
        let classifier = ColumnClassifier::default();
        let result = classifier.classify(&headers(&["Notes", "Daytime amt"]), &[]);

        assert_eq!(result.roles.date, Some(1));
        assert_ne!(result.roles.date, result.roles.amount);
        assert!(result.decisions.iter().all(|d| d.tier == Tier::Positional));
    }

    #[test]
    fn test_positional_tier_skipped_with_two_roles() {
        let classifier = ColumnClassifier::default();
        let result = classifier.classify(&headers(&["Date", "Amount", "Daytime memo"]), &[]);

        assert_eq!(result.roles.date, Some(0));
        assert_eq!(result.roles.amount, Some(1));
        assert_eq!(result.roles.description, None);
    }

    #[test]
    fn test_positional_tier_does_not_take_claimed_columns() {
        let classifier = ColumnClassifier::default();
        let result = classifier.classify(&headers(&["Memo date", "Notes"]), &[]);

        assert_eq!(result.roles.date, Some(0));
        assert_eq!(result.roles.description, None);
    }

    #[test]
    fn test_no_roles_for_unrelated_headers() {
        let classifier = ColumnClassifier::default();
        let rows = vec![row(&["hello"]), row(&["world"])];
        let roles = classifier.detect_columns(&headers(&["Notes"]), &rows);

        assert!(!roles.has_date_or_amount());
    }

    #[test]
    fn test_classification_is_idempotent() {
        let classifier = ColumnClassifier::default();
        let h = headers(&["When", "How much", "What", "Card"]);
        let rows = card_rows();
        assert_eq!(classifier.classify(&h, &rows), classifier.classify(&h, &rows));
    }

    #[test]
    fn test_score_column() {
        let parsers = ValueParsers::default();
        let weights = ScoringWeights::default();
        let cells: Vec<RawCell> = ["-1.00", "2.00", "hello"].iter().map(|c| RawCell::text(*c)).collect();
        let samples: Vec<&RawCell> = cells.iter().collect();

        assert_eq!(score_column("Amount", &samples, Role::Amount, &weights, &parsers), 7);
        assert_eq!(score_column("Col", &samples, Role::Amount, &weights, &parsers), 2);
        assert_eq!(score_column("Col", &samples, Role::Date, &weights, &parsers), 0);

        let many: Vec<RawCell> = (0..15).map(|i| RawCell::Number(i as f64)).collect();
        let many: Vec<&RawCell> = many.iter().collect();
        assert_eq!(score_column("", &many, Role::Amount, &weights, &parsers), 10);
    }
}
