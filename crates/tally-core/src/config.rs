//! Ingestion configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path, or the override in the data dir
//!    (~/.local/share/tally/config/ingest.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Keys missing from an override keep their default values.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/ingest.toml");

/// Resolution order for dates whose shape cannot tell day from month
/// (`01/02/2024`, `01-02-2024`, `01/02/24`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    /// mm/dd/yyyy is tried first
    #[default]
    MonthFirst,
    /// dd/mm/yyyy is tried first
    DayFirst,
}

impl DateOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MonthFirst => "month_first",
            Self::DayFirst => "day_first",
        }
    }
}

impl std::str::FromStr for DateOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "month_first" | "mdy" | "us" => Ok(Self::MonthFirst),
            "day_first" | "dmy" | "eu" => Ok(Self::DayFirst),
            _ => Err(format!("Unknown date order: {}", s)),
        }
    }
}

impl std::fmt::Display for DateOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Date parsing settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DateConfig {
    pub ambiguous_order: DateOrder,
    /// Earliest plausible year (inclusive)
    pub min_year: i32,
    /// Latest plausible year (inclusive)
    pub max_year: i32,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            ambiguous_order: DateOrder::MonthFirst,
            min_year: 1900,
            max_year: 2100,
        }
    }
}

/// Content-sampling thresholds for the column classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionConfig {
    /// Max data rows sampled per column
    pub sample_rows: usize,
    pub date_threshold: f64,
    pub amount_threshold: f64,
    pub description_threshold: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sample_rows: 10,
            date_threshold: 0.7,
            amount_threshold: 0.8,
            description_threshold: 0.6,
        }
    }
}

/// Fixed weights used to rank candidate columns for a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoringWeights {
    /// Bonus when the header contains a role keyword
    pub header_keyword: u32,
    /// Points per sampled cell that matches the role's pattern
    pub per_sample_match: u32,
    /// Ceiling for the per-sample total
    pub sample_match_cap: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            header_keyword: 5,
            per_sample_match: 1,
            sample_match_cap: 10,
        }
    }
}

/// Complete ingestion configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct IngestConfig {
    pub dates: DateConfig,
    pub detection: DetectionConfig,
    pub scoring: ScoringWeights,
}

impl IngestConfig {
    /// Load from an explicit path, the data dir override, or embedded defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(default_path) => fs::read_to_string(&default_path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", default_path.display(), e))
                })?,
                None => DEFAULT_CONFIG.to_string(),
            },
        };

        parse_config(&content)
    }

    /// Copy with a different ambiguous date order
    pub fn with_date_order(mut self, order: DateOrder) -> Self {
        self.dates.ambiguous_order = order;
        self
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("config").join("ingest.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    dates: Option<RawDates>,
    detection: Option<RawDetection>,
    scoring: Option<RawScoring>,
}

#[derive(Debug, Deserialize)]
struct RawDates {
    ambiguous_order: Option<DateOrder>,
    min_year: Option<i32>,
    max_year: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct RawDetection {
    sample_rows: Option<usize>,
    date_threshold: Option<f64>,
    amount_threshold: Option<f64>,
    description_threshold: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawScoring {
    header_keyword: Option<u32>,
    per_sample_match: Option<u32>,
    sample_match_cap: Option<u32>,
}

/// Parse config from TOML content
pub fn parse_config(content: &str) -> Result<IngestConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = IngestConfig::default();

    if let Some(dates) = raw.dates {
        if let Some(order) = dates.ambiguous_order {
            config.dates.ambiguous_order = order;
        }
        if let Some(min_year) = dates.min_year {
            config.dates.min_year = min_year;
        }
        if let Some(max_year) = dates.max_year {
            config.dates.max_year = max_year;
        }
    }

    if let Some(detection) = raw.detection {
        if let Some(rows) = detection.sample_rows {
            config.detection.sample_rows = rows;
        }
        if let Some(t) = detection.date_threshold {
            config.detection.date_threshold = t;
        }
        if let Some(t) = detection.amount_threshold {
            config.detection.amount_threshold = t;
        }
        if let Some(t) = detection.description_threshold {
            config.detection.description_threshold = t;
        }
    }

    if let Some(scoring) = raw.scoring {
        if let Some(points) = scoring.header_keyword {
            config.scoring.header_keyword = points;
        }
        if let Some(points) = scoring.per_sample_match {
            config.scoring.per_sample_match = points;
        }
        if let Some(cap) = scoring.sample_match_cap {
            config.scoring.sample_match_cap = cap;
        }
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &IngestConfig) -> Result<()> {
    if config.dates.min_year > config.dates.max_year {
        return Err(Error::Config(format!(
            "min_year ({}) is after max_year ({})",
            config.dates.min_year, config.dates.max_year
        )));
    }
    if config.detection.sample_rows == 0 {
        return Err(Error::Config("sample_rows must be at least 1".into()));
    }
    for (name, t) in [
        ("date_threshold", config.detection.date_threshold),
        ("amount_threshold", config.detection.amount_threshold),
        ("description_threshold", config.detection.description_threshold),
    ] {
        if !(0.0..=1.0).contains(&t) {
            return Err(Error::Config(format!("{} must be within 0..=1, got {}", name, t)));
        }
    }
    Ok(())
}
