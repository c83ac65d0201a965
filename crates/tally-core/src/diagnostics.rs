//! Diagnostics sink for ingestion decisions and failures
//!
//! The orchestrator reports through a `&dyn Diagnostics` handed to each call;
//! reporting is fire-and-forget.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

/// Severity of a diagnostic event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
    Success,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Success => "success",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single recorded diagnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    pub level: Level,
    pub message: String,
    pub context: Value,
}

/// Append-only structured log the core reports to
pub trait Diagnostics {
    fn report(&self, level: Level, message: &str, context: Value);
}

/// Forwards every event to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, level: Level, message: &str, context: Value) {
        match level {
            Level::Info => info!(%context, "{}", message),
            Level::Success => info!(outcome = "success", %context, "{}", message),
            Level::Warning => warn!(%context, "{}", message),
            Level::Error => error!(%context, "{}", message),
        }
    }
}

/// Records events in memory (tests, per-request reporting)
#[derive(Debug, Default)]
pub struct CapturingDiagnostics {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl CapturingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Drain the recorded events
    pub fn take(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }

    pub fn count(&self, level: Level) -> usize {
        self.events().iter().filter(|e| e.level == level).count()
    }
}

impl Diagnostics for CapturingDiagnostics {
    fn report(&self, level: Level, message: &str, context: Value) {
        if let Ok(mut events) = self.events.lock() {
            events.push(DiagnosticEvent {
                level,
                message: message.to_string(),
                context,
            });
        }
    }
}

/// Sends each event to both sinks
pub struct Tee<'a> {
    first: &'a dyn Diagnostics,
    second: &'a dyn Diagnostics,
}

impl<'a> Tee<'a> {
    pub fn new(first: &'a dyn Diagnostics, second: &'a dyn Diagnostics) -> Self {
        Self { first, second }
    }
}

impl Diagnostics for Tee<'_> {
    fn report(&self, level: Level, message: &str, context: Value) {
        self.first.report(level, message, context.clone());
        self.second.report(level, message, context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_capturing_records_in_order() {
        let sink = CapturingDiagnostics::new();
        sink.report(Level::Info, "first", json!({}));
        sink.report(Level::Warning, "second", json!({"row": 2}));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "first");
        assert_eq!(events[1].context["row"], 2);
        assert_eq!(sink.count(Level::Warning), 1);

        assert_eq!(sink.take().len(), 2);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_tee_reports_to_both() {
        let a = CapturingDiagnostics::new();
        let b = CapturingDiagnostics::new();
        Tee::new(&a, &b).report(Level::Error, "boom", json!(null));
        assert_eq!(a.count(Level::Error), 1);
        assert_eq!(b.count(Level::Error), 1);
    }

    #[test]
    fn test_level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Level::Success).unwrap(), "\"success\"");
    }
}
