//! Clean report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use crate::diagnostic::{Diagnostic, DiagnosticCode, Severity};
use crate::object::{DropOutcome, DropStatus};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Counts for one clean run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanSummary {
    /// Objects owned by the automation roles in the target database
    pub observed: usize,

    /// Models and seeds declared by the project
    pub declared: usize,

    /// Observed objects with no declaration
    pub orphans: usize,

    /// Orphans skipped because their warehouse kind cannot be dropped
    pub unsupported: usize,

    /// Successful drops
    pub dropped: usize,

    /// Failed drops
    pub failed: usize,
}

/// Clean report (clean-report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Target database the run was scoped to
    pub database: String,

    /// Owner roles used to attribute objects to dbt
    pub roles: Vec<String>,

    /// Summary statistics
    pub summary: CleanSummary,

    /// One entry per attempted drop, ordered by identifier
    pub outcomes: Vec<DropOutcome>,

    /// All diagnostics
    pub diagnostics: Vec<Diagnostic>,
}

impl CleanReport {
    /// Create an empty report for a target database
    pub fn new(database: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            database: database.into(),
            roles,
            summary: CleanSummary::default(),
            outcomes: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Record a drop outcome and the matching diagnostic
    pub fn record_outcome(&mut self, outcome: DropOutcome) {
        let diagnostic = match outcome.status {
            DropStatus::Dropped => {
                self.summary.dropped += 1;
                Diagnostic::new(
                    DiagnosticCode::CleanDropped,
                    Severity::Info,
                    format!("Dropped {} {}", outcome.kind, outcome.identifier),
                )
            }
            DropStatus::Failed => {
                self.summary.failed += 1;
                Diagnostic::new(
                    DiagnosticCode::CleanDropFailed,
                    Severity::Warn,
                    format!("Failed to drop {} {}", outcome.kind, outcome.identifier),
                )
            }
        };

        self.diagnostics.push(
            diagnostic
                .with_object(&outcome.identifier)
                .with_detail(outcome.detail.clone()),
        );
        self.outcomes.push(outcome);
    }

    /// Add a diagnostic to the report
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// True when at least one drop failed
    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }

    /// Number of warning diagnostics
    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warn).count()
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}
