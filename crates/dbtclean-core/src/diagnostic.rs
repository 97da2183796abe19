//! Diagnostic codes and run messages
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the report format.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    /// Warehouse object has no matching model or seed in the project
    CleanOrphanFound,

    /// Orphan has a warehouse type that cannot be dropped as a table or view
    CleanUnsupportedObjectKind,

    /// A model and a seed declare the same identifier
    CleanShadowedDeclaration,

    /// Orphan was dropped
    CleanDropped,

    /// Drop statement failed for one object
    CleanDropFailed,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CleanOrphanFound => "CLEAN_ORPHAN_FOUND",
            Self::CleanUnsupportedObjectKind => "CLEAN_UNSUPPORTED_OBJECT_KIND",
            Self::CleanShadowedDeclaration => "CLEAN_SHADOWED_DECLARATION",
            Self::CleanDropped => "CLEAN_DROPPED",
            Self::CleanDropFailed => "CLEAN_DROP_FAILED",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - reported, never aborts the run
    Warn,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
        }
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Warehouse object the message is about
    pub object: Option<String>,

    /// Underlying detail, e.g. the warehouse's own error text
    pub detail: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            object: None,
            detail: None,
        }
    }

    /// Attach the object this diagnostic refers to
    pub fn with_object(mut self, object: impl ToString) -> Self {
        self.object = Some(object.to_string());
        self
    }

    /// Attach detail text
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
