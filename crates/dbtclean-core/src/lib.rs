//! dbtclean Core
//!
//! Domain model shared by every dbtclean crate: object identity, diagnostics,
//! the clean report and configuration.
//! Never rename diagnostic codes - they are part of the report format.

pub mod object;
pub mod diagnostic;
pub mod report;
pub mod config;

pub use object::{
    ObjectIdentifier, IdentifierError, MaterializationKind, WarehouseKind, DropKind,
    ObservedObject, DropOutcome, DropStatus, is_plain_identifier,
};
pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
pub use report::{CleanReport, CleanSummary, ReportVersion};
pub use config::{Config, ConfigError, Credentials, Profiles, RoleSet, DEFAULT_ROLE};
