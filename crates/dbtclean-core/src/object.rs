//! Warehouse object identity and kinds
//!
//! Both sides of a clean run (the dbt project and the warehouse catalog) are
//! reduced to these types before they are compared. Identifiers are always
//! fully qualified and lower-cased, so equality is case-insensitive.
//! Identifiers read from the catalog also keep the names exactly as the
//! warehouse stores them, which is what drop statements are rendered from.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

static PLAIN_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_$]*$").expect("valid"));

/// Unquoted Snowflake identifiers are stored upper-cased
static STORED_UNQUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z_][A-Z0-9_$]*$").expect("valid"));

/// Returns true when `part` can be used in SQL without quoting
///
/// Matching is done on the lower-cased form; Snowflake resolves unquoted
/// identifiers case-insensitively.
pub fn is_plain_identifier(part: &str) -> bool {
    PLAIN_IDENTIFIER.is_match(&part.to_lowercase())
}

/// Normalized `database.schema.object` name
///
/// Equality, ordering and hashing only look at the normalized parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectIdentifier {
    database: String,
    schema: String,
    name: String,
    /// Parts as stored by the warehouse, when read from its catalog
    stored: Option<[String; 3]>,
}

impl ObjectIdentifier {
    /// Create an identifier from its three parts, normalizing each one
    pub fn new(database: impl AsRef<str>, schema: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        Self {
            database: normalize(database.as_ref()),
            schema: normalize(schema.as_ref()),
            name: normalize(name.as_ref()),
            stored: None,
        }
    }

    /// Create an identifier from catalog columns, keeping their exact spelling
    ///
    /// Parts are not split on dots, so `"my.table"` stays one name.
    pub fn from_catalog(
        database: &str,
        schema: &str,
        name: &str,
    ) -> Result<Self, IdentifierError> {
        if [database, schema, name].iter().any(|p| p.trim().is_empty()) {
            return Err(IdentifierError::EmptyPart(format!("{}.{}.{}", database, schema, name)));
        }

        Ok(Self {
            stored: Some([database.to_string(), schema.to_string(), name.to_string()]),
            ..Self::new(database, schema, name)
        })
    }

    /// Parse a dotted three-part name such as `DB.SCHEMA.TABLE`
    pub fn parse(fqn: &str) -> Result<Self, IdentifierError> {
        let parts: Vec<&str> = fqn.split('.').collect();
        if parts.len() != 3 {
            return Err(IdentifierError::NotFullyQualified(fqn.to_string()));
        }
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(IdentifierError::EmptyPart(fqn.to_string()));
        }

        Ok(Self::new(parts[0], parts[1], parts[2]))
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render the identifier for use in a SQL statement
    ///
    /// Catalog spellings are emitted bare when they are upper-case plain
    /// names and quoted verbatim otherwise. Without a catalog spelling,
    /// plain parts are emitted bare and anything else is double-quoted.
    /// Embedded quotes are doubled.
    pub fn to_sql(&self) -> String {
        let parts: Vec<String> = match &self.stored {
            Some(stored) => stored
                .iter()
                .map(|part| {
                    if STORED_UNQUOTED.is_match(part) {
                        part.clone()
                    } else {
                        quote(part)
                    }
                })
                .collect(),
            None => [&self.database, &self.schema, &self.name]
                .iter()
                .map(|part| {
                    if is_plain_identifier(part) {
                        part.to_string()
                    } else {
                        quote(part)
                    }
                })
                .collect(),
        };
        parts.join(".")
    }

    fn key(&self) -> (&str, &str, &str) {
        (&self.database, &self.schema, &self.name)
    }
}

fn normalize(part: &str) -> String {
    part.trim().to_lowercase()
}

fn quote(part: &str) -> String {
    format!("\"{}\"", part.replace('"', "\"\""))
}

impl PartialEq for ObjectIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ObjectIdentifier {}

impl Hash for ObjectIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for ObjectIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ObjectIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.schema, self.name)
    }
}

impl TryFrom<String> for ObjectIdentifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ObjectIdentifier> for String {
    fn from(value: ObjectIdentifier) -> Self {
        value.to_string()
    }
}

/// Errors raised when parsing an identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("Identifier '{0}' is not of the form database.schema.object")]
    NotFullyQualified(String),

    #[error("Identifier '{0}' has an empty part")]
    EmptyPart(String),
}

/// How a dbt model is realized in the warehouse
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterializationKind {
    Table,
    View,
    Incremental,
    Ephemeral,
    Seed,
    /// Custom or adapter-specific materialization, kept verbatim
    Other(String),
}

impl MaterializationKind {
    /// Parse the `materialized` config value (case-insensitive)
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "table" => Self::Table,
            "view" => Self::View,
            "incremental" => Self::Incremental,
            "ephemeral" => Self::Ephemeral,
            "seed" => Self::Seed,
            other => Self::Other(other.to_string()),
        }
    }

    /// Only tables and views exist as standalone droppable objects
    pub fn is_drop_capable(&self) -> bool {
        matches!(self, Self::Table | Self::View)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Table => "table",
            Self::View => "view",
            Self::Incremental => "incremental",
            Self::Ephemeral => "ephemeral",
            Self::Seed => "seed",
            Self::Other(other) => other,
        }
    }
}

impl fmt::Display for MaterializationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Object type as reported by the warehouse catalog (`TABLE_TYPE`)
///
/// Stored lower-cased, e.g. `base table`, `view`, `materialized view`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarehouseKind(String);

impl WarehouseKind {
    pub fn new(kind: impl AsRef<str>) -> Self {
        Self(kind.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve the statement kind used to drop an object of this type
    ///
    /// View-like kinds win over table-like ones; any other kind is
    /// unsupported and yields `None`.
    pub fn drop_kind(&self) -> Option<DropKind> {
        if self.0.contains("view") {
            Some(DropKind::View)
        } else if self.0.contains("table") {
            Some(DropKind::Table)
        } else {
            None
        }
    }
}

impl fmt::Display for WarehouseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Object kind accepted by `DROP <kind> IF EXISTS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropKind {
    Table,
    View,
}

impl DropKind {
    /// SQL keyword for the drop statement
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::View => "view",
        }
    }
}

impl fmt::Display for DropKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// An object found in the warehouse catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObservedObject {
    pub identifier: ObjectIdentifier,
    pub warehouse_kind: WarehouseKind,
}

impl ObservedObject {
    pub fn new(identifier: ObjectIdentifier, warehouse_kind: WarehouseKind) -> Self {
        Self {
            identifier,
            warehouse_kind,
        }
    }
}

/// Result of a single drop attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropStatus {
    Dropped,
    Failed,
}

/// Per-object record produced by the deletion executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropOutcome {
    pub identifier: ObjectIdentifier,
    pub kind: DropKind,
    pub status: DropStatus,
    /// Warehouse status message, or the error detail on failure
    pub detail: String,
}

impl DropOutcome {
    pub fn dropped(identifier: ObjectIdentifier, kind: DropKind, detail: impl Into<String>) -> Self {
        Self {
            identifier,
            kind,
            status: DropStatus::Dropped,
            detail: detail.into(),
        }
    }

    pub fn failed(identifier: ObjectIdentifier, kind: DropKind, detail: impl Into<String>) -> Self {
        Self {
            identifier,
            kind,
            status: DropStatus::Failed,
            detail: detail.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == DropStatus::Failed
    }
}
