//! `dbt ls --output json` record parsing
//!
//! Each line printed by `dbt ls -q --output json` is one JSON object. Only the
//! fields needed to place the node in the warehouse are read, and they are
//! required: a record without them fails here instead of producing a
//! half-empty identifier later.

use dbtclean_core::{MaterializationKind, ObjectIdentifier};
use serde::Deserialize;
use std::fmt;

/// dbt resource types listed by the manifest reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Model,
    Seed,
}

impl ResourceType {
    /// Value passed to `--resource-type`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Seed => "seed",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw shape of a listed node (subset of fields we care about)
#[derive(Debug, Deserialize)]
struct ListedNode {
    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    config: Option<ListedConfig>,
}

#[derive(Debug, Deserialize)]
struct ListedConfig {
    #[serde(default)]
    schema: Option<String>,

    #[serde(default)]
    materialized: Option<String>,
}

/// A validated model or seed definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDefinition {
    pub resource_type: ResourceType,
    pub name: String,
    pub schema: String,
    pub materialization: MaterializationKind,
}

impl DeclaredDefinition {
    /// Parse one JSON line printed by `dbt ls`
    pub fn parse(line: &str, resource_type: ResourceType) -> Result<Self, ManifestError> {
        let node: ListedNode = serde_json::from_str(line).map_err(|e| {
            ManifestError::MalformedDefinition {
                resource_type,
                name: None,
                reason: format!("not a JSON object ({}): {}", e, truncate(line)),
            }
        })?;

        let name = node
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ManifestError::missing_field(resource_type, None, "name"))?;

        let config = node
            .config
            .ok_or_else(|| ManifestError::missing_field(resource_type, Some(name.as_str()), "config"))?;

        let schema = config
            .schema
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ManifestError::missing_field(resource_type, Some(name.as_str()), "config.schema"))?;

        let materialized = config
            .materialized
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| {
                ManifestError::missing_field(resource_type, Some(name.as_str()), "config.materialized")
            })?;

        Ok(Self {
            resource_type,
            name,
            schema,
            materialization: MaterializationKind::parse(&materialized),
        })
    }

    /// Fully qualified identifier inside the target database
    pub fn identifier(&self, database: &str) -> ObjectIdentifier {
        ObjectIdentifier::new(database, &self.schema, &self.name)
    }
}

fn truncate(line: &str) -> String {
    const MAX: usize = 80;
    if line.chars().count() > MAX {
        format!("{}...", line.chars().take(MAX).collect::<String>())
    } else {
        line.to_string()
    }
}

/// Manifest reader errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to list dbt {resource_type}s: {detail}")]
    ExtractionFailed {
        resource_type: ResourceType,
        detail: String,
    },

    #[error("Malformed dbt {resource_type} definition{}: {reason}", .name.as_ref().map(|n| format!(" '{}'", n)).unwrap_or_default())]
    MalformedDefinition {
        resource_type: ResourceType,
        name: Option<String>,
        reason: String,
    },
}

impl ManifestError {
    fn missing_field(resource_type: ResourceType, name: Option<&str>, field: &str) -> Self {
        Self::MalformedDefinition {
            resource_type,
            name: name.map(str::to_string),
            reason: format!("missing field '{}'", field),
        }
    }
}
