//! Warehouse adapter trait for listing and dropping dbt-owned objects

use dbtclean_core::{is_plain_identifier, DropKind, ObjectIdentifier, ObservedObject, RoleSet, WarehouseKind};

/// Errors that can occur when talking to the warehouse
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Invalid database name '{0}'")]
    InvalidDatabase(String),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to drop {identifier}: {detail}")]
    DropFailed {
        identifier: ObjectIdentifier,
        detail: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Trait for warehouse adapters used by a clean run
#[async_trait::async_trait]
pub trait WarehouseAdapter: Send + Sync {
    /// Get the adapter name (e.g., "Snowflake")
    fn name(&self) -> &'static str;

    /// List every table and view in `database` owned by one of `roles`
    ///
    /// This issues a single read-only query against the database's
    /// INFORMATION_SCHEMA.
    async fn list_owned_objects(
        &self,
        roles: &RoleSet,
        database: &str,
    ) -> Result<Vec<ObservedObject>, CatalogError>;

    /// Drop one object with `DROP <kind> IF EXISTS`
    ///
    /// Returns the warehouse's status message.
    async fn drop_object(
        &self,
        identifier: &ObjectIdentifier,
        kind: DropKind,
    ) -> Result<String, CatalogError>;

    /// Test the connection to the warehouse
    async fn test_connection(&self) -> Result<(), CatalogError>;
}

/// Build the ownership query for a target database
///
/// Catalog, schema and name come back as separate columns, spelled as the
/// warehouse stores them. Owner comparison is case-insensitive.
pub fn owned_objects_query(roles: &RoleSet, database: &str) -> Result<String, CatalogError> {
    let database = database.trim();
    if !is_plain_identifier(database) {
        return Err(CatalogError::InvalidDatabase(database.to_string()));
    }
    if roles.is_empty() {
        return Err(CatalogError::ConfigError("at least one owner role is required".to_string()));
    }

    let roles = roles
        .iter()
        .map(|role| format!("'{}'", role.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        "select table_catalog, table_schema, table_name, table_type \
         from {}.information_schema.tables \
         where lower(table_owner) in ({})",
        database, roles
    ))
}

/// Build the drop statement for one object
pub fn drop_statement(identifier: &ObjectIdentifier, kind: DropKind) -> String {
    format!("drop {} if exists {}", kind.as_sql(), identifier.to_sql())
}

/// Turn one catalog row into an observed object
pub fn observed_from_row(
    catalog: &str,
    schema: &str,
    name: &str,
    table_type: &str,
) -> Result<ObservedObject, CatalogError> {
    let identifier = ObjectIdentifier::from_catalog(catalog, schema, name)
        .map_err(|e| CatalogError::InvalidResponse(e.to_string()))?;

    Ok(ObservedObject::new(identifier, WarehouseKind::new(table_type)))
}
