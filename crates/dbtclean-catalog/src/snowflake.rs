//! Snowflake warehouse adapter using INFORMATION_SCHEMA
//!
//! Lists tables and views through `<database>.INFORMATION_SCHEMA.TABLES` and
//! drops them with `DROP <kind> IF EXISTS`. The session role needs:
//! - USAGE on the database and its schemas
//! - OWNERSHIP (or equivalent) on the objects to drop
//!
//! ## Usage
//!
//! ```rust,ignore
//! let adapter = SnowflakeAdapter::from_credentials(&credentials)
//!     .with_warehouse("COMPUTE_ETL")
//!     .with_database("ADVENTUREWORKS")
//!     .build()?;
//! ```
//!
//! Reference: https://docs.snowflake.com/en/sql-reference/info-schema/tables

use crate::adapter::{drop_statement, owned_objects_query, CatalogError, WarehouseAdapter};
use dbtclean_core::{Credentials, DropKind, ObjectIdentifier, ObservedObject, RoleSet};

#[cfg(feature = "snowflake")]
use crate::adapter::observed_from_row;

#[cfg(feature = "snowflake")]
use snowflake_api::{QueryResult, SnowflakeApi};

#[cfg(feature = "snowflake")]
use arrow_array::cast::AsArray;

#[cfg(feature = "snowflake")]
use arrow_array::Array;

/// Builder for SnowflakeAdapter
pub struct SnowflakeAdapterBuilder {
    account: String,
    username: String,
    password: String,
    warehouse: Option<String>,
    role: Option<String>,
    database: Option<String>,
}

impl SnowflakeAdapterBuilder {
    /// Create new builder with password authentication
    pub fn with_password(
        account: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            username: username.into(),
            password: password.into(),
            warehouse: None,
            role: None,
            database: None,
        }
    }

    /// Set the warehouse to use
    pub fn with_warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.warehouse = Some(warehouse.into());
        self
    }

    /// Set the role to use
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the default database
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Build the adapter
    #[cfg(feature = "snowflake")]
    pub fn build(self) -> Result<SnowflakeAdapter, CatalogError> {
        let api = SnowflakeApi::with_password_auth(
            &self.account,
            self.warehouse.as_deref(),
            self.database.as_deref(),
            None, // schema
            &self.username,
            self.role.as_deref(),
            &self.password,
        )
        .map_err(|e| CatalogError::AuthenticationError(format!(
            "Failed to authenticate with Snowflake: {}",
            e
        )))?;

        tracing::debug!(
            account = %self.account,
            warehouse = ?self.warehouse,
            role = ?self.role,
            "created Snowflake session"
        );

        Ok(SnowflakeAdapter { api })
    }

    /// Build without snowflake feature
    #[cfg(not(feature = "snowflake"))]
    pub fn build(self) -> Result<SnowflakeAdapter, CatalogError> {
        Err(CatalogError::ConfigError(
            "Snowflake support not compiled. Rebuild with: cargo build --features snowflake".to_string()
        ))
    }
}

/// Snowflake warehouse adapter
pub struct SnowflakeAdapter {
    #[cfg(feature = "snowflake")]
    api: SnowflakeApi,

    #[cfg(not(feature = "snowflake"))]
    _phantom: std::marker::PhantomData<()>,
}

impl SnowflakeAdapter {
    /// Create a new Snowflake adapter with password authentication (returns builder)
    pub fn new(
        account: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> SnowflakeAdapterBuilder {
        SnowflakeAdapterBuilder::with_password(account, username, password)
    }

    /// Builder preloaded with account, user, password and role
    pub fn from_credentials(credentials: &Credentials) -> SnowflakeAdapterBuilder {
        SnowflakeAdapterBuilder::with_password(
            &credentials.account,
            &credentials.username,
            &credentials.password,
        )
        .with_role(&credentials.role)
    }

    #[cfg(feature = "snowflake")]
    async fn exec(&self, sql: &str) -> Result<QueryResult, String> {
        tracing::debug!(sql, "executing Snowflake statement");
        self.api.exec(sql).await.map_err(|e| e.to_string())
    }
}

/// Columns selected by the ownership query, in order
#[cfg(feature = "snowflake")]
const CATALOG_COLUMNS: [&str; 4] = ["TABLE_CATALOG", "TABLE_SCHEMA", "TABLE_NAME", "TABLE_TYPE"];

/// Position of a result column, ignoring case
#[cfg(feature = "snowflake")]
fn column_index<'a>(
    mut names: impl Iterator<Item = &'a str>,
    name: &str,
) -> Result<usize, CatalogError> {
    names
        .position(|n| n.eq_ignore_ascii_case(name))
        .ok_or_else(|| CatalogError::InvalidResponse(format!("Missing {} column", name)))
}

/// First cell of a JSON row set, if any
#[cfg(feature = "snowflake")]
fn first_json_cell(value: &serde_json::Value) -> Option<String> {
    value
        .as_array()?
        .first()?
        .as_array()?
        .first()?
        .as_str()
        .map(str::to_string)
}

#[async_trait::async_trait]
impl WarehouseAdapter for SnowflakeAdapter {
    fn name(&self) -> &'static str {
        "Snowflake"
    }

    #[cfg(feature = "snowflake")]
    async fn list_owned_objects(
        &self,
        roles: &RoleSet,
        database: &str,
    ) -> Result<Vec<ObservedObject>, CatalogError> {
        let query = owned_objects_query(roles, database)?;

        let result = self.exec(&query).await.map_err(|e| {
            if e.contains("Insufficient privileges") || e.contains("does not exist") {
                CatalogError::Unavailable(format!("Cannot read {}.INFORMATION_SCHEMA: {}", database, e))
            } else {
                CatalogError::Unavailable(e)
            }
        })?;

        let mut objects = Vec::new();

        match result {
            QueryResult::Arrow(batches) => {
                for batch in batches {
                    let schema = batch.schema();
                    let mut columns = Vec::with_capacity(CATALOG_COLUMNS.len());
                    for name in CATALOG_COLUMNS {
                        let idx = column_index(schema.fields().iter().map(|f| f.name().as_str()), name)?;
                        let column = batch.column(idx).as_string_opt::<i32>().ok_or_else(|| {
                            CatalogError::InvalidResponse(format!("{} is not a string column", name))
                        })?;
                        columns.push(column);
                    }

                    for row in 0..batch.num_rows() {
                        if columns.iter().any(|c| c.is_null(row)) {
                            return Err(CatalogError::InvalidResponse(format!(
                                "Null catalog value in row {}",
                                row
                            )));
                        }
                        objects.push(observed_from_row(
                            columns[0].value(row),
                            columns[1].value(row),
                            columns[2].value(row),
                            columns[3].value(row),
                        )?);
                    }
                }
            }
            QueryResult::Json(json) => {
                let rows = json.value.as_array().ok_or_else(|| {
                    CatalogError::InvalidResponse("Unexpected JSON result format".to_string())
                })?;

                for row in rows {
                    let cells = row.as_array().map(Vec::as_slice).unwrap_or_default();
                    match cells {
                        [catalog, schema, name, kind, ..] => {
                            let (Some(catalog), Some(schema), Some(name), Some(kind)) =
                                (catalog.as_str(), schema.as_str(), name.as_str(), kind.as_str())
                            else {
                                return Err(CatalogError::InvalidResponse(
                                    "Non-string catalog value".to_string(),
                                ));
                            };
                            objects.push(observed_from_row(catalog, schema, name, kind)?);
                        }
                        _ => {
                            return Err(CatalogError::InvalidResponse(
                                "Catalog row has fewer than four columns".to_string(),
                            ))
                        }
                    }
                }
            }
            QueryResult::Empty => {}
        }

        tracing::info!(database, count = objects.len(), "listed dbt-owned objects");
        Ok(objects)
    }

    #[cfg(not(feature = "snowflake"))]
    async fn list_owned_objects(
        &self,
        roles: &RoleSet,
        database: &str,
    ) -> Result<Vec<ObservedObject>, CatalogError> {
        owned_objects_query(roles, database)?;
        Err(CatalogError::ConfigError(
            "Snowflake support not compiled. Rebuild with: cargo build --features snowflake".to_string()
        ))
    }

    #[cfg(feature = "snowflake")]
    async fn drop_object(
        &self,
        identifier: &ObjectIdentifier,
        kind: DropKind,
    ) -> Result<String, CatalogError> {
        let sql = drop_statement(identifier, kind);

        let result = self.exec(&sql).await.map_err(|detail| CatalogError::DropFailed {
            identifier: identifier.clone(),
            detail,
        })?;

        let status = match result {
            QueryResult::Arrow(batches) => batches.first().and_then(|batch| {
                let schema = batch.schema();
                let idx = column_index(schema.fields().iter().map(|f| f.name().as_str()), "status").ok()?;
                let col = batch.column(idx).as_string_opt::<i32>()?;
                (!col.is_empty() && !col.is_null(0)).then(|| col.value(0).to_string())
            }),
            QueryResult::Json(json) => first_json_cell(&json.value),
            QueryResult::Empty => None,
        };

        Ok(status.unwrap_or_else(|| format!("{} {} dropped.", kind, identifier)))
    }

    #[cfg(not(feature = "snowflake"))]
    async fn drop_object(
        &self,
        identifier: &ObjectIdentifier,
        kind: DropKind,
    ) -> Result<String, CatalogError> {
        Err(CatalogError::DropFailed {
            identifier: identifier.clone(),
            detail: format!(
                "Snowflake support not compiled, cannot run '{}'",
                drop_statement(identifier, kind)
            ),
        })
    }

    #[cfg(feature = "snowflake")]
    async fn test_connection(&self) -> Result<(), CatalogError> {
        self.exec("SELECT 1")
            .await
            .map_err(|e| CatalogError::Unavailable(format!("Connection test failed: {}", e)))?;
        Ok(())
    }

    #[cfg(not(feature = "snowflake"))]
    async fn test_connection(&self) -> Result<(), CatalogError> {
        Err(CatalogError::ConfigError(
            "Snowflake support not compiled. Rebuild with: cargo build --features snowflake".to_string()
        ))
    }
}
