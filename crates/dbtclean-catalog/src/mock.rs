//! Mock warehouse adapter for testing
//!
//! This adapter keeps a small in-memory catalog instead of connecting to a
//! warehouse. It's useful for:
//! - Unit testing reconciliation and deletion logic
//! - End-to-end tests of the clean pipeline
//! - Simulating catalog outages and per-object drop failures
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dbtclean_catalog::{MockAdapterBuilder, WarehouseAdapter};
//!
//! let adapter = MockAdapterBuilder::new()
//!     .with_object("db.marts.dim_address", "BASE TABLE", "DBT_FUNCROLE")
//!     .with_object("db.marts.old_view", "VIEW", "DBT_FUNCROLE")
//!     .build();
//!
//! let objects = adapter.list_owned_objects(&RoleSet::default(), "db").await?;
//! ```
//!
//! ## Simulating Failures
//!
//! ```rust,ignore
//! // Catalog query fails
//! let adapter = MockAdapter::new().with_catalog_failure("warehouse suspended");
//!
//! // One drop fails, the rest succeed
//! let adapter = MockAdapterBuilder::new()
//!     .with_object("db.s.a", "VIEW", "dbt_funcrole")
//!     .with_drop_error("db.s.a", "Insufficient privileges")
//!     .build();
//! ```

use crate::adapter::{drop_statement, owned_objects_query, CatalogError, WarehouseAdapter};
use dbtclean_core::{DropKind, ObjectIdentifier, ObservedObject, RoleSet, WarehouseKind};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// One object in the mock catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockObject {
    pub observed: ObservedObject,
    /// Owning role, compared case-insensitively
    pub owner: String,
}

/// Mock warehouse adapter for testing
///
/// Objects are shared between clones, so a test can keep a handle to the
/// adapter it passed to the pipeline and inspect it afterwards. Dropping an
/// object removes it from the catalog; every statement is recorded.
///
/// # Example
///
/// ```rust,ignore
/// let adapter = MockAdapter::new()
///     .with_latency(50)  // 50ms simulated latency
///     .with_connection_failure();  // Fail connection tests
/// ```
pub struct MockAdapter {
    /// Catalog contents by identifier
    objects: Arc<RwLock<BTreeMap<ObjectIdentifier, MockObject>>>,

    /// Error details returned when dropping specific objects
    drop_errors: Arc<RwLock<HashMap<ObjectIdentifier, String>>>,

    /// Statements executed so far, in order
    statements: Arc<RwLock<Vec<String>>>,

    /// Fail every catalog listing with this detail
    catalog_failure: Option<String>,

    /// Simulate connection failure
    fail_connection: bool,

    /// Simulate query latency (milliseconds)
    latency_ms: u64,

    /// Name to return from name() method
    adapter_name: &'static str,
}

impl MockAdapter {
    /// Create a new mock adapter with an empty catalog
    pub fn new() -> Self {
        MockAdapterBuilder::new().build()
    }

    /// Add an object to the catalog
    ///
    /// An `fqn` that is not fully qualified is an `InvalidResponse`.
    pub async fn add_object(
        &self,
        fqn: &str,
        table_type: &str,
        owner: &str,
    ) -> Result<(), CatalogError> {
        let object = mock_object(fqn, table_type, owner)?;
        self.objects
            .write()
            .await
            .insert(object.observed.identifier.clone(), object);
        Ok(())
    }

    /// Make dropping one object fail with `detail`
    pub async fn add_drop_error(&self, identifier: ObjectIdentifier, detail: impl Into<String>) {
        self.drop_errors.write().await.insert(identifier, detail.into());
    }

    /// Fail every catalog listing
    pub fn with_catalog_failure(mut self, detail: impl Into<String>) -> Self {
        self.catalog_failure = Some(detail.into());
        self
    }

    /// Configure to fail all connection tests
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Configure simulated latency for all operations
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Set a custom adapter name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.adapter_name = name;
        self
    }

    /// Number of objects still in the catalog
    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Check whether an object is still in the catalog
    pub async fn has_object(&self, identifier: &ObjectIdentifier) -> bool {
        self.objects.read().await.contains_key(identifier)
    }

    /// Statements executed so far, in order
    pub async fn executed_statements(&self) -> Vec<String> {
        self.statements.read().await.clone()
    }

    /// Drop statements executed so far, in order
    pub async fn drop_statements(&self) -> Vec<String> {
        self.statements
            .read()
            .await
            .iter()
            .filter(|s| s.starts_with("drop "))
            .cloned()
            .collect()
    }

    async fn simulate_latency(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockAdapter {
    fn clone(&self) -> Self {
        Self {
            objects: Arc::clone(&self.objects),
            drop_errors: Arc::clone(&self.drop_errors),
            statements: Arc::clone(&self.statements),
            catalog_failure: self.catalog_failure.clone(),
            fail_connection: self.fail_connection,
            latency_ms: self.latency_ms,
            adapter_name: self.adapter_name,
        }
    }
}

#[async_trait::async_trait]
impl WarehouseAdapter for MockAdapter {
    fn name(&self) -> &'static str {
        self.adapter_name
    }

    async fn list_owned_objects(
        &self,
        roles: &RoleSet,
        database: &str,
    ) -> Result<Vec<ObservedObject>, CatalogError> {
        self.simulate_latency().await;

        let query = owned_objects_query(roles, database)?;
        self.statements.write().await.push(query);

        if let Some(detail) = &self.catalog_failure {
            return Err(CatalogError::Unavailable(detail.clone()));
        }

        let database = database.trim().to_lowercase();
        let objects = self.objects.read().await;

        Ok(objects
            .values()
            .filter(|o| o.observed.identifier.database() == database && roles.contains(&o.owner))
            .map(|o| o.observed.clone())
            .collect())
    }

    async fn drop_object(
        &self,
        identifier: &ObjectIdentifier,
        kind: DropKind,
    ) -> Result<String, CatalogError> {
        self.simulate_latency().await;
        self.statements
            .write()
            .await
            .push(drop_statement(identifier, kind));

        if let Some(detail) = self.drop_errors.read().await.get(identifier) {
            return Err(CatalogError::DropFailed {
                identifier: identifier.clone(),
                detail: detail.clone(),
            });
        }

        let name = identifier.name().to_uppercase();
        match self.objects.write().await.remove(identifier) {
            Some(_) => Ok(format!("{} successfully dropped.", name)),
            None => Ok(format!(
                "Drop statement executed successfully ({} already dropped).",
                name
            )),
        }
    }

    async fn test_connection(&self) -> Result<(), CatalogError> {
        self.simulate_latency().await;

        if self.fail_connection {
            Err(CatalogError::Unavailable(
                "Simulated connection failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

fn mock_object(fqn: &str, table_type: &str, owner: &str) -> Result<MockObject, CatalogError> {
    let identifier = ObjectIdentifier::parse(fqn)
        .map_err(|e| CatalogError::InvalidResponse(e.to_string()))?;

    Ok(MockObject {
        observed: ObservedObject::new(identifier, WarehouseKind::new(table_type)),
        owner: owner.trim().to_lowercase(),
    })
}

/// Builder for creating MockAdapter with a prepared catalog
///
/// # Example
///
/// ```rust,ignore
/// let adapter = MockAdapterBuilder::new()
///     .with_object("db.marts.dim_address", "BASE TABLE", "dbt_funcrole")
///     .with_object("db.staging.stg_address", "VIEW", "dbt_funcrole")
///     .with_object("db.raw.address", "BASE TABLE", "loader")
///     .with_latency(50)
///     .build();
/// ```
pub struct MockAdapterBuilder {
    objects: BTreeMap<ObjectIdentifier, MockObject>,
    drop_errors: HashMap<ObjectIdentifier, String>,
    catalog_failure: Option<String>,
    fail_connection: bool,
    latency_ms: u64,
    adapter_name: &'static str,
}

impl MockAdapterBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            drop_errors: HashMap::new(),
            catalog_failure: None,
            fail_connection: false,
            latency_ms: 0,
            adapter_name: "Mock",
        }
    }

    /// Add an object given as `database.schema.name`
    ///
    /// Entries that are not fully qualified are skipped with a warning.
    pub fn with_object(mut self, fqn: &str, table_type: &str, owner: &str) -> Self {
        match mock_object(fqn, table_type, owner) {
            Ok(object) => {
                self.objects.insert(object.observed.identifier.clone(), object);
            }
            Err(e) => tracing::warn!(fqn, error = %e, "skipping mock object"),
        }
        self
    }

    /// Add an object spelled exactly as the warehouse catalog stores it
    ///
    /// Unlike `with_object`, the parts are not split on dots and keep their
    /// case, so drop statements quote them the way Snowflake needs.
    pub fn with_catalog_object(
        mut self,
        parts: [&str; 3],
        table_type: &str,
        owner: &str,
    ) -> Self {
        let [database, schema, name] = parts;
        match ObjectIdentifier::from_catalog(database, schema, name) {
            Ok(identifier) => {
                let object = MockObject {
                    observed: ObservedObject::new(identifier, WarehouseKind::new(table_type)),
                    owner: owner.trim().to_lowercase(),
                };
                self.objects.insert(object.observed.identifier.clone(), object);
            }
            Err(e) => tracing::warn!(name, error = %e, "skipping mock object"),
        }
        self
    }

    /// Make dropping `fqn` fail with `detail`
    pub fn with_drop_error(mut self, fqn: &str, detail: impl Into<String>) -> Self {
        match ObjectIdentifier::parse(fqn) {
            Ok(identifier) => {
                self.drop_errors.insert(identifier, detail.into());
            }
            Err(e) => tracing::warn!(fqn, error = %e, "skipping mock drop error"),
        }
        self
    }

    /// Fail every catalog listing
    pub fn with_catalog_failure(mut self, detail: impl Into<String>) -> Self {
        self.catalog_failure = Some(detail.into());
        self
    }

    /// Configure connection failure
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Configure latency
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Set adapter name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.adapter_name = name;
        self
    }

    /// Build the MockAdapter
    pub fn build(self) -> MockAdapter {
        MockAdapter {
            objects: Arc::new(RwLock::new(self.objects)),
            drop_errors: Arc::new(RwLock::new(self.drop_errors)),
            statements: Arc::new(RwLock::new(Vec::new())),
            catalog_failure: self.catalog_failure,
            fail_connection: self.fail_connection,
            latency_ms: self.latency_ms,
            adapter_name: self.adapter_name,
        }
    }
}

impl Default for MockAdapterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
