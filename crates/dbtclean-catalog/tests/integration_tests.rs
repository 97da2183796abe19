//! Integration tests for warehouse adapters
//!
//! Mock-based tests run everywhere. Tests requiring a real Snowflake account
//! are marked with `#[ignore]` and can be run with `cargo test -- --ignored`.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all non-ignored tests (no credentials required)
//! cargo test -p dbtclean-catalog --test integration_tests
//!
//! # Run Snowflake integration tests
//! SNOWFLAKE_ACCOUNT=xy12345 \
//! SNOWFLAKE_USERNAME=user \
//! SNOWFLAKE_PASSWORD=pass \
//! SNOWFLAKE_ROLE=dbt_funcrole \
//! DBTCLEAN_SNOWFLAKE_DATABASE=adventureworks \
//! cargo test -p dbtclean-catalog --features snowflake --test integration_tests -- --ignored
//! ```

mod fixtures;

use dbtclean_catalog::{CatalogError, MockAdapter, WarehouseAdapter};
use dbtclean_core::{DropKind, ObjectIdentifier, RoleSet};
use pretty_assertions::assert_eq;

/// Check if Snowflake credentials are available
fn has_snowflake_credentials() -> bool {
    std::env::var("SNOWFLAKE_ACCOUNT").is_ok() && std::env::var("SNOWFLAKE_PASSWORD").is_ok()
}

fn names(objects: &[dbtclean_core::ObservedObject]) -> Vec<String> {
    let mut names: Vec<String> = objects.iter().map(|o| o.identifier.to_string()).collect();
    names.sort();
    names
}

// =============================================================================
// Mock Adapter Tests (No credentials required)
// =============================================================================

#[tokio::test]
async fn test_lists_only_default_role_objects() {
    let adapter = fixtures::adventureworks();

    let objects = adapter
        .list_owned_objects(&RoleSet::default(), fixtures::DATABASE)
        .await
        .unwrap();

    let mut expected: Vec<String> = fixtures::DBT_OBJECTS.iter().map(|(fqn, _)| fqn.to_string()).collect();
    expected.sort();
    assert_eq!(names(&objects), expected);
}

#[tokio::test]
async fn test_extra_roles_extend_default() {
    let adapter = fixtures::adventureworks();
    let roles = RoleSet::with_default().extend(["dbt_devrole"]);

    let objects = adapter
        .list_owned_objects(&roles, "ADVENTUREWORKS")
        .await
        .unwrap();

    assert_eq!(
        objects.len(),
        fixtures::DBT_OBJECTS.len() + fixtures::DEV_OBJECTS.len()
    );
    assert!(names(&objects).contains(&"adventureworks.dbt_dev.dim_address".to_string()));
}

#[tokio::test]
async fn test_foreign_objects_are_never_listed() {
    let adapter = fixtures::adventureworks();
    let roles = RoleSet::with_default().extend(["dbt_devrole"]);

    let objects = adapter.list_owned_objects(&roles, fixtures::DATABASE).await.unwrap();
    let listed = names(&objects);

    for (fqn, _) in fixtures::FOREIGN_OBJECTS {
        assert!(!listed.contains(&fqn.to_string()), "{} should not be listed", fqn);
    }
    assert!(listed.iter().all(|n| n.starts_with("adventureworks.")));
}

#[tokio::test]
async fn test_warehouse_kinds_are_normalized() {
    let adapter = fixtures::adventureworks();

    let objects = adapter
        .list_owned_objects(&RoleSet::default(), fixtures::DATABASE)
        .await
        .unwrap();

    for object in &objects {
        let kind = object.warehouse_kind.as_str();
        assert!(kind == "base table" || kind == "view", "unexpected kind {}", kind);
        assert!(object.warehouse_kind.drop_kind().is_some());
    }
}

#[tokio::test]
async fn test_empty_catalog() {
    let adapter = MockAdapter::new();

    let objects = adapter
        .list_owned_objects(&RoleSet::default(), fixtures::DATABASE)
        .await
        .unwrap();
    assert!(objects.is_empty());
}

#[tokio::test]
async fn test_catalog_unavailable() {
    let adapter = fixtures::adventureworks_builder()
        .with_catalog_failure("Object 'ADVENTUREWORKS.INFORMATION_SCHEMA.TABLES' does not exist")
        .build();

    let result = adapter
        .list_owned_objects(&RoleSet::default(), fixtures::DATABASE)
        .await;
    assert!(matches!(result, Err(CatalogError::Unavailable(_))));
}

#[tokio::test]
async fn test_drop_then_list() {
    let adapter = fixtures::adventureworks();
    let stale = ObjectIdentifier::new("adventureworks", "marts", "dim_customer_old");

    adapter.drop_object(&stale, DropKind::Table).await.unwrap();

    let objects = adapter
        .list_owned_objects(&RoleSet::default(), fixtures::DATABASE)
        .await
        .unwrap();
    assert_eq!(objects.len(), fixtures::DBT_OBJECTS.len() - 1);
    assert!(!names(&objects).contains(&stale.to_string()));
}

#[tokio::test]
async fn test_drop_failure_leaves_object() {
    let adapter = fixtures::adventureworks_builder()
        .with_drop_error(
            "adventureworks.staging.stg_legacy_orders",
            "SQL access control error: Insufficient privileges to operate on view",
        )
        .build();
    let locked = ObjectIdentifier::new("adventureworks", "staging", "stg_legacy_orders");

    let err = adapter.drop_object(&locked, DropKind::View).await.unwrap_err();
    assert!(err.to_string().contains("Insufficient privileges"));
    assert!(adapter.has_object(&locked).await);
}

#[tokio::test]
async fn test_latency_simulation() {
    let adapter = MockAdapter::new().with_latency(100);

    let start = std::time::Instant::now();
    let _ = adapter.list_owned_objects(&RoleSet::default(), "db").await;
    let elapsed = start.elapsed();

    assert!(elapsed.as_millis() >= 100);
}

#[tokio::test]
async fn test_adapter_as_trait_object() {
    let adapter: Box<dyn WarehouseAdapter> = Box::new(fixtures::adventureworks());

    assert_eq!(adapter.name(), "Snowflake");
    assert!(adapter.test_connection().await.is_ok());
}

// =============================================================================
// Snowflake Integration Tests (require credentials)
// =============================================================================

#[tokio::test]
#[ignore]
async fn test_snowflake_connection() {
    if !has_snowflake_credentials() {
        eprintln!("Skipping Snowflake test: no credentials available");
        eprintln!("Set SNOWFLAKE_ACCOUNT, SNOWFLAKE_USERNAME, SNOWFLAKE_PASSWORD and SNOWFLAKE_ROLE");
        return;
    }

    #[cfg(feature = "snowflake")]
    {
        use dbtclean_catalog::SnowflakeAdapter;
        use dbtclean_core::Credentials;

        let credentials = Credentials::from_env().expect("Snowflake credentials must be set");
        let adapter = SnowflakeAdapter::from_credentials(&credentials)
            .with_warehouse("compute_etl")
            .build()
            .expect("Failed to create Snowflake adapter");

        adapter
            .test_connection()
            .await
            .expect("Connection test failed");

        println!("Snowflake connection successful for account: {}", credentials.account);
    }

    #[cfg(not(feature = "snowflake"))]
    {
        eprintln!("Snowflake feature not enabled. Rebuild with --features snowflake");
    }
}

#[tokio::test]
#[ignore]
async fn test_snowflake_list_owned_objects() {
    if !has_snowflake_credentials() {
        return;
    }

    #[cfg(feature = "snowflake")]
    {
        use dbtclean_catalog::SnowflakeAdapter;
        use dbtclean_core::Credentials;

        let credentials = Credentials::from_env().expect("Snowflake credentials must be set");
        let database = std::env::var("DBTCLEAN_SNOWFLAKE_DATABASE")
            .expect("DBTCLEAN_SNOWFLAKE_DATABASE must be set");

        let adapter = SnowflakeAdapter::from_credentials(&credentials)
            .with_warehouse("compute_etl")
            .with_database(&database)
            .build()
            .expect("Failed to create adapter");

        let objects = adapter
            .list_owned_objects(&RoleSet::default(), &database)
            .await
            .expect("Failed to list objects");

        println!("Found {} dbt-owned objects in {}", objects.len(), database);
        for object in &objects {
            assert_eq!(object.identifier.database(), database.to_lowercase());
        }
    }
}

#[cfg(not(feature = "snowflake"))]
#[tokio::test]
async fn test_snowflake_without_feature() {
    use dbtclean_catalog::SnowflakeAdapter;

    let result = SnowflakeAdapter::new("account", "user", "password").build();
    assert!(matches!(result, Err(CatalogError::ConfigError(msg)) if msg.contains("--features snowflake")));
}
