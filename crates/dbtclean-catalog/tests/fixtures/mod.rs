//! Test fixtures for warehouse adapter integration tests
//!
//! A small AdventureWorks-style catalog: dbt-owned marts and staging
//! objects, a couple of stale leftovers, and raw tables owned by the
//! loader role.

use dbtclean_catalog::{MockAdapter, MockAdapterBuilder};

pub const DATABASE: &str = "adventureworks";

/// Objects owned by `dbt_funcrole`
pub const DBT_OBJECTS: &[(&str, &str)] = &[
    ("adventureworks.marts.dim_address", "BASE TABLE"),
    ("adventureworks.marts.dim_customer", "BASE TABLE"),
    ("adventureworks.marts.fct_sales", "BASE TABLE"),
    ("adventureworks.staging.stg_address", "VIEW"),
    ("adventureworks.staging.stg_customer", "VIEW"),
    ("adventureworks.marts.dim_customer_old", "BASE TABLE"),
    ("adventureworks.staging.stg_legacy_orders", "VIEW"),
];

/// Objects owned by the developer role
pub const DEV_OBJECTS: &[(&str, &str)] = &[
    ("adventureworks.dbt_dev.dim_address", "BASE TABLE"),
];

/// Objects owned by roles outside dbt
pub const FOREIGN_OBJECTS: &[(&str, &str)] = &[
    ("adventureworks.raw.address", "BASE TABLE"),
    ("adventureworks.raw.customer", "BASE TABLE"),
];

/// Builder preloaded with the whole fixture catalog
pub fn adventureworks_builder() -> MockAdapterBuilder {
    let mut builder = MockAdapterBuilder::new().with_name("Snowflake");

    for (fqn, kind) in DBT_OBJECTS {
        builder = builder.with_object(fqn, kind, "DBT_FUNCROLE");
    }
    for (fqn, kind) in DEV_OBJECTS {
        builder = builder.with_object(fqn, kind, "DBT_DEVROLE");
    }
    for (fqn, kind) in FOREIGN_OBJECTS {
        builder = builder.with_object(fqn, kind, "LOADER");
    }

    // Same names in a different database must never be listed
    builder.with_object("analytics.marts.dim_address", "BASE TABLE", "DBT_FUNCROLE")
}

pub fn adventureworks() -> MockAdapter {
    adventureworks_builder().build()
}
