//! Warehouse catalog adapters for dbt orphan cleanup
//!
//! Adapters list the tables and views owned by dbt roles through the
//! warehouse's INFORMATION_SCHEMA and drop individual objects.
//!
//! ## Features
//!
//! Enable warehouse support via Cargo features:
//! - `snowflake` - Snowflake support
//!
//! ## Example
//!
//! ```rust,ignore
//! use dbtclean_catalog::{SnowflakeAdapter, WarehouseAdapter};
//!
//! let adapter = SnowflakeAdapter::from_credentials(&credentials)
//!     .with_warehouse("compute_etl")
//!     .build()?;
//! let objects = adapter.list_owned_objects(&roles, "adventureworks").await?;
//! ```

pub mod adapter;
pub mod mock;
pub mod snowflake;

pub use adapter::{drop_statement, owned_objects_query, observed_from_row, CatalogError, WarehouseAdapter};
pub use mock::{MockAdapter, MockAdapterBuilder, MockObject};
pub use snowflake::{SnowflakeAdapter, SnowflakeAdapterBuilder};
