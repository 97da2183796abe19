//! dbt project access
//!
//! This crate handles:
//! - Running `dbt ls` for models and seeds
//! - Parsing the listed JSON records into typed definitions
//! - Merging them into the declared state of the project

pub mod definition;
pub mod runner;
pub mod reader;

pub use definition::{DeclaredDefinition, ManifestError, ResourceType};
pub use runner::{ProjectRunner, DbtCommandRunner, StaticRunner};
pub use reader::{ManifestReader, DeclaredObjects, DeclaredState, Shadowed};
