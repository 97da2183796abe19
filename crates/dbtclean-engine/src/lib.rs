//! dbtclean engine - clean run logic
//!
//! This crate implements:
//! - Reconciliation of observed against declared objects
//! - The confirmation gate
//! - Sequential deletion with per-object failure isolation
//! - The end-to-end clean pipeline

pub mod reconcile;
pub mod confirm;
pub mod executor;
pub mod pipeline;

pub use reconcile::{reconcile, Orphan, OrphanSet};
pub use confirm::{is_affirmative, AutoApprove, ConfirmationGate, ScriptedConfirmation};
pub use executor::DeletionExecutor;
pub use pipeline::{CleanError, CleanPipeline, CleanRun};
