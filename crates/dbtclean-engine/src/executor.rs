//! Deletion executor
//!
//! Drops confirmed orphans one at a time. A failed drop is recorded and the
//! loop moves on; nothing is retried.

use crate::reconcile::Orphan;
use dbtclean_catalog::{CatalogError, WarehouseAdapter};
use dbtclean_core::DropOutcome;

pub struct DeletionExecutor<'a> {
    adapter: &'a dyn WarehouseAdapter,
}

impl<'a> DeletionExecutor<'a> {
    pub fn new(adapter: &'a dyn WarehouseAdapter) -> Self {
        Self { adapter }
    }

    /// Drop every orphan, returning one outcome per orphan in identifier order
    pub async fn execute(&self, orphans: &[Orphan]) -> Vec<DropOutcome> {
        let mut ordered: Vec<&Orphan> = orphans.iter().collect();
        ordered.sort_by(|a, b| a.identifier.cmp(&b.identifier));

        let mut outcomes = Vec::with_capacity(ordered.len());

        for orphan in ordered {
            let outcome = match self.adapter.drop_object(&orphan.identifier, orphan.kind).await {
                Ok(status) => {
                    tracing::info!(identifier = %orphan.identifier, kind = %orphan.kind, "dropped");
                    DropOutcome::dropped(orphan.identifier.clone(), orphan.kind, status)
                }
                Err(e) => {
                    let detail = match e {
                        CatalogError::DropFailed { detail, .. } => detail,
                        other => other.to_string(),
                    };
                    tracing::warn!(
                        identifier = %orphan.identifier,
                        kind = %orphan.kind,
                        error = %detail,
                        "drop failed"
                    );
                    DropOutcome::failed(orphan.identifier.clone(), orphan.kind, detail)
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}
