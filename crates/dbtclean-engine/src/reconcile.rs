//! Reconciliation of observed warehouse objects against declared dbt objects
//!
//! An orphan is an observed object whose identifier is not declared by any
//! model or seed. Only identifiers are compared: a project that declares
//! `db.s.a` as a view keeps a warehouse table `db.s.a` alive.

use dbtclean_core::{
    Diagnostic, DiagnosticCode, DropKind, ObjectIdentifier, ObservedObject, Severity, WarehouseKind,
};
use dbtclean_dbt::DeclaredObjects;
use serde::Serialize;
use std::collections::BTreeMap;

/// An orphan that can be dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Orphan {
    pub identifier: ObjectIdentifier,

    /// Statement kind resolved from the warehouse type
    pub kind: DropKind,

    /// Type as reported by the catalog
    pub warehouse_kind: WarehouseKind,
}

/// Result of a reconciliation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrphanSet {
    /// Orphans that will be dropped, sorted by identifier
    pub deletable: Vec<Orphan>,

    /// Orphans whose warehouse type cannot be dropped, sorted by identifier
    pub unsupported: Vec<ObservedObject>,

    /// One diagnostic per orphan
    pub diagnostics: Vec<Diagnostic>,
}

impl OrphanSet {
    /// True when there is nothing to drop
    ///
    /// Unsupported orphans do not count: they are reported, never dropped.
    pub fn is_empty(&self) -> bool {
        self.deletable.is_empty()
    }

    /// Number of deletable orphans
    pub fn len(&self) -> usize {
        self.deletable.len()
    }

    /// Total orphans including unsupported ones
    pub fn total(&self) -> usize {
        self.deletable.len() + self.unsupported.len()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &ObjectIdentifier> {
        self.deletable.iter().map(|o| &o.identifier)
    }
}

/// Compute the orphans among `observed`
///
/// Duplicate observed identifiers collapse to one entry, keeping the kind
/// reported last. The result does not depend on the order of `observed`
/// apart from that rule.
pub fn reconcile(observed: &[ObservedObject], declared: &DeclaredObjects) -> OrphanSet {
    let mut candidates: BTreeMap<&ObjectIdentifier, &WarehouseKind> = BTreeMap::new();
    for object in observed {
        if !declared.contains(&object.identifier) {
            candidates.insert(&object.identifier, &object.warehouse_kind);
        }
    }

    let mut orphans = OrphanSet::default();

    for (identifier, warehouse_kind) in candidates {
        match warehouse_kind.drop_kind() {
            Some(kind) => {
                orphans.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::CleanOrphanFound,
                        Severity::Info,
                        format!("{} {} is not declared by the project", kind, identifier),
                    )
                    .with_object(identifier),
                );
                orphans.deletable.push(Orphan {
                    identifier: identifier.clone(),
                    kind,
                    warehouse_kind: warehouse_kind.clone(),
                });
            }
            None => {
                tracing::warn!(
                    identifier = %identifier,
                    warehouse_kind = %warehouse_kind,
                    "orphan has an unsupported object kind and will not be dropped"
                );
                orphans.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::CleanUnsupportedObjectKind,
                        Severity::Warn,
                        format!(
                            "{} is not declared by the project but its type '{}' cannot be dropped",
                            identifier, warehouse_kind
                        ),
                    )
                    .with_object(identifier)
                    .with_detail(warehouse_kind.as_str()),
                );
                orphans.unsupported.push(ObservedObject::new(
                    identifier.clone(),
                    warehouse_kind.clone(),
                ));
            }
        }
    }

    tracing::info!(
        observed = observed.len(),
        declared = declared.len(),
        orphans = orphans.len(),
        unsupported = orphans.unsupported.len(),
        "reconciled catalog against project"
    );

    orphans
}
