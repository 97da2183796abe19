//! End-to-end clean run
//!
//! Reads the declared state, then the observed state, reconciles them, asks
//! the confirmation gate and drops the confirmed orphans. A read failure
//! aborts the run before anything is shown or dropped.

use crate::confirm::ConfirmationGate;
use crate::executor::DeletionExecutor;
use crate::reconcile::{reconcile, OrphanSet};
use dbtclean_catalog::{CatalogError, WarehouseAdapter};
use dbtclean_core::{CleanReport, Diagnostic, DiagnosticCode, ObservedObject, RoleSet, Severity};
use dbtclean_dbt::{ManifestError, ManifestReader, ProjectRunner};

/// Fatal errors of a clean run
#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    #[error("Failed to read dbt project: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Failed to read warehouse catalog: {0}")]
    Catalog(#[from] CatalogError),
}

/// How a clean run ended
#[derive(Debug)]
pub enum CleanRun {
    /// No droppable orphans; the gate was not consulted
    NothingToClean {
        /// Orphans that exist but cannot be dropped
        unsupported: Vec<ObservedObject>,
    },

    /// The gate declined; nothing was dropped
    Cancelled(OrphanSet),

    /// Every confirmed orphan was attempted
    Completed(CleanReport),

    /// Orphans computed without asking or dropping
    DryRun(OrphanSet),
}

/// Wires the manifest reader, warehouse adapter, gate and executor
pub struct CleanPipeline<'a, R> {
    manifest: ManifestReader<R>,
    adapter: &'a dyn WarehouseAdapter,
    database: String,
    roles: RoleSet,
    dry_run: bool,
}

impl<'a, R: ProjectRunner> CleanPipeline<'a, R> {
    pub fn new(
        manifest: ManifestReader<R>,
        adapter: &'a dyn WarehouseAdapter,
        database: impl Into<String>,
        roles: RoleSet,
    ) -> Self {
        Self {
            manifest,
            adapter,
            database: database.into(),
            roles,
            dry_run: false,
        }
    }

    /// Stop after reconciliation
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub async fn run(&self, gate: &mut dyn ConfirmationGate) -> Result<CleanRun, CleanError> {
        tracing::info!(database = %self.database, roles = ?self.roles.to_vec(), "starting clean run");

        let declared = self.manifest.list_declared_objects(&self.database).await?;
        tracing::info!(count = declared.objects.len(), "read declared objects");

        let observed = self
            .adapter
            .list_owned_objects(&self.roles, &self.database)
            .await?;
        tracing::info!(adapter = self.adapter.name(), count = observed.len(), "read observed objects");

        let orphans = reconcile(&observed, &declared.objects);

        if self.dry_run {
            return Ok(CleanRun::DryRun(orphans));
        }

        if orphans.is_empty() {
            return Ok(CleanRun::NothingToClean {
                unsupported: orphans.unsupported,
            });
        }

        if !gate.confirm(&orphans) {
            tracing::info!(orphans = orphans.len(), "clean run cancelled");
            return Ok(CleanRun::Cancelled(orphans));
        }

        let mut report = CleanReport::new(&self.database, self.roles.to_vec());
        report.summary.observed = observed.len();
        report.summary.declared = declared.objects.len();
        report.summary.orphans = orphans.len();
        report.summary.unsupported = orphans.unsupported.len();

        for shadowed in &declared.shadowed {
            report.add_diagnostic(
                Diagnostic::new(
                    DiagnosticCode::CleanShadowedDeclaration,
                    Severity::Warn,
                    format!(
                        "{} {} replaced an earlier {} declaration",
                        shadowed.by, shadowed.identifier, shadowed.previous
                    ),
                )
                .with_object(&shadowed.identifier),
            );
        }
        for diagnostic in orphans.diagnostics {
            report.add_diagnostic(diagnostic);
        }

        let outcomes = DeletionExecutor::new(self.adapter)
            .execute(&orphans.deletable)
            .await;
        for outcome in outcomes {
            report.record_outcome(outcome);
        }

        tracing::info!(
            dropped = report.summary.dropped,
            failed = report.summary.failed,
            "clean run completed"
        );

        Ok(CleanRun::Completed(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::ScriptedConfirmation;
    use dbtclean_catalog::{MockAdapter, MockAdapterBuilder};
    use dbtclean_core::ObjectIdentifier;
    use dbtclean_dbt::{ResourceType, StaticRunner};
    use pretty_assertions::assert_eq;

    fn record(name: &str, schema: &str, materialized: &str) -> String {
        format!(
            r#"{{"name": "{}", "config": {{"schema": "{}", "materialized": "{}"}}}}"#,
            name, schema, materialized
        )
    }

    fn pipeline(runner: StaticRunner, adapter: &MockAdapter) -> CleanPipeline<'_, StaticRunner> {
        CleanPipeline::new(ManifestReader::new(runner), adapter, "db", RoleSet::default())
    }

    fn scenario_a_adapter() -> MockAdapter {
        MockAdapterBuilder::new()
            .with_object("db.s.a", "BASE TABLE", "dbt_funcrole")
            .with_object("db.s.b", "VIEW", "dbt_funcrole")
            .build()
    }

    fn scenario_a_runner() -> StaticRunner {
        StaticRunner::new().with_lines(ResourceType::Model, [record("a", "s", "table")])
    }

    #[tokio::test]
    async fn declined_confirmation_drops_nothing() {
        let adapter = scenario_a_adapter();
        let mut gate = ScriptedConfirmation::new("no");

        let run = pipeline(scenario_a_runner(), &adapter).run(&mut gate).await.unwrap();

        let CleanRun::Cancelled(orphans) = run else {
            panic!("expected a cancelled run, got {:?}", run);
        };
        let names: Vec<String> = orphans.identifiers().map(ToString::to_string).collect();
        assert_eq!(names, vec!["db.s.b"]);
        assert_eq!(orphans.deletable[0].kind, dbtclean_core::DropKind::View);
        assert_eq!(gate.times_asked(), 1);
        assert!(adapter.drop_statements().await.is_empty());
        assert_eq!(adapter.object_count().await, 2);
    }

    #[tokio::test]
    async fn confirmed_run_drops_orphans() {
        let adapter = scenario_a_adapter();
        let mut gate = ScriptedConfirmation::new("yes");

        let run = pipeline(scenario_a_runner(), &adapter).run(&mut gate).await.unwrap();

        let CleanRun::Completed(report) = run else {
            panic!("expected a completed run, got {:?}", run);
        };
        assert_eq!(report.summary.observed, 2);
        assert_eq!(report.summary.declared, 1);
        assert_eq!(report.summary.orphans, 1);
        assert_eq!(report.summary.dropped, 1);
        assert!(!report.has_failures());
        assert_eq!(adapter.drop_statements().await, vec!["drop view if exists db.s.b"]);
        assert!(adapter.has_object(&ObjectIdentifier::new("db", "s", "a")).await);
    }

    #[tokio::test]
    async fn drops_use_the_warehouse_spelling() {
        let adapter = MockAdapterBuilder::new()
            .with_catalog_object(["DB", "S", "A"], "BASE TABLE", "DBT_FUNCROLE")
            .with_catalog_object(["DB", "S", "My Table"], "BASE TABLE", "DBT_FUNCROLE")
            .with_catalog_object(["DB", "S", "my.view"], "VIEW", "DBT_FUNCROLE")
            .build();
        let mut gate = ScriptedConfirmation::new("yes");

        let run = pipeline(scenario_a_runner(), &adapter).run(&mut gate).await.unwrap();

        let CleanRun::Completed(report) = run else {
            panic!("expected a completed run, got {:?}", run);
        };
        assert_eq!(report.summary.observed, 3);
        assert_eq!(report.summary.dropped, 2);
        assert_eq!(
            adapter.drop_statements().await,
            vec![
                "drop table if exists DB.S.\"My Table\"",
                "drop view if exists DB.S.\"my.view\"",
            ]
        );
        assert_eq!(adapter.object_count().await, 1);
    }

    #[tokio::test]
    async fn empty_catalog_never_asks() {
        let adapter = MockAdapter::new();
        let mut gate = ScriptedConfirmation::new("yes");

        let run = pipeline(scenario_a_runner(), &adapter).run(&mut gate).await.unwrap();

        assert!(matches!(run, CleanRun::NothingToClean { ref unsupported } if unsupported.is_empty()));
        assert_eq!(gate.times_asked(), 0);
    }

    #[tokio::test]
    async fn unsupported_kind_is_excluded_and_reported() {
        let adapter = MockAdapterBuilder::new()
            .with_object("db.s.a", "BASE TABLE", "dbt_funcrole")
            .with_object("db.s.stage_x", "EXTERNAL STAGE", "dbt_funcrole")
            .build();
        let mut gate = ScriptedConfirmation::new("yes");

        let run = pipeline(scenario_a_runner(), &adapter).run(&mut gate).await.unwrap();

        let CleanRun::NothingToClean { unsupported } = run else {
            panic!("expected nothing to clean, got {:?}", run);
        };
        assert_eq!(unsupported.len(), 1);
        assert_eq!(unsupported[0].identifier.to_string(), "db.s.stage_x");
        assert_eq!(gate.times_asked(), 0);
        assert!(adapter.drop_statements().await.is_empty());
    }

    #[tokio::test]
    async fn partial_failure_completes_with_warnings() {
        let adapter = MockAdapterBuilder::new()
            .with_object("db.s.a", "BASE TABLE", "dbt_funcrole")
            .with_object("db.s.b", "VIEW", "dbt_funcrole")
            .with_object("db.s.c", "BASE TABLE", "dbt_funcrole")
            .with_drop_error("db.s.b", "Insufficient privileges")
            .build();
        let runner = StaticRunner::new();
        let mut gate = ScriptedConfirmation::new("YES");

        let run = pipeline(runner, &adapter).run(&mut gate).await.unwrap();

        let CleanRun::Completed(report) = run else {
            panic!("expected a completed run, got {:?}", run);
        };
        assert_eq!(report.summary.dropped, 2);
        assert_eq!(report.summary.failed, 1);
        assert!(report.has_failures());
        assert_eq!(adapter.drop_statements().await.len(), 3);
    }

    #[tokio::test]
    async fn shadowed_declarations_are_reported() {
        let adapter = MockAdapterBuilder::new()
            .with_object("db.s.lookup", "BASE TABLE", "dbt_funcrole")
            .with_object("db.s.old", "BASE TABLE", "dbt_funcrole")
            .build();
        let runner = StaticRunner::new()
            .with_lines(ResourceType::Model, [record("lookup", "s", "table")])
            .with_lines(ResourceType::Seed, [record("lookup", "s", "seed")]);
        let mut gate = ScriptedConfirmation::new("yes");

        let run = pipeline(runner, &adapter).run(&mut gate).await.unwrap();

        let CleanRun::Completed(report) = run else {
            panic!("expected a completed run, got {:?}", run);
        };
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::CleanShadowedDeclaration));
        assert_eq!(adapter.drop_statements().await, vec!["drop table if exists db.s.old"]);
    }

    #[tokio::test]
    async fn dry_run_neither_asks_nor_drops() {
        let adapter = scenario_a_adapter();
        let mut gate = ScriptedConfirmation::new("yes");

        let run = pipeline(scenario_a_runner(), &adapter)
            .with_dry_run(true)
            .run(&mut gate)
            .await
            .unwrap();

        assert!(matches!(run, CleanRun::DryRun(ref orphans) if orphans.len() == 1));
        assert_eq!(gate.times_asked(), 0);
        assert!(adapter.drop_statements().await.is_empty());
    }

    #[tokio::test]
    async fn manifest_failure_aborts_before_catalog() {
        let adapter = scenario_a_adapter();
        let runner = StaticRunner::new().with_failure(ResourceType::Model, "Could not find profile");
        let mut gate = ScriptedConfirmation::new("yes");

        let err = pipeline(runner, &adapter).run(&mut gate).await.unwrap_err();

        assert!(matches!(err, CleanError::Manifest(_)));
        assert!(adapter.executed_statements().await.is_empty());
        assert_eq!(gate.times_asked(), 0);
    }

    #[tokio::test]
    async fn catalog_failure_aborts_before_gate() {
        let adapter = MockAdapter::new().with_catalog_failure("warehouse suspended");
        let mut gate = ScriptedConfirmation::new("yes");

        let err = pipeline(scenario_a_runner(), &adapter).run(&mut gate).await.unwrap_err();

        assert!(matches!(err, CleanError::Catalog(CatalogError::Unavailable(_))));
        assert_eq!(gate.times_asked(), 0);
    }
}
