//! Brings the live Athena catalog in line with the declared manifest.
//!
//! Each declared table is an external snapshot table (`<name>_snapshots`) plus
//! a view (`<name>`) over its latest partition. Creation renders both DDL
//! templates; removal drops the view before the table it depends on.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{error, info, warn};

use inventory_athena::{QueryError, QueryExecution, QueryExecutor};

use crate::config::CatalogConfig;
use crate::manifest::{ManifestError, ManifestReader, TableMetadata, ALLOW_LIST_KEY, MANIFEST_KEY};
use crate::plan::ReconcilePlan;
use crate::source::{ObjectSource, SourceError};
use crate::template::{DdlTemplates, Placeholder, TemplateError, TemplateParams};

/// Errors that abort a reconciliation run.
///
/// Per-table execution failures are not errors; they end up in
/// [`ReconcileReport::failed`].
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Which half of the plan a table belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableAction {
    /// Table and view were being created.
    Create,
    /// View and snapshot table were being dropped.
    Drop,
}

/// A table the run could not reconcile. Other tables are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableFailure {
    /// Canonical table name (no snapshot suffix).
    pub table: String,
    /// What was being attempted.
    pub action: TableAction,
    /// First failure seen, as `STATE: engine reason` or the timeout message.
    pub reason: String,
}

/// Outcome of [`CatalogReconciler::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Tables whose table and view DDL both succeeded, in name order.
    pub created: Vec<String>,
    /// Tables whose view and snapshot table were both dropped, in name order.
    pub dropped: Vec<String>,
    /// Per-table failures, creates before drops.
    pub failed: Vec<TableFailure>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Canonical names of live tables: those ending in `suffix`, with it removed.
pub fn live_table_set<I, S>(names: I, suffix: &str) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .filter_map(|name| name.as_ref().strip_suffix(suffix).map(str::to_string))
        .filter(|name| !name.is_empty())
        .collect()
}

/// A table whose DDL has been rendered and is ready to execute.
struct PendingCreate {
    table: String,
    statements: [String; 2],
}

/// Diffs declared tables against the live catalog and runs the DDL to close
/// the gap, one statement at a time through a [`QueryExecutor`].
pub struct CatalogReconciler {
    executor: QueryExecutor,
    reader: ManifestReader,
    templates: DdlTemplates,
    bucket: String,
    prefix: String,
    snapshot_suffix: String,
}

impl CatalogReconciler {
    pub fn new(
        executor: QueryExecutor,
        reader: ManifestReader,
        templates: DdlTemplates,
        config: &CatalogConfig,
    ) -> Self {
        Self {
            executor,
            reader,
            templates,
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
            snapshot_suffix: config.snapshot_suffix.clone(),
        }
    }

    /// Create the target database when the catalog does not have it.
    ///
    /// Returns `true` if a `CREATE DATABASE` was issued.
    pub async fn ensure_database(&self) -> Result<bool, ReconcileError> {
        if self.executor.database_exists().await? {
            return Ok(false);
        }

        let database = self.executor.database().to_string();
        info!(database = %database, "database not found, creating");
        let execution = self.executor.run(&format!("CREATE DATABASE {database}")).await?;
        if !execution.succeeded() {
            warn!(database = %database, reason = %execution.reason(), "database creation failed");
        }
        Ok(execution.succeeded())
    }

    /// The live table set, read from the catalog listing.
    pub async fn live_tables(&self) -> Result<BTreeSet<String>, ReconcileError> {
        let names = self.executor.list_tables().await?;
        Ok(live_table_set(names, &self.snapshot_suffix))
    }

    /// Read the declared state from `source`, diff it against the catalog and apply.
    pub async fn sync(&self, source: &dyn ObjectSource) -> Result<ReconcileReport, ReconcileError> {
        let (plan, metadata) = self.plan(source).await?;
        self.apply(&plan, &metadata).await
    }

    /// Compute the plan without changing anything.
    pub async fn plan(
        &self,
        source: &dyn ObjectSource,
    ) -> Result<(ReconcilePlan, TableMetadata), ReconcileError> {
        info!(source = %source.describe(), "reading declared tables");
        let manifest = source.get_text(MANIFEST_KEY).await?;
        let metadata = self.reader.read_columns(&manifest)?;
        let listing = source.get_text(ALLOW_LIST_KEY).await?;
        let declared = self.reader.read_allowed_tables(&listing);

        let live = self.live_tables().await?;
        let plan = ReconcilePlan::new(&declared, &live);

        info!(
            declared = declared.len(),
            live = live.len(),
            to_create = plan.to_create.len(),
            to_drop = plan.to_drop.len(),
            "reconciliation planned"
        );
        Ok((plan, metadata))
    }

    /// Execute `plan`: creates first, then drops, each in name order.
    ///
    /// All create statements are rendered before anything runs, so a template
    /// or naming problem aborts the run without touching the catalog.
    pub async fn apply(
        &self,
        plan: &ReconcilePlan,
        metadata: &TableMetadata,
    ) -> Result<ReconcileReport, ReconcileError> {
        let mut report = ReconcileReport::default();

        let mut pending = Vec::with_capacity(plan.to_create.len());
        for table in &plan.to_create {
            match self.render_create(table, metadata)? {
                Some(statements) => pending.push(PendingCreate {
                    table: table.clone(),
                    statements,
                }),
                None => {
                    error!(table = %table, "no columns declared for table, skipping");
                    report.failed.push(TableFailure {
                        table: table.clone(),
                        action: TableAction::Create,
                        reason: "no columns in table metadata".to_string(),
                    });
                }
            }
        }

        for create in pending {
            info!(table = %create.table, "attempting to create table");
            match self.execute_all(&create.statements, true).await? {
                None => report.created.push(create.table),
                Some(reason) => report.failed.push(TableFailure {
                    table: create.table,
                    action: TableAction::Create,
                    reason,
                }),
            }
        }

        for table in &plan.to_drop {
            info!(table = %table, "dropping table");
            let statements = self.drop_statements(table);
            match self.execute_all(&statements, false).await? {
                None => report.dropped.push(table.clone()),
                Some(reason) => report.failed.push(TableFailure {
                    table: table.clone(),
                    action: TableAction::Drop,
                    reason,
                }),
            }
        }

        info!(
            created = report.created.len(),
            dropped = report.dropped.len(),
            failed = report.failed.len(),
            "reconciliation finished"
        );
        Ok(report)
    }

    /// Table and view DDL for `table`, or `None` when it has no columns.
    pub fn render_create(
        &self,
        table: &str,
        metadata: &TableMetadata,
    ) -> Result<Option<[String; 2]>, ReconcileError> {
        let Some(descriptor) = metadata.get(table).filter(|d| !d.columns.is_empty()) else {
            return Ok(None);
        };
        let (service, resource) = descriptor.split()?;

        let params = TemplateParams::new()
            .bind(Placeholder::Service, service)
            .bind(Placeholder::Resource, resource)
            .bind(Placeholder::Bucket, self.bucket.as_str())
            .bind(Placeholder::Prefix, self.prefix.as_str())
            .bind(Placeholder::Fields, descriptor.fields());

        Ok(Some(self.templates.render(&params)?))
    }

    /// View first, then the snapshot table it reads from.
    pub fn drop_statements(&self, table: &str) -> [String; 2] {
        [
            format!("DROP VIEW IF EXISTS {table}"),
            format!("DROP TABLE IF EXISTS {table}{}", self.snapshot_suffix),
        ]
    }

    /// Run statements in order, each to a terminal state.
    ///
    /// Returns the first failure reason. With `stop_on_failure` later
    /// statements are skipped once one fails; otherwise all are attempted.
    /// Submission errors abort the run.
    async fn execute_all(
        &self,
        statements: &[String],
        stop_on_failure: bool,
    ) -> Result<Option<String>, ReconcileError> {
        let mut first_failure = None;

        for statement in statements {
            let outcome = match self.executor.run(statement).await {
                Ok(execution) => describe_failure(&execution),
                Err(err @ QueryError::Timeout { .. }) => Some(err.to_string()),
                Err(err) => return Err(err.into()),
            };

            if let Some(reason) = outcome {
                error!(reason = %reason, "resource creation error");
                if first_failure.is_none() {
                    first_failure = Some(reason);
                }
                if stop_on_failure {
                    break;
                }
            }
        }

        Ok(first_failure)
    }
}

fn describe_failure(execution: &QueryExecution) -> Option<String> {
    if execution.succeeded() {
        None
    } else {
        Some(format!("{}: {}", execution.state, execution.reason()))
    }
}
