//! create-tables: reconcile the Athena catalog with the declared manifest.
//!
//! Reads `config/table_metadata.json` and `config/tables.txt` from the
//! inventory bucket (or a local directory), lists the live snapshot tables,
//! then creates missing tables and drops stale ones.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{info, warn};

use inventory_athena::config::load_dotenv;
use inventory_athena::{load_sdk_config, AthenaConfig, AthenaEngine, QueryExecutor};
use inventory_catalog::{
    CatalogConfig, CatalogReconciler, DdlTemplates, LocalSource, ManifestReader,
    NormalizationRules, ObjectSource, S3Source,
};

// ── CLI ─────────────────────────────────────────────────────────────

/// Create and drop Athena tables so the catalog matches the manifest.
#[derive(Parser, Debug)]
#[command(name = "create-tables", version, about)]
struct Cli {
    /// Read `config/*` from this directory instead of the bucket.
    #[arg(long)]
    source_dir: Option<PathBuf>,

    /// Directory holding template-table.sql and template-view.sql.
    /// Overrides `INVENTORY_TEMPLATE_DIR`.
    #[arg(long)]
    templates: Option<PathBuf>,

    /// YAML file overriding the normalization rules. Overrides `INVENTORY_RULES`.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Create the database first if it does not exist.
    #[arg(long)]
    ensure_database: bool,

    /// Print the plan and exit without executing any DDL.
    #[arg(long)]
    dry_run: bool,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let athena_config = AthenaConfig::from_env();
    let catalog_config = CatalogConfig::from_env().with_paths(cli.templates, cli.rules);
    if !catalog_config.is_configured() && cli.source_dir.is_none() {
        bail!("INVENTORY_BUCKET is not set");
    }

    let templates = match &catalog_config.template_dir {
        Some(dir) => DdlTemplates::load_dir(dir)
            .with_context(|| format!("loading templates from {}", dir.display()))?,
        None => DdlTemplates::bundled()?,
    };

    let rules = match &catalog_config.rules_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading rules {}", path.display()))?;
            NormalizationRules::from_yaml(&text)?
        }
        None => NormalizationRules::default(),
    };

    let sdk_config = load_sdk_config(&athena_config.region).await;
    let engine = Arc::new(AthenaEngine::from_sdk_config(&sdk_config, &athena_config));
    let executor = QueryExecutor::new(engine, &athena_config);

    let source: Box<dyn ObjectSource> = match cli.source_dir {
        Some(dir) => Box::new(LocalSource::new(dir)),
        None => Box::new(S3Source::new(&sdk_config, catalog_config.bucket.clone())),
    };

    let reconciler = CatalogReconciler::new(
        executor,
        ManifestReader::new(rules),
        templates,
        &catalog_config,
    );

    if cli.ensure_database && reconciler.ensure_database().await? {
        info!(database = %athena_config.database, "database created");
    }

    let (plan, metadata) = reconciler.plan(source.as_ref()).await?;

    if cli.dry_run {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    if plan.is_noop() {
        info!("catalog already matches manifest");
        return Ok(());
    }

    let report = reconciler.apply(&plan, &metadata).await?;
    for failure in &report.failed {
        warn!(
            table = %failure.table,
            action = ?failure.action,
            reason = %failure.reason,
            "table not reconciled"
        );
    }

    if !report.is_clean() {
        bail!("{} table(s) failed to reconcile", report.failed.len());
    }
    Ok(())
}
