//! alerts: run the configured inventory alert queries once.
//!
//! Each query that returns rows produces one notification carrying every
//! row as JSON. Without a webhook URL the notifications are logged.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use inventory_alerts::{AlertQuery, AlertRunner, AlertsConfig};
use inventory_athena::config::load_dotenv;
use inventory_athena::{AthenaConfig, AthenaEngine, QueryExecutor};
use inventory_notify::{LogNotifier, Notifier, WebhookNotifier};

#[derive(Parser, Debug)]
#[command(name = "alerts", version, about)]
struct Cli {
    /// Alert list (YAML, or JSON with a `.json` extension).
    #[arg(long)]
    alerts: Option<PathBuf>,

    /// Webhook receiving notifications. Supports `${VAR}` references.
    #[arg(long)]
    webhook_url: Option<String>,

    /// Log notifications instead of delivering them.
    #[arg(long)]
    dry_run: bool,

    /// Exit non-zero if any notification could not be delivered.
    #[arg(long)]
    strict: bool,
}

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

    let mut config = AlertsConfig::from_env();
    if let Some(path) = cli.alerts {
        config.alerts_path = path;
    }
    if cli.webhook_url.is_some() {
        config.webhook_url = cli.webhook_url;
    }

    let alerts = AlertQuery::load_file(&config.alerts_path)?;
    info!(
        path = %config.alerts_path.display(),
        alerts = alerts.len(),
        "Loaded alerts"
    );

    let notifier: Arc<dyn Notifier> = match (&config.webhook_url, cli.dry_run) {
        (Some(url), false) => Arc::new(
            WebhookNotifier::from_config(
                url,
                config.webhook_method.as_deref(),
                Some(config.webhook_headers.clone()),
            )
            .context("configuring webhook notifier")?,
        ),
        _ => Arc::new(LogNotifier),
    };

    let athena_config = AthenaConfig::from_env();
    let engine = Arc::new(AthenaEngine::new(&athena_config).await);
    let runner = AlertRunner::new(QueryExecutor::new(engine, &athena_config), notifier);

    let report = runner.run_all(&alerts).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if cli.strict && report.failed > 0 {
        bail!("{} alert notification(s) failed", report.failed);
    }
    Ok(())
}
