//! athena-query: run one statement and print the decoded records as JSON.

use std::sync::Arc;

use anyhow::bail;
use clap::Parser;
use tracing::info;

use inventory_athena::config::load_dotenv;
use inventory_athena::{AthenaConfig, AthenaEngine, QueryExecutor};

/// Run a SQL statement against Athena and print its rows as JSON.
#[derive(Parser, Debug)]
#[command(name = "athena-query", version, about)]
struct Cli {
    /// SQL statement to execute.
    statement: String,

    /// Override the configured database.
    #[arg(long, env = "ATHENA_DATABASE")]
    database: Option<String>,

    /// Print one compact record per line instead of a pretty array.
    #[arg(long)]
    lines: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AthenaConfig::from_env();
    if let Some(database) = cli.database {
        config.database = database;
    }

    let engine = Arc::new(AthenaEngine::new(&config).await);
    let executor = QueryExecutor::new(engine, &config);

    let execution = executor.run(&cli.statement).await?;
    if !execution.succeeded() {
        bail!(
            "query {} ended {}: {}",
            execution.id,
            execution.state,
            execution.reason()
        );
    }

    let records = executor.read_records(&execution.id).await?;
    info!(query_id = %execution.id, records = records.len(), "query complete");

    if cli.lines {
        for record in &records {
            println!("{}", serde_json::to_string(record)?);
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&records)?);
    }

    Ok(())
}
