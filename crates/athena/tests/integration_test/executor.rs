//! Lifecycle tests: submission target, terminal states, statement logging order.

use std::sync::Arc;
use std::time::Duration;

use inventory_athena::*;

fn executor(engine: Arc<ScriptedEngine>) -> QueryExecutor {
    let config = AthenaConfig {
        database: "inventory".to_string(),
        catalog: "AwsDataCatalog".to_string(),
        workgroup: "inventory".to_string(),
        ..AthenaConfig::default()
    };
    QueryExecutor::new(engine, &config).with_policy(PollPolicy {
        interval: Duration::from_millis(1),
        deadline: Some(Duration::from_secs(5)),
    })
}

#[tokio::test]
async fn submit_carries_database_catalog_and_workgroup() {
    let engine = Arc::new(ScriptedEngine::new());
    let executor = executor(engine.clone());

    let id = executor.submit(&executor.query("select 1")).await.unwrap();
    assert!(!id.is_empty());

    let submitted = engine.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].database, "inventory");
    assert_eq!(submitted[0].catalog, "AwsDataCatalog");
    assert_eq!(submitted[0].workgroup, "inventory");
}

#[tokio::test]
async fn cancelled_query_is_terminal_without_error() {
    let engine = Arc::new(ScriptedEngine::new());
    engine.script_states(
        "select cancelled",
        vec![ExecutionState::Queued, ExecutionState::Cancelled],
    );
    let executor = executor(engine);

    let execution = executor.run("select cancelled").await.unwrap();
    assert_eq!(execution.state, ExecutionState::Cancelled);
    assert!(execution.failure_reason.is_none());
}

#[tokio::test]
async fn sequential_runs_execute_in_order() {
    let engine = Arc::new(ScriptedEngine::new());
    let executor = executor(engine.clone());

    for statement in ["create database a", "create database b", "drop database a"] {
        executor.run(statement).await.unwrap();
    }
    assert_eq!(
        engine.statements(),
        vec!["create database a", "create database b", "drop database a"]
    );
}

#[tokio::test]
async fn database_existence_is_reported() {
    let engine = Arc::new(ScriptedEngine::new());
    engine.add_database("inventory");
    assert!(executor(engine).database_exists().await.unwrap());

    let empty = Arc::new(ScriptedEngine::new());
    assert!(!executor(empty).database_exists().await.unwrap());
}
