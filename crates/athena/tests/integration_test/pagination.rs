//! Paged result reading and catalog listing.

use std::sync::Arc;
use std::time::Duration;

use futures::TryStreamExt;
use serde_json::json;

use inventory_athena::*;

fn executor(engine: Arc<ScriptedEngine>) -> QueryExecutor {
    QueryExecutor::new(engine, &AthenaConfig::default()).with_policy(PollPolicy {
        interval: Duration::from_millis(1),
        deadline: None,
    })
}

fn page(rows: &[&[Option<&str>]]) -> ResultPage {
    ResultPage {
        columns: vec!["account".to_string(), "count".to_string(), "tags".to_string()],
        rows: rows
            .iter()
            .map(|r| r.iter().map(|c| c.map(str::to_string)).collect())
            .collect(),
        next_token: None,
    }
}

fn three_pages() -> Vec<ResultPage> {
    vec![
        page(&[
            &[Some("account"), Some("count"), Some("tags")],
            &[Some("111"), Some("4"), Some(r#"{"env":"prod"}"#)],
            &[Some("222"), Some("0"), None],
        ]),
        page(&[
            &[Some("333"), Some("7"), Some("[]")],
            &[Some("444"), Some("1"), Some("not json")],
        ]),
        page(&[&[Some("555"), Some("2"), None]]),
    ]
}

#[tokio::test]
async fn read_results_follows_every_token() {
    let engine = Arc::new(ScriptedEngine::new());
    engine.script_pages("from findings", three_pages());
    let executor = executor(engine);

    let execution = executor.run("select * from findings").await.unwrap();
    let pages: Vec<ResultPage> = executor
        .read_results(&execution.id)
        .try_collect()
        .await
        .unwrap();

    assert_eq!(pages.len(), 3);
    let total_rows: usize = pages.iter().map(ResultPage::row_count).sum();
    assert_eq!(total_rows, 6);
    assert!(pages[2].is_last());
}

#[tokio::test]
async fn read_records_drops_only_the_first_header() {
    let engine = Arc::new(ScriptedEngine::new());
    engine.script_pages("from findings", three_pages());
    let executor = executor(engine);

    let execution = executor.run("select * from findings").await.unwrap();
    let records = executor.read_records(&execution.id).await.unwrap();

    assert_eq!(records.len(), 5);
    assert_eq!(records[0]["account"], json!(111));
    assert_eq!(records[0]["tags"], json!({"env": "prod"}));
    assert_eq!(records[1]["tags"], serde_json::Value::Null);
    assert_eq!(records[2]["account"], json!(333));
    assert_eq!(records[3]["tags"], json!("not json"));
    assert_eq!(records[4]["count"], json!(2));
}

#[tokio::test]
async fn empty_result_set_yields_no_records() {
    let engine = Arc::new(ScriptedEngine::new());
    engine.script_pages(
        "from nothing",
        vec![page(&[&[Some("account"), Some("count"), Some("tags")]])],
    );
    let executor = executor(engine);

    let execution = executor.run("select * from nothing").await.unwrap();
    assert!(executor.read_records(&execution.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_tables_spans_pages() {
    let engine = Arc::new(ScriptedEngine::new());
    engine.set_table_pages(vec![
        vec!["ec2_instance_snapshots", "ec2_instance"],
        vec!["s3_bucket_snapshots"],
        vec![],
    ]);
    let executor = executor(engine);

    let tables = executor.list_tables().await.unwrap();
    assert_eq!(
        tables,
        vec!["ec2_instance_snapshots", "ec2_instance", "s3_bucket_snapshots"]
    );
}
