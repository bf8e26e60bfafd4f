//! Alert runs end to end against a scripted engine.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use inventory_alerts::{AlertError, AlertOutcome, AlertQuery, AlertReport, AlertRunner};
use inventory_athena::{ExecutionState, ScriptedEngine};

use crate::common::{executor, page, RecordingNotifier};

#[tokio::test]
async fn empty_result_sends_nothing() {
    let engine = Arc::new(ScriptedEngine::new());
    engine.script_pages("from open_ports", vec![page(true, &[])]);
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = AlertRunner::new(executor(engine, None), notifier.clone());

    let outcome = runner
        .run_one(&AlertQuery::new("select * from open_ports", "Open ports"))
        .await
        .unwrap();

    assert_eq!(outcome, AlertOutcome::Empty);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn rows_across_pages_arrive_in_one_notification() {
    let engine = Arc::new(ScriptedEngine::new());
    engine.script_pages(
        "from public_buckets",
        vec![
            page(true, &[("111", "logs"), ("111", "backups")]),
            page(false, &[("222", "site")]),
        ],
    );
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = AlertRunner::new(executor(engine, None), notifier.clone());

    let alert = AlertQuery {
        name: Some("public-buckets".to_string()),
        query: "select * from public_buckets".to_string(),
        subject: "Public buckets".to_string(),
    };
    let outcome = runner.run_one(&alert).await.unwrap();
    assert_eq!(outcome, AlertOutcome::Notified { records: 3 });

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Public buckets");
    assert_eq!(sent[0].metadata["alert"], "public-buckets");
    assert_eq!(sent[0].metadata["records"], "3");

    let body: serde_json::Value = serde_json::from_str(&sent[0].body).unwrap();
    assert_eq!(
        body,
        json!([
            {"account": 111, "resource": "logs"},
            {"account": 111, "resource": "backups"},
            {"account": 222, "resource": "site"},
        ])
    );
}

#[tokio::test]
async fn failed_and_cancelled_queries_are_skipped() {
    let engine = Arc::new(ScriptedEngine::new());
    engine.script_failure("from broken", "SYNTAX_ERROR: line 1:8");
    engine.script_states(
        "from cancelled",
        vec![ExecutionState::Running, ExecutionState::Cancelled],
    );
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = AlertRunner::new(executor(engine, None), notifier.clone());

    let report = runner
        .run_all(&[
            AlertQuery::new("select * from broken", "Broken"),
            AlertQuery::new("select * from cancelled", "Cancelled"),
        ])
        .await
        .unwrap();

    assert_eq!(report.skipped, 2);
    assert_eq!(report.total(), 2);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn notifier_failure_does_not_stop_the_run() {
    let engine = Arc::new(ScriptedEngine::new());
    engine.script_pages("from first", vec![page(true, &[("111", "a")])]);
    engine.script_pages("from second", vec![page(true, &[("222", "b")])]);
    engine.script_pages("from third", vec![page(true, &[])]);
    let notifier = Arc::new(RecordingNotifier::failing_on("First"));
    let runner = AlertRunner::new(executor(engine.clone(), None), notifier.clone());

    let report = runner
        .run_all(&[
            AlertQuery::new("select * from first", "First"),
            AlertQuery::new("select * from second", "Second"),
            AlertQuery::new("select * from third", "Third"),
        ])
        .await
        .unwrap();

    assert_eq!(
        report,
        AlertReport {
            notified: 1,
            empty: 1,
            skipped: 0,
            failed: 1,
        }
    );
    let subjects: Vec<String> = notifier.sent().into_iter().map(|n| n.subject).collect();
    assert_eq!(subjects, vec!["First", "Second"]);
    assert_eq!(
        engine.statements(),
        vec![
            "select * from first",
            "select * from second",
            "select * from third",
        ]
    );
}

#[tokio::test]
async fn timed_out_query_is_cancelled_and_skipped() {
    let engine = Arc::new(ScriptedEngine::new());
    engine.script_states("from slow", vec![ExecutionState::Running]);
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = AlertRunner::new(
        executor(engine.clone(), Some(Duration::from_millis(20))),
        notifier.clone(),
    );

    let outcome = runner
        .run_one(&AlertQuery::new("select * from slow", "Slow"))
        .await
        .unwrap();

    assert!(matches!(outcome, AlertOutcome::Skipped { .. }));
    assert_eq!(engine.stopped().len(), 1);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn submission_rejection_aborts_the_run() {
    let engine = Arc::new(ScriptedEngine::new());
    engine.reject("from missing_table", "Table not found");
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = AlertRunner::new(executor(engine.clone(), None), notifier.clone());

    let err = runner
        .run_all(&[
            AlertQuery::new("select * from missing_table", "Missing"),
            AlertQuery::new("select * from never_reached", "Never"),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, AlertError::Query(_)));
    // Rejected submissions are never recorded, so nothing ran at all.
    assert!(engine.statements().is_empty());
}
