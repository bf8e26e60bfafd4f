//! `apply` against a scripted catalog: statement order, failure isolation.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use inventory_athena::{AthenaConfig, ExecutionState, PollPolicy, QueryExecutor, ScriptedEngine};
use inventory_catalog::*;

const MANIFEST: &str = r#"[
    {"table_name": "aws_ec2_instance", "column_name": "instance_id", "data_type": "text"},
    {"table_name": "aws_ec2_instance", "column_name": "account_id", "data_type": "text"},
    {"table_name": "aws_vpc", "column_name": "vpc_id", "data_type": "text"},
    {"table_name": "aws_vpc", "column_name": "is_default", "data_type": "boolean"},
    {"table_name": "aws_vpc", "column_name": "tags_src", "data_type": "jsonb"},
    {"table_name": "aws_vpc", "column_name": "partition", "data_type": "text"},
    {"table_name": "aws_iam_role", "column_name": "arn", "data_type": "text"}
]"#;

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn reconciler(engine: Arc<ScriptedEngine>) -> CatalogReconciler {
    let executor = QueryExecutor::new(engine, &AthenaConfig::default()).with_policy(PollPolicy {
        interval: Duration::from_millis(1),
        deadline: Some(Duration::from_secs(5)),
    });
    let config = CatalogConfig {
        bucket: "inventory-bucket".to_string(),
        ..CatalogConfig::default()
    };
    CatalogReconciler::new(
        executor,
        ManifestReader::default(),
        DdlTemplates::bundled().unwrap(),
        &config,
    )
}

fn metadata() -> TableMetadata {
    ManifestReader::default().read_columns(MANIFEST).unwrap()
}

#[tokio::test]
async fn create_runs_table_then_view() {
    let engine = Arc::new(ScriptedEngine::new());
    let plan = ReconcilePlan::new(&set(&["vpc_vpc"]), &set(&[]));

    let report = reconciler(engine.clone()).apply(&plan, &metadata()).await.unwrap();

    assert_eq!(report.created, vec!["vpc_vpc"]);
    let statements = engine.statements();
    assert_eq!(statements.len(), 2);
    assert!(statements[0].starts_with("CREATE EXTERNAL TABLE IF NOT EXISTS `vpc_vpc_snapshots`"));
    assert!(statements[0].contains("`is_default` boolean,\n`tags_src` array<struct<Key:string,Value:string>>,\n`vpc_id` string"));
    assert!(!statements[0].contains("partition`"));
    assert!(statements[0].contains("s3://inventory-bucket/processed/"));
    assert!(statements[1].starts_with("CREATE OR REPLACE VIEW \"vpc_vpc\""));
}

#[tokio::test]
async fn drop_runs_view_then_table() {
    let engine = Arc::new(ScriptedEngine::new());
    let plan = ReconcilePlan::new(&set(&[]), &set(&["s3_bucket"]));

    let report = reconciler(engine.clone()).apply(&plan, &metadata()).await.unwrap();

    assert_eq!(report.dropped, vec!["s3_bucket"]);
    assert_eq!(
        engine.statements(),
        vec![
            "DROP VIEW IF EXISTS s3_bucket",
            "DROP TABLE IF EXISTS s3_bucket_snapshots",
        ]
    );
}

#[tokio::test]
async fn failed_table_skips_its_view_but_not_other_tables() {
    let engine = Arc::new(ScriptedEngine::new());
    engine.script_failure("`ec2_instance_snapshots`", "HIVE_METASTORE_ERROR");
    let plan = ReconcilePlan::new(&set(&["ec2_instance", "vpc_vpc"]), &set(&[]));

    let report = reconciler(engine.clone()).apply(&plan, &metadata()).await.unwrap();

    assert_eq!(report.created, vec!["vpc_vpc"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].table, "ec2_instance");
    assert_eq!(report.failed[0].action, TableAction::Create);
    assert!(report.failed[0].reason.contains("HIVE_METASTORE_ERROR"));

    // ec2 table (failed, view skipped), then vpc table + view.
    let statements = engine.statements();
    assert_eq!(statements.len(), 3);
    assert!(statements[0].contains("`ec2_instance_snapshots`"));
    assert!(statements[1].contains("`vpc_vpc_snapshots`"));
    assert!(statements[2].contains("VIEW \"vpc_vpc\""));
}

#[tokio::test]
async fn failed_view_drop_still_drops_table() {
    let engine = Arc::new(ScriptedEngine::new());
    engine.script_states("DROP VIEW IF EXISTS s3_bucket", vec![ExecutionState::Cancelled]);
    let plan = ReconcilePlan::new(&set(&[]), &set(&["s3_bucket"]));

    let report = reconciler(engine.clone()).apply(&plan, &metadata()).await.unwrap();

    assert!(report.dropped.is_empty());
    assert_eq!(report.failed[0].action, TableAction::Drop);
    assert_eq!(engine.statements().len(), 2);
}

#[tokio::test]
async fn declared_table_without_columns_is_reported() {
    let engine = Arc::new(ScriptedEngine::new());
    let plan = ReconcilePlan::new(&set(&["lambda_function", "vpc_vpc"]), &set(&[]));

    let report = reconciler(engine.clone()).apply(&plan, &metadata()).await.unwrap();

    assert_eq!(report.created, vec!["vpc_vpc"]);
    assert_eq!(report.failed[0].table, "lambda_function");
    assert_eq!(engine.statements().len(), 2);
}

#[tokio::test]
async fn unsplittable_name_aborts_before_any_ddl() {
    let engine = Arc::new(ScriptedEngine::new());
    let mut metadata = metadata();
    metadata.insert(
        "orphan".to_string(),
        TableDescriptor {
            name: "orphan".to_string(),
            columns: [("id".to_string(), "string".to_string())].into_iter().collect(),
        },
    );
    let plan = ReconcilePlan::new(&set(&["orphan", "vpc_vpc"]), &set(&[]));

    let err = reconciler(engine.clone()).apply(&plan, &metadata).await.unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::Manifest(ManifestError::UnsplittableName(_))
    ));
    assert!(engine.statements().is_empty());
}

#[tokio::test]
async fn submission_rejection_aborts_the_run() {
    let engine = Arc::new(ScriptedEngine::new());
    engine.reject("DROP VIEW", "WorkGroup inventory is disabled");
    let plan = ReconcilePlan::new(&set(&[]), &set(&["s3_bucket", "sqs_queue"]));

    let err = reconciler(engine).apply(&plan, &metadata()).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Query(_)));
}

#[tokio::test]
async fn ensure_database_creates_only_when_missing() {
    let engine = Arc::new(ScriptedEngine::new());
    assert!(reconciler(engine.clone()).ensure_database().await.unwrap());
    assert_eq!(engine.statements(), vec!["CREATE DATABASE default"]);

    let existing = Arc::new(ScriptedEngine::new());
    existing.add_database("default");
    assert!(!reconciler(existing.clone()).ensure_database().await.unwrap());
    assert!(existing.statements().is_empty());
}
