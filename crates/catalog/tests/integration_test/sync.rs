//! Full runs: declared state from disk, live state from the catalog listing.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use inventory_athena::{AthenaConfig, PollPolicy, QueryExecutor, ScriptedEngine};
use inventory_catalog::*;

const MANIFEST: &str = r#"[
    {"table_name": "aws_ec2_instance", "column_name": "instance_id", "data_type": "text"},
    {"table_name": "aws_ec2_instance", "column_name": "account_id", "data_type": "text"},
    {"table_name": "aws_vpc", "column_name": "vpc_id", "data_type": "text"},
    {"table_name": "aws_vpc", "column_name": "akas", "data_type": "jsonb"},
    {"table_name": "aws_s3_bucket", "column_name": "name", "data_type": "text"}
]"#;

const TABLES: &str = "aws_ec2_instance|Amazon EC2 instances\naws_vpc|Amazon VPCs\n";

fn write_config(root: &Path, manifest: &str, tables: &str) {
    std::fs::create_dir_all(root.join("config")).unwrap();
    std::fs::write(root.join("config/table_metadata.json"), manifest).unwrap();
    std::fs::write(root.join("config/tables.txt"), tables).unwrap();
}

fn reconciler(engine: Arc<ScriptedEngine>) -> CatalogReconciler {
    let executor = QueryExecutor::new(engine, &AthenaConfig::default()).with_policy(PollPolicy {
        interval: Duration::from_millis(1),
        deadline: None,
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

#[tokio::test]
async fn creates_vpc_and_drops_s3_bucket() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), MANIFEST, TABLES);

    let engine = Arc::new(ScriptedEngine::new());
    engine.set_table_pages(vec![
        vec!["ec2_instance_snapshots", "ec2_instance"],
        vec!["s3_bucket_snapshots", "s3_bucket"],
    ]);

    let reconciler = reconciler(engine.clone());
    let source = LocalSource::new(dir.path());

    let (plan, _) = reconciler.plan(&source).await.unwrap();
    assert_eq!(plan.to_create.iter().collect::<Vec<_>>(), vec!["vpc_vpc"]);
    assert_eq!(plan.to_drop.iter().collect::<Vec<_>>(), vec!["s3_bucket"]);
    assert_eq!(plan.unchanged.iter().collect::<Vec<_>>(), vec!["ec2_instance"]);

    let report = reconciler.sync(&source).await.unwrap();
    assert_eq!(report.created, vec!["vpc_vpc"]);
    assert_eq!(report.dropped, vec!["s3_bucket"]);
    assert!(report.is_clean());

    let statements = engine.statements();
    assert_eq!(statements.len(), 4);
    assert!(statements[0].contains("`vpc_vpc_snapshots`"));
    assert!(statements[0].contains("`akas` array<string>"));
    assert!(statements[1].contains("VIEW \"vpc_vpc\""));
    assert_eq!(statements[2], "DROP VIEW IF EXISTS s3_bucket");
    assert_eq!(statements[3], "DROP TABLE IF EXISTS s3_bucket_snapshots");
}

#[tokio::test]
async fn matching_catalog_executes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), MANIFEST, TABLES);

    let engine = Arc::new(ScriptedEngine::new());
    engine.set_table_pages(vec![vec![
        "ec2_instance_snapshots",
        "vpc_vpc_snapshots",
        "ec2_instance",
        "vpc_vpc",
    ]]);

    let report = reconciler(engine.clone())
        .sync(&LocalSource::new(dir.path()))
        .await
        .unwrap();

    assert!(report.created.is_empty());
    assert!(report.dropped.is_empty());
    assert!(engine.statements().is_empty());
}

#[tokio::test]
async fn unknown_type_fails_before_listing_or_ddl() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = r#"[{"table_name": "aws_vpc", "column_name": "vpc_id", "data_type": "uuid"}]"#;
    write_config(dir.path(), manifest, TABLES);

    let engine = Arc::new(ScriptedEngine::new());
    let err = reconciler(engine.clone())
        .sync(&LocalSource::new(dir.path()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::Manifest(ManifestError::UnknownType { .. })
    ));
    assert!(engine.statements().is_empty());
}

#[tokio::test]
async fn missing_allow_list_is_a_source_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("config")).unwrap();
    std::fs::write(dir.path().join("config/table_metadata.json"), MANIFEST).unwrap();

    let err = reconciler(Arc::new(ScriptedEngine::new()))
        .sync(&LocalSource::new(dir.path()))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Source(SourceError::NotFound { .. })));
}
