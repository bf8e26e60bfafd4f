//! Keeps the Athena catalog in sync with the declared inventory manifest.

pub mod config;
pub mod manifest;
pub mod plan;
pub mod reconciler;
pub mod source;
pub mod template;

pub use config::CatalogConfig;
pub use manifest::{
    ColumnDescriptor, ManifestEntry, ManifestError, ManifestReader, NormalizationRules,
    TableDescriptor, TableMetadata,
};
pub use plan::ReconcilePlan;
pub use reconciler::{
    live_table_set, CatalogReconciler, ReconcileError, ReconcileReport, TableAction, TableFailure,
};
pub use source::{LocalSource, ObjectSource, S3Source, SourceError};
pub use template::{DdlTemplate, DdlTemplates, Placeholder, TemplateError, TemplateParams};
