//! Declared schema: the column manifest and the table allow-list.
//!
//! Raw names come from the collector (`aws_ec2_instance`, `account_id`, ...)
//! and are normalized into the canonical names the catalog uses
//! (`ec2_instance`, `account`, ...).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Object key of the column manifest.
pub const MANIFEST_KEY: &str = "config/table_metadata.json";

/// Object key of the table allow-list.
pub const ALLOW_LIST_KEY: &str = "config/tables.txt";

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("invalid manifest JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid normalization rules: {0}")]
    Rules(#[from] serde_yaml::Error),

    #[error("unmapped data type '{data_type}' for {table}.{column}")]
    UnknownType {
        table: String,
        column: String,
        data_type: String,
    },

    #[error("table name '{0}' has no service/resource separator")]
    UnsplittableName(String),
}

/// One entry of the column manifest, as written by the collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
}

/// A manifest column after normalization and type resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub table: String,
    pub column: String,
    /// Destination (Athena) type.
    pub data_type: String,
}

/// A canonical table and its columns, ordered by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: BTreeMap<String, String>,
}

impl TableDescriptor {
    /// `(service, resource)`, split on the first underscore.
    pub fn split(&self) -> Result<(&str, &str), ManifestError> {
        split_table_name(&self.name)
    }

    /// Column definitions for DDL: `` `name` type `` joined by `,\n`.
    pub fn fields(&self) -> String {
        self.columns
            .iter()
            .map(|(column, data_type)| format!("`{column}` {data_type}"))
            .collect::<Vec<_>>()
            .join(",\n")
    }
}

/// Canonical table name to its descriptor.
pub type TableMetadata = BTreeMap<String, TableDescriptor>;

/// `(service, resource)`, split on the first underscore.
pub fn split_table_name(name: &str) -> Result<(&str, &str), ManifestError> {
    name.split_once('_')
        .filter(|(service, resource)| !service.is_empty() && !resource.is_empty())
        .ok_or_else(|| ManifestError::UnsplittableName(name.to_string()))
}

/// Naming and typing rules applied to manifest entries.
///
/// The defaults reproduce the collector's conventions; a YAML document may
/// replace any field (missing fields keep their defaults).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationRules {
    /// Leading prefix stripped from raw table names.
    pub prefix: String,
    /// Stripped name to canonical name, for names that would collide.
    pub table_overrides: BTreeMap<String, String>,
    /// Columns dropped entirely.
    pub skip_columns: BTreeSet<String>,
    /// Column renames applied by the collector before upload.
    pub column_renames: BTreeMap<String, String>,
    /// Columns whose destination type is fixed regardless of the source type.
    pub type_overrides: BTreeMap<String, String>,
    /// Closed source-type to destination-type table.
    pub type_mappings: BTreeMap<String, String>,
}

impl Default for NormalizationRules {
    fn default() -> Self {
        let owned = |pairs: &[(&str, &str)]| -> BTreeMap<String, String> {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };

        Self {
            prefix: "aws_".to_string(),
            table_overrides: owned(&[("vpc", "vpc_vpc")]),
            skip_columns: BTreeSet::from(["partition".to_string()]),
            column_renames: owned(&[("account_id", "account")]),
            type_overrides: owned(&[
                ("akas", "array<string>"),
                ("tags_src", "array<struct<Key:string,Value:string>>"),
            ]),
            type_mappings: owned(&[
                ("cidr", "string"),
                ("inet", "string"),
                ("boolean", "boolean"),
                ("timestamp with time zone", "timestamp"),
                ("bigint", "bigint"),
                ("text", "string"),
                ("double precision", "double"),
                ("jsonb", "string"),
            ]),
        }
    }
}

impl NormalizationRules {
    pub fn from_yaml(text: &str) -> Result<Self, ManifestError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Strip the leading prefix, then apply the override table.
    pub fn normalize_table(&self, raw: &str) -> String {
        let stripped = raw.strip_prefix(self.prefix.as_str()).unwrap_or(raw);
        self.table_overrides
            .get(stripped)
            .cloned()
            .unwrap_or_else(|| stripped.to_string())
    }

    /// Resolve one manifest entry; `Ok(None)` when the column is skipped.
    pub fn resolve(&self, entry: &ManifestEntry) -> Result<Option<ColumnDescriptor>, ManifestError> {
        if self.skip_columns.contains(&entry.column_name) {
            return Ok(None);
        }

        let table = self.normalize_table(&entry.table_name);
        let column = self
            .column_renames
            .get(&entry.column_name)
            .cloned()
            .unwrap_or_else(|| entry.column_name.clone());

        let data_type = match self.type_overrides.get(&column) {
            Some(forced) => forced.clone(),
            None => self
                .type_mappings
                .get(&entry.data_type)
                .cloned()
                .ok_or_else(|| ManifestError::UnknownType {
                    table: table.clone(),
                    column: column.clone(),
                    data_type: entry.data_type.clone(),
                })?,
        };

        Ok(Some(ColumnDescriptor {
            table,
            column,
            data_type,
        }))
    }
}

/// Parses the manifest and allow-list under a set of [`NormalizationRules`].
#[derive(Debug, Clone, Default)]
pub struct ManifestReader {
    rules: NormalizationRules,
}

impl ManifestReader {
    pub fn new(rules: NormalizationRules) -> Self {
        Self { rules }
    }

    /// Every kept column of a manifest document, in manifest order.
    pub fn read_descriptors(&self, manifest: &str) -> Result<Vec<ColumnDescriptor>, ManifestError> {
        let entries: Vec<ManifestEntry> = serde_json::from_str(manifest)?;
        let mut columns = Vec::with_capacity(entries.len());
        for entry in &entries {
            if let Some(column) = self.rules.resolve(entry)? {
                columns.push(column);
            }
        }
        Ok(columns)
    }

    /// Group the manifest into tables. Fails on the first unmapped type.
    pub fn read_columns(&self, manifest: &str) -> Result<TableMetadata, ManifestError> {
        let mut tables = TableMetadata::new();
        for column in self.read_descriptors(manifest)? {
            tables
                .entry(column.table.clone())
                .or_insert_with(|| TableDescriptor {
                    name: column.table.clone(),
                    columns: BTreeMap::new(),
                })
                .columns
                .insert(column.column, column.data_type);
        }
        debug!(tables = tables.len(), "Read table metadata");
        Ok(tables)
    }

    /// Canonical names of the allow-listed tables.
    ///
    /// Only the first `|`-separated field of each line is consulted, and only
    /// lines starting with the prefix are kept.
    pub fn read_allowed_tables(&self, listing: &str) -> BTreeSet<String> {
        listing
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| line.starts_with(self.rules.prefix.as_str()))
            .filter_map(|line| line.split('|').next())
            .map(|raw| self.rules.normalize_table(raw.trim()))
            .collect()
    }
}
