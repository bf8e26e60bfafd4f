use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use inventory_athena::config::{active_profile, profiled_env_opt, profiled_env_or};

/// Suffix marking the physical table behind each view.
pub const DEFAULT_SNAPSHOT_SUFFIX: &str = "_snapshots";

/// Settings for a reconciliation run.
///
/// Profile handling matches `AthenaConfig`: with `INVENTORY_PROFILE=PROD`,
/// `PROD_INVENTORY_BUCKET` is checked before `INVENTORY_BUCKET`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Bucket holding the processed snapshots and the `config/` objects.
    pub bucket: String,
    /// Key prefix of processed snapshots inside `bucket`.
    pub prefix: String,
    /// Directory with `template-table.sql` / `template-view.sql`.
    /// `None` uses the bundled templates.
    pub template_dir: Option<PathBuf>,
    /// YAML file overriding the default normalization rules.
    pub rules_path: Option<PathBuf>,
    /// Suffix of snapshot tables in the live catalog.
    pub snapshot_suffix: String,
}

impl CatalogConfig {
    pub fn from_env() -> Self {
        Self::from_env_profiled(&active_profile())
    }

    pub fn from_env_profiled(profile: &str) -> Self {
        Self {
            bucket: profiled_env_or(profile, "INVENTORY_BUCKET", ""),
            prefix: profiled_env_or(profile, "INVENTORY_PREFIX", "processed"),
            template_dir: profiled_env_opt(profile, "INVENTORY_TEMPLATE_DIR").map(PathBuf::from),
            rules_path: profiled_env_opt(profile, "INVENTORY_RULES").map(PathBuf::from),
            snapshot_suffix: profiled_env_or(
                profile,
                "INVENTORY_SNAPSHOT_SUFFIX",
                DEFAULT_SNAPSHOT_SUFFIX,
            ),
        }
    }

    /// Apply command-line paths; `None` keeps the environment value.
    pub fn with_paths(
        mut self,
        template_dir: Option<PathBuf>,
        rules_path: Option<PathBuf>,
    ) -> Self {
        if template_dir.is_some() {
            self.template_dir = template_dir;
        }
        if rules_path.is_some() {
            self.rules_path = rules_path;
        }
        self
    }

    /// Returns `true` once a bucket has been configured.
    pub fn is_configured(&self) -> bool {
        !self.bucket.is_empty()
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prefix: "processed".to_string(),
            template_dir: None,
            rules_path: None,
            snapshot_suffix: DEFAULT_SNAPSHOT_SUFFIX.to_string(),
        }
    }
}
