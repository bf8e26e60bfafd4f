use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use inventory_athena::config::{active_profile, profiled_env_opt, profiled_env_or};

use crate::runner::AlertError;

/// One configured alert: a query and the subject used when it returns rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertQuery {
    /// Optional identifier, used in logs and notification metadata.
    #[serde(default)]
    pub name: Option<String>,
    /// SQL run against the inventory database.
    pub query: String,
    /// Notification subject.
    pub subject: String,
}

impl AlertQuery {
    pub fn new(query: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            name: None,
            query: query.into(),
            subject: subject.into(),
        }
    }

    /// Name for logs: the configured name, else the subject.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.subject)
    }

    /// Parse a list of alerts. `.json` files are read as JSON, anything else as YAML.
    pub fn parse_list(text: &str, path: &Path) -> Result<Vec<Self>, AlertError> {
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let parsed = if is_json {
            serde_json::from_str(text).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(text).map_err(|e| e.to_string())
        };
        parsed.map_err(|reason| AlertError::Load {
            path: path.display().to_string(),
            reason,
        })
    }

    /// Read and parse an alert list file.
    pub fn load_file(path: &Path) -> Result<Vec<Self>, AlertError> {
        let text = std::fs::read_to_string(path).map_err(|e| AlertError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse_list(&text, path)
    }
}

/// Where alerts come from and where notifications go.
///
/// Profile handling matches `AthenaConfig` (`INVENTORY_PROFILE`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Alert list file (YAML or JSON).
    pub alerts_path: PathBuf,
    /// Webhook receiving notifications; `None` logs them instead.
    pub webhook_url: Option<String>,
    /// HTTP method for the webhook; POST when unset.
    pub webhook_method: Option<String>,
    /// Extra webhook headers, parsed from `Name=value;Name2=value2`.
    pub webhook_headers: HashMap<String, String>,
}

impl AlertsConfig {
    pub fn from_env() -> Self {
        Self::from_env_profiled(&active_profile())
    }

    pub fn from_env_profiled(profile: &str) -> Self {
        Self {
            alerts_path: PathBuf::from(profiled_env_or(
                profile,
                "ALERTS_FILE",
                "config/alerts.yaml",
            )),
            webhook_url: profiled_env_opt(profile, "ALERTS_WEBHOOK_URL"),
            webhook_method: profiled_env_opt(profile, "ALERTS_WEBHOOK_METHOD"),
            webhook_headers: profiled_env_opt(profile, "ALERTS_WEBHOOK_HEADERS")
                .map(|raw| parse_headers(&raw))
                .unwrap_or_default(),
        }
    }
}

fn parse_headers(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}
