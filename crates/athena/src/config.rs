use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::executor::PollPolicy;

/// Default Glue catalog name used by Athena.
pub const DEFAULT_CATALOG: &str = "AwsDataCatalog";

const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

const DEFAULT_TIMEOUT_SECONDS: u64 = 900;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

// ── Env helpers ──────────────────────────────────────────────────

pub(crate) fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries `{PROFILE}_{KEY}` first, falls back to `{KEY}`.
pub fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

pub fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Active profile from `INVENTORY_PROFILE`, upper-cased (empty = default).
pub fn active_profile() -> String {
    env_opt("INVENTORY_PROFILE")
        .map(|s| s.to_uppercase())
        .unwrap_or_default()
}

// ── AthenaConfig ─────────────────────────────────────────────────

/// Connection and polling settings for the Athena query engine.
///
/// Reads from environment variables with optional profile prefix.
/// When `INVENTORY_PROFILE=PROD`, checks `PROD_ATHENA_DATABASE` before `ATHENA_DATABASE`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthenaConfig {
    /// AWS region for Athena queries.
    pub region: String,
    /// Database every query runs against.
    pub database: String,
    /// Data catalog holding `database`.
    pub catalog: String,
    /// Workgroup (execution pool) queries are submitted to.
    pub workgroup: String,
    /// S3 path for query results. `None` defers to the workgroup setting.
    pub output_location: Option<String>,
    /// Delay between status polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Upper bound on waiting for a single query (0 = wait forever).
    pub timeout_seconds: u64,
}

impl AthenaConfig {
    /// Build config from environment variables.
    ///
    /// Reads `INVENTORY_PROFILE` to determine profile prefix.
    /// `ATHENA_REGION` falls back to `AWS_REGION` before using the default.
    pub fn from_env() -> Self {
        Self::from_env_profiled(&active_profile())
    }

    /// Build config for a specific named profile.
    pub fn from_env_profiled(profile: &str) -> Self {
        let region = profiled_env_opt(profile, "ATHENA_REGION")
            .or_else(|| profiled_env_opt(profile, "AWS_REGION"))
            .unwrap_or_else(|| "us-east-1".to_string());

        Self {
            region,
            database: profiled_env_or(profile, "ATHENA_DATABASE", "default"),
            catalog: profiled_env_or(profile, "ATHENA_CATALOG", DEFAULT_CATALOG),
            workgroup: profiled_env_or(profile, "ATHENA_WORKGROUP", "primary"),
            output_location: profiled_env_opt(profile, "ATHENA_OUTPUT_LOCATION"),
            poll_interval_ms: profiled_env_u64(
                profile,
                "ATHENA_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            ),
            timeout_seconds: profiled_env_u64(
                profile,
                "ATHENA_TIMEOUT_SECONDS",
                DEFAULT_TIMEOUT_SECONDS,
            ),
        }
    }

    /// Polling behaviour derived from `poll_interval_ms` and `timeout_seconds`.
    pub fn poll_policy(&self) -> PollPolicy {
        let deadline = match self.timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            deadline,
        }
    }
}

impl Default for AthenaConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            database: "default".to_string(),
            catalog: DEFAULT_CATALOG.to_string(),
            workgroup: "primary".to_string(),
            output_location: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
