use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AthenaConfig;

/// A statement bound to the database, catalog and workgroup it runs in.
///
/// Immutable once built; the executor never rewrites a submitted query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub statement: String,
    pub database: String,
    pub catalog: String,
    /// Execution pool (Athena workgroup).
    pub workgroup: String,
}

impl Query {
    pub fn new(
        statement: impl Into<String>,
        database: impl Into<String>,
        catalog: impl Into<String>,
        workgroup: impl Into<String>,
    ) -> Self {
        Self {
            statement: statement.into(),
            database: database.into(),
            catalog: catalog.into(),
            workgroup: workgroup.into(),
        }
    }

    /// Bind `statement` to the target named in `config`.
    pub fn for_config(statement: impl Into<String>, config: &AthenaConfig) -> Self {
        Self::new(
            statement,
            config.database.clone(),
            config.catalog.clone(),
            config.workgroup.clone(),
        )
    }

    /// Statement collapsed onto one line for logging.
    pub fn printable(&self) -> String {
        self.statement.replace('\n', " ")
    }
}

/// Lifecycle state of a query execution as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl ExecutionState {
    /// `true` for SUCCEEDED, FAILED and CANCELLED.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of an execution observed through polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryExecution {
    pub id: String,
    pub state: ExecutionState,
    /// Engine-provided reason, present when the state is FAILED.
    pub failure_reason: Option<String>,
}

impl QueryExecution {
    pub fn new(id: impl Into<String>, state: ExecutionState) -> Self {
        Self {
            id: id.into(),
            state,
            failure_reason: None,
        }
    }

    pub fn failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: ExecutionState::Failed,
            failure_reason: Some(reason.into()),
        }
    }

    /// Build from a polled status; `reason` is kept only for FAILED.
    pub fn observed(
        id: impl Into<String>,
        state: ExecutionState,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            state,
            failure_reason: reason.filter(|_| state == ExecutionState::Failed),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == ExecutionState::Succeeded
    }

    pub fn reason(&self) -> &str {
        self.failure_reason.as_deref().unwrap_or("unknown")
    }
}
