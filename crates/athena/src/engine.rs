//! The boundary between the executor and a remote query engine.

use async_trait::async_trait;

use crate::query::{Query, QueryExecution};
use crate::result::{ResultPage, TablePage};

/// Errors raised while talking to the query engine.
///
/// Terminal non-success states (FAILED, CANCELLED) are not errors; they are
/// reported through [`QueryExecution`].
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The engine rejected the submission (malformed statement, unknown
    /// workgroup, database or catalog).
    #[error("Query submission rejected: {0}")]
    Submission(String),

    /// The query did not reach a terminal state before the poll deadline.
    #[error("Query {query_id} timed out after {seconds}s")]
    Timeout { query_id: String, seconds: u64 },

    /// An AWS SDK error (stringified).
    #[error("AWS SDK error: {0}")]
    AwsSdk(String),

    /// The engine answered with a response we could not interpret.
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Operations the executor and reconciler need from a query engine.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Submit `query`, returning the engine's execution id.
    async fn start_query(&self, query: &Query) -> Result<String, QueryError>;

    /// Current status of an execution.
    async fn get_execution(&self, execution_id: &str) -> Result<QueryExecution, QueryError>;

    /// One page of results; `token` is the previous page's `next_token`.
    async fn get_results(
        &self,
        execution_id: &str,
        token: Option<&str>,
    ) -> Result<ResultPage, QueryError>;

    /// Request cancellation of a running execution.
    async fn stop_query(&self, execution_id: &str) -> Result<(), QueryError>;

    /// One page of table names in `catalog.database`.
    async fn list_tables(
        &self,
        catalog: &str,
        database: &str,
        token: Option<&str>,
    ) -> Result<TablePage, QueryError>;

    /// Whether `database` exists in `catalog`.
    async fn database_exists(&self, catalog: &str, database: &str) -> Result<bool, QueryError>;
}
