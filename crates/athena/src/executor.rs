//! Submit, wait, read: the query lifecycle on top of a [`QueryEngine`].

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream, TryStreamExt};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::AthenaConfig;
use crate::decode::decode;
use crate::engine::{QueryEngine, QueryError};
use crate::query::{ExecutionState, Query, QueryExecution};
use crate::result::{Record, ResultPage};

/// How [`QueryExecutor::await_completion`] waits for a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Fixed delay before each status poll.
    pub interval: Duration,
    /// Give up (and request cancellation) after this long. `None` waits forever.
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            deadline: None,
        }
    }
}

/// Runs queries against one database/catalog/workgroup.
///
/// Calls are strictly sequential: nothing here spawns, and a query is always
/// driven to a terminal state (or the deadline) before the caller continues.
#[derive(Clone)]
pub struct QueryExecutor {
    engine: Arc<dyn QueryEngine>,
    database: String,
    catalog: String,
    workgroup: String,
    policy: PollPolicy,
}

impl QueryExecutor {
    pub fn new(engine: Arc<dyn QueryEngine>, config: &AthenaConfig) -> Self {
        Self {
            engine,
            database: config.database.clone(),
            catalog: config.catalog.clone(),
            workgroup: config.workgroup.clone(),
            policy: config.poll_policy(),
        }
    }

    /// Replace the poll policy.
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    /// Bind `statement` to this executor's target.
    pub fn query(&self, statement: impl Into<String>) -> Query {
        Query::new(
            statement,
            self.database.clone(),
            self.catalog.clone(),
            self.workgroup.clone(),
        )
    }

    /// Submit a query and return its execution id without waiting.
    pub async fn submit(&self, query: &Query) -> Result<String, QueryError> {
        info!(sql = %query.printable(), "executing query");
        let execution_id = self.engine.start_query(query).await?;
        debug!(query_id = %execution_id, "Query execution started");
        Ok(execution_id)
    }

    /// Poll until the execution reaches a terminal state.
    ///
    /// FAILED and CANCELLED are returned as records, not errors; callers branch
    /// on [`QueryExecution::state`]. The only error besides engine failures is
    /// [`QueryError::Timeout`], after which cancellation has been requested.
    pub async fn await_completion(&self, execution_id: &str) -> Result<QueryExecution, QueryError> {
        let start = Instant::now();

        loop {
            tokio::time::sleep(self.policy.interval).await;

            let execution = self.engine.get_execution(execution_id).await?;

            debug!(
                query_id = %execution_id,
                state = %execution.state,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Polling query status"
            );

            match execution.state {
                ExecutionState::Succeeded => {
                    info!(query_id = %execution_id, "query succeeded");
                    return Ok(execution);
                }
                ExecutionState::Failed => {
                    error!(query_id = %execution_id, reason = %execution.reason(), "query failed");
                    return Ok(execution);
                }
                ExecutionState::Cancelled => {
                    warn!(query_id = %execution_id, "query was cancelled");
                    return Ok(execution);
                }
                ExecutionState::Queued | ExecutionState::Running => {}
            }

            if let Some(deadline) = self.policy.deadline {
                if start.elapsed() >= deadline {
                    warn!(
                        query_id = %execution_id,
                        deadline_seconds = deadline.as_secs(),
                        "Query timed out, cancelling"
                    );
                    // Best-effort cancel; the timeout is reported either way.
                    if let Err(e) = self.engine.stop_query(execution_id).await {
                        warn!(query_id = %execution_id, error = %e, "cancel request failed");
                    }
                    return Err(QueryError::Timeout {
                        query_id: execution_id.to_string(),
                        seconds: deadline.as_secs(),
                    });
                }
            }
        }
    }

    /// Submit `statement` and wait for it to finish.
    pub async fn run(&self, statement: &str) -> Result<QueryExecution, QueryError> {
        let query = self.query(statement);
        let execution_id = self.submit(&query).await?;
        self.await_completion(&execution_id).await
    }

    /// Lazily fetch result pages in server order, following continuation tokens.
    ///
    /// Pages are returned raw; the header row is still present on the first one.
    pub fn read_results<'a>(
        &'a self,
        execution_id: &'a str,
    ) -> impl Stream<Item = Result<ResultPage, QueryError>> + 'a {
        enum Cursor {
            Start,
            Next(String),
            Done,
        }

        stream::try_unfold(Cursor::Start, move |cursor| async move {
            let token = match cursor {
                Cursor::Done => return Ok(None),
                Cursor::Start => None,
                Cursor::Next(token) => Some(token),
            };

            let page = self
                .engine
                .get_results(execution_id, token.as_deref())
                .await?;
            debug!(
                query_id = %execution_id,
                rows = page.row_count(),
                last = page.is_last(),
                "Fetched result page"
            );
            let next = match &page.next_token {
                Some(token) => Cursor::Next(token.clone()),
                None => Cursor::Done,
            };
            Ok(Some((page, next)))
        })
    }

    /// Read and decode every page, dropping the header row of the first page.
    pub async fn read_records(&self, execution_id: &str) -> Result<Vec<Record>, QueryError> {
        let mut pages = std::pin::pin!(self.read_results(execution_id));
        let mut records = Vec::new();
        let mut first = true;

        while let Some(page) = pages.try_next().await? {
            records.extend(decode(&page, first));
            first = false;
        }

        debug!(query_id = %execution_id, records = records.len(), "Decoded results");
        Ok(records)
    }

    /// Every table name in the target database, across all listing pages.
    pub async fn list_tables(&self) -> Result<Vec<String>, QueryError> {
        let mut names = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self
                .engine
                .list_tables(&self.catalog, &self.database, token.as_deref())
                .await?;
            names.extend(page.names);
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        debug!(database = %self.database, tables = names.len(), "Listed catalog tables");
        Ok(names)
    }

    /// Whether the target database exists in the target catalog.
    pub async fn database_exists(&self) -> Result<bool, QueryError> {
        self.engine
            .database_exists(&self.catalog, &self.database)
            .await
    }
}
