//! AWS Athena implementation of [`QueryEngine`].
//!
//! [`AthenaEngine`] is a thin translation layer: every method is a single SDK
//! call whose response is mapped into the crate's own types. Polling, paging
//! and decoding live in the executor.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_athena::error::ProvideErrorMetadata;
use aws_sdk_athena::types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration};
use aws_types::region::Region;
use aws_types::SdkConfig;
use tracing::{debug, info};

use crate::config::AthenaConfig;
use crate::engine::{QueryEngine, QueryError};
use crate::query::{ExecutionState, Query, QueryExecution};
use crate::result::{ResultPage, TablePage};

/// Load shared AWS SDK configuration for `region`.
///
/// Credentials come from the default provider chain.
pub async fn load_sdk_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

/// Athena-backed query engine.
pub struct AthenaEngine {
    client: aws_sdk_athena::Client,
    output_location: Option<String>,
}

impl AthenaEngine {
    /// Create an engine using the region in `config`.
    pub async fn new(config: &AthenaConfig) -> Self {
        let sdk_config = load_sdk_config(&config.region).await;
        let engine = Self::from_sdk_config(&sdk_config, config);

        info!(
            region = %config.region,
            database = %config.database,
            catalog = %config.catalog,
            workgroup = %config.workgroup,
            "AthenaEngine initialised"
        );
        engine
    }

    /// Create an engine from an already-loaded SDK configuration.
    pub fn from_sdk_config(sdk_config: &SdkConfig, config: &AthenaConfig) -> Self {
        Self {
            client: aws_sdk_athena::Client::new(sdk_config),
            output_location: config.output_location.clone(),
        }
    }
}

fn map_state(state: Option<&QueryExecutionState>) -> ExecutionState {
    match state {
        Some(QueryExecutionState::Succeeded) => ExecutionState::Succeeded,
        Some(QueryExecutionState::Failed) => ExecutionState::Failed,
        Some(QueryExecutionState::Cancelled) => ExecutionState::Cancelled,
        Some(QueryExecutionState::Running) => ExecutionState::Running,
        // Queued | missing | unknown future variant: keep polling.
        _ => ExecutionState::Queued,
    }
}

#[async_trait]
impl QueryEngine for AthenaEngine {
    async fn start_query(&self, query: &Query) -> Result<String, QueryError> {
        let context = QueryExecutionContext::builder()
            .database(&query.database)
            .catalog(&query.catalog)
            .build();

        let mut request = self
            .client
            .start_query_execution()
            .query_string(&query.statement)
            .query_execution_context(context)
            .work_group(&query.workgroup);

        if let Some(location) = &self.output_location {
            request = request.result_configuration(
                ResultConfiguration::builder()
                    .output_location(location)
                    .build(),
            );
        }

        let response = request.send().await.map_err(|e| match e.as_service_error() {
            Some(service_err) => QueryError::Submission(
                service_err
                    .message()
                    .map(str::to_string)
                    .unwrap_or_else(|| service_err.to_string()),
            ),
            None => QueryError::AwsSdk(e.to_string()),
        })?;

        response
            .query_execution_id()
            .map(str::to_string)
            .ok_or_else(|| QueryError::AwsSdk("No query execution ID returned".into()))
    }

    async fn get_execution(&self, execution_id: &str) -> Result<QueryExecution, QueryError> {
        let resp = self
            .client
            .get_query_execution()
            .query_execution_id(execution_id)
            .send()
            .await
            .map_err(|e| QueryError::AwsSdk(e.to_string()))?;

        let qe = resp
            .query_execution()
            .ok_or_else(|| QueryError::AwsSdk("No query execution in response".into()))?;

        let status = qe.status();
        Ok(QueryExecution::observed(
            execution_id,
            map_state(status.and_then(|s| s.state())),
            status
                .and_then(|s| s.state_change_reason())
                .map(str::to_string),
        ))
    }

    async fn get_results(
        &self,
        execution_id: &str,
        token: Option<&str>,
    ) -> Result<ResultPage, QueryError> {
        let output = self
            .client
            .get_query_results()
            .query_execution_id(execution_id)
            .set_next_token(token.map(str::to_string))
            .send()
            .await
            .map_err(|e| QueryError::AwsSdk(e.to_string()))?;

        let result_set = output
            .result_set()
            .ok_or_else(|| QueryError::ParseError("No ResultSet in response".into()))?;

        let columns: Vec<String> = result_set
            .result_set_metadata()
            .map(|meta| {
                meta.column_info()
                    .iter()
                    .map(|ci| ci.name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let rows: Vec<Vec<Option<String>>> = result_set
            .rows()
            .iter()
            .map(|row| {
                row.data()
                    .iter()
                    .map(|datum| datum.var_char_value().map(str::to_string))
                    .collect()
            })
            .collect();

        debug!(
            query_id = %execution_id,
            columns = columns.len(),
            rows = rows.len(),
            has_more = output.next_token().is_some(),
            "Fetched result page"
        );

        Ok(ResultPage {
            columns,
            rows,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn stop_query(&self, execution_id: &str) -> Result<(), QueryError> {
        info!(query_id = %execution_id, "Cancelling query");

        self.client
            .stop_query_execution()
            .query_execution_id(execution_id)
            .send()
            .await
            .map_err(|e| QueryError::AwsSdk(e.to_string()))?;
        Ok(())
    }

    async fn list_tables(
        &self,
        catalog: &str,
        database: &str,
        token: Option<&str>,
    ) -> Result<TablePage, QueryError> {
        let output = self
            .client
            .list_table_metadata()
            .catalog_name(catalog)
            .database_name(database)
            .set_next_token(token.map(str::to_string))
            .send()
            .await
            .map_err(|e| QueryError::AwsSdk(e.to_string()))?;

        Ok(TablePage {
            names: output
                .table_metadata_list()
                .iter()
                .map(|t| t.name().to_string())
                .collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn database_exists(&self, catalog: &str, database: &str) -> Result<bool, QueryError> {
        let result = self
            .client
            .get_database()
            .catalog_name(catalog)
            .database_name(database)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .and_then(|se| se.message())
                    .is_some_and(|msg| msg.contains("not found"));
                if not_found {
                    Ok(false)
                } else {
                    Err(QueryError::AwsSdk(e.to_string()))
                }
            }
        }
    }
}
