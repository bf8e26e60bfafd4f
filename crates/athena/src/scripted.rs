//! In-memory [`QueryEngine`] that replays scripted behaviour.
//!
//! Statements are matched against registered patterns by substring, most
//! recently registered first. Unmatched statements succeed on the first poll
//! with an empty result set. Every submission is recorded so tests can assert
//! on exactly what was executed and in which order.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::engine::{QueryEngine, QueryError};
use crate::query::{ExecutionState, Query, QueryExecution};
use crate::result::{ResultPage, TablePage};

#[derive(Debug, Clone)]
struct Script {
    pattern: String,
    /// States reported by successive polls; the last one repeats.
    states: Vec<ExecutionState>,
    reason: Option<String>,
    pages: Vec<ResultPage>,
    reject: Option<String>,
}

impl Script {
    fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            states: vec![ExecutionState::Succeeded],
            reason: None,
            pages: Vec::new(),
            reject: None,
        }
    }
}

#[derive(Debug)]
struct Execution {
    script: Script,
    polls: usize,
}

#[derive(Debug, Default)]
struct Inner {
    scripts: Vec<Script>,
    executions: HashMap<String, Execution>,
    submitted: Vec<Query>,
    stopped: Vec<String>,
    table_pages: Vec<Vec<String>>,
    databases: BTreeSet<String>,
    next_id: u64,
}

impl Inner {
    fn script_mut(&mut self, pattern: &str) -> &mut Script {
        if let Some(idx) = self.scripts.iter().position(|s| s.pattern == pattern) {
            return &mut self.scripts[idx];
        }
        self.scripts.push(Script::new(pattern));
        let last = self.scripts.len() - 1;
        &mut self.scripts[last]
    }

    fn find(&self, statement: &str) -> Script {
        self.scripts
            .iter()
            .rev()
            .find(|s| statement.contains(&s.pattern))
            .cloned()
            .unwrap_or_else(|| Script::new(statement))
    }
}

/// Scripted engine for test suites; compiled only with the `testing` feature.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    inner: Mutex<Inner>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means another test thread panicked.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Statements containing `pattern` report `states` on successive polls.
    pub fn script_states(&self, pattern: &str, states: Vec<ExecutionState>) {
        self.lock().script_mut(pattern).states = states;
    }

    /// Statements containing `pattern` end FAILED with `reason`.
    pub fn script_failure(&self, pattern: &str, reason: &str) {
        let mut inner = self.lock();
        let script = inner.script_mut(pattern);
        script.states = vec![ExecutionState::Running, ExecutionState::Failed];
        script.reason = Some(reason.to_string());
    }

    /// Statements containing `pattern` succeed and return `pages`.
    ///
    /// Continuation tokens are assigned by the engine; any set on `pages` are ignored.
    pub fn script_pages(&self, pattern: &str, pages: Vec<ResultPage>) {
        self.lock().script_mut(pattern).pages = pages;
    }

    /// Submissions containing `pattern` are rejected outright.
    pub fn reject(&self, pattern: &str, message: &str) {
        self.lock().script_mut(pattern).reject = Some(message.to_string());
    }

    /// Table names returned by successive listing pages.
    pub fn set_table_pages(&self, pages: Vec<Vec<&str>>) {
        self.lock().table_pages = pages
            .into_iter()
            .map(|p| p.into_iter().map(str::to_string).collect())
            .collect();
    }

    pub fn add_database(&self, name: &str) {
        self.lock().databases.insert(name.to_string());
    }

    /// Every accepted submission, in order.
    pub fn submitted(&self) -> Vec<Query> {
        self.lock().submitted.clone()
    }

    /// Statements of every accepted submission, in order.
    pub fn statements(&self) -> Vec<String> {
        self.lock()
            .submitted
            .iter()
            .map(|q| q.statement.clone())
            .collect()
    }

    /// Execution ids a cancellation was requested for.
    pub fn stopped(&self) -> Vec<String> {
        self.lock().stopped.clone()
    }

    pub fn poll_count(&self, execution_id: &str) -> usize {
        self.lock()
            .executions
            .get(execution_id)
            .map(|e| e.polls)
            .unwrap_or(0)
    }
}

fn page_token(index: usize) -> String {
    format!("page-{index}")
}

fn table_token(index: usize) -> String {
    format!("tables-{index}")
}

fn parse_token(token: Option<&str>, prefix: &str) -> Result<usize, QueryError> {
    match token {
        None => Ok(0),
        Some(t) => t
            .strip_prefix(prefix)
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| QueryError::ParseError(format!("invalid token: {t}"))),
    }
}

#[async_trait]
impl QueryEngine for ScriptedEngine {
    async fn start_query(&self, query: &Query) -> Result<String, QueryError> {
        let mut inner = self.lock();
        let script = inner.find(&query.statement);
        if let Some(message) = &script.reject {
            return Err(QueryError::Submission(message.clone()));
        }

        inner.next_id += 1;
        let id = format!("exec-{}", inner.next_id);
        inner.submitted.push(query.clone());
        inner
            .executions
            .insert(id.clone(), Execution { script, polls: 0 });
        Ok(id)
    }

    async fn get_execution(&self, execution_id: &str) -> Result<QueryExecution, QueryError> {
        let mut inner = self.lock();
        let execution = inner
            .executions
            .get_mut(execution_id)
            .ok_or_else(|| QueryError::AwsSdk(format!("unknown execution {execution_id}")))?;

        let states = &execution.script.states;
        let state = states
            .get(execution.polls)
            .or_else(|| states.last())
            .copied()
            .unwrap_or(ExecutionState::Succeeded);
        execution.polls += 1;

        Ok(QueryExecution::observed(
            execution_id,
            state,
            execution.script.reason.clone(),
        ))
    }

    async fn get_results(
        &self,
        execution_id: &str,
        token: Option<&str>,
    ) -> Result<ResultPage, QueryError> {
        let index = parse_token(token, "page-")?;
        let inner = self.lock();
        let execution = inner
            .executions
            .get(execution_id)
            .ok_or_else(|| QueryError::AwsSdk(format!("unknown execution {execution_id}")))?;

        let pages = &execution.script.pages;
        let mut page = pages.get(index).cloned().unwrap_or_default();
        page.next_token = (index + 1 < pages.len()).then(|| page_token(index + 1));
        Ok(page)
    }

    async fn stop_query(&self, execution_id: &str) -> Result<(), QueryError> {
        self.lock().stopped.push(execution_id.to_string());
        Ok(())
    }

    async fn list_tables(
        &self,
        _catalog: &str,
        _database: &str,
        token: Option<&str>,
    ) -> Result<TablePage, QueryError> {
        let index = parse_token(token, "tables-")?;
        let inner = self.lock();
        let pages = &inner.table_pages;
        Ok(TablePage {
            names: pages.get(index).cloned().unwrap_or_default(),
            next_token: (index + 1 < pages.len()).then(|| table_token(index + 1)),
        })
    }

    async fn database_exists(&self, _catalog: &str, database: &str) -> Result<bool, QueryError> {
        Ok(self.lock().databases.contains(database))
    }
}
