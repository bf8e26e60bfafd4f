//! Query execution against AWS Athena: submit, poll to a terminal state, and
//! read paginated results decoded into JSON-typed records.

pub mod client;
pub mod config;
pub mod decode;
pub mod engine;
pub mod executor;
pub mod query;
pub mod result;
#[cfg(any(test, feature = "testing"))]
pub mod scripted;

pub use client::{load_sdk_config, AthenaEngine};
pub use config::AthenaConfig;
pub use decode::{decode, decode_cell, decode_pages};
pub use engine::{QueryEngine, QueryError};
pub use executor::{PollPolicy, QueryExecutor};
pub use query::{ExecutionState, Query, QueryExecution};
pub use result::{Record, ResultPage, TablePage};
#[cfg(any(test, feature = "testing"))]
pub use scripted::ScriptedEngine;
