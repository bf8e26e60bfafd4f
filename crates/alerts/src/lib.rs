//! Scheduled inventory alerts: run each configured query and notify when it
//! returns rows.

pub mod config;
pub mod runner;

pub use config::{AlertQuery, AlertsConfig};
pub use runner::{AlertError, AlertOutcome, AlertReport, AlertRunner};
