//! Runs alert queries and forwards non-empty results to a notifier.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use inventory_athena::{QueryError, QueryExecutor};
use inventory_notify::{Notification, Notifier};

use crate::config::AlertQuery;

/// Errors that stop an alert run.
///
/// Failed or timed-out queries and notifier errors are reported through
/// [`AlertReport`] instead.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("Failed to load alerts from {path}: {reason}")]
    Load { path: String, reason: String },

    #[error(transparent)]
    Query(#[from] QueryError),
}

/// What happened to one alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertOutcome {
    /// Rows were found and the notifier accepted them.
    Notified { records: usize },
    /// The query succeeded with no rows; nothing was sent.
    Empty,
    /// The query failed, was cancelled or timed out.
    Skipped { reason: String },
    /// Rows were found but delivery failed.
    NotifyFailed { reason: String },
}

/// Per-run tally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertReport {
    /// Alerts with rows that were delivered.
    pub notified: usize,
    /// Alerts whose query returned no rows.
    pub empty: usize,
    /// Alerts whose query failed, was cancelled or timed out.
    pub skipped: usize,
    /// Alerts with rows that could not be delivered.
    pub failed: usize,
}

impl AlertReport {
    fn record(&mut self, outcome: &AlertOutcome) {
        match outcome {
            AlertOutcome::Notified { .. } => self.notified += 1,
            AlertOutcome::Empty => self.empty += 1,
            AlertOutcome::Skipped { .. } => self.skipped += 1,
            AlertOutcome::NotifyFailed { .. } => self.failed += 1,
        }
    }

    /// Number of alerts accounted for.
    pub fn total(&self) -> usize {
        self.notified + self.empty + self.skipped + self.failed
    }
}

/// Runs alert queries through a [`QueryExecutor`] and hands non-empty
/// results to a [`Notifier`].
pub struct AlertRunner {
    executor: QueryExecutor,
    notifier: Arc<dyn Notifier>,
}

impl AlertRunner {
    pub fn new(executor: QueryExecutor, notifier: Arc<dyn Notifier>) -> Self {
        Self { executor, notifier }
    }

    /// Run every alert in order, one query at a time.
    ///
    /// Stops at the first submission or transport error; everything else is
    /// counted in the returned report.
    pub async fn run_all(&self, alerts: &[AlertQuery]) -> Result<AlertReport, AlertError> {
        let start = Instant::now();
        let mut report = AlertReport::default();

        for alert in alerts {
            let outcome = self.run_one(alert).await?;
            report.record(&outcome);
        }

        info!(
            alerts = alerts.len(),
            notified = report.notified,
            empty = report.empty,
            skipped = report.skipped,
            failed = report.failed,
            duration_ms = start.elapsed().as_millis() as u64,
            "Alert run complete"
        );
        Ok(report)
    }

    /// Run one alert: query, collect every result page, notify if non-empty.
    pub async fn run_one(&self, alert: &AlertQuery) -> Result<AlertOutcome, AlertError> {
        let label = alert.label();

        let execution = match self.executor.run(&alert.query).await {
            Ok(execution) => execution,
            Err(QueryError::Timeout { query_id, seconds }) => {
                warn!(alert = label, %query_id, seconds, "Alert query timed out");
                return Ok(AlertOutcome::Skipped {
                    reason: format!("timed out after {seconds}s"),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if !execution.succeeded() {
            warn!(
                alert = label,
                query_id = %execution.id,
                state = %execution.state,
                reason = execution.reason(),
                "Alert query did not succeed"
            );
            return Ok(AlertOutcome::Skipped {
                reason: format!("{}: {}", execution.state, execution.reason()),
            });
        }

        let records = self.executor.read_records(&execution.id).await?;
        if records.is_empty() {
            debug!(alert = label, "No rows, nothing to send");
            return Ok(AlertOutcome::Empty);
        }

        let count = records.len();
        let notification = match Notification::json(&alert.subject, &records) {
            Ok(n) => n
                .with_metadata("alert", label)
                .with_metadata("records", count.to_string()),
            Err(e) => {
                warn!(alert = label, error = %e, "Could not serialize alert payload");
                return Ok(AlertOutcome::NotifyFailed {
                    reason: e.to_string(),
                });
            }
        };

        match self.notifier.send(&notification).await {
            Ok(()) => {
                info!(
                    alert = label,
                    records = count,
                    channel = self.notifier.channel_name(),
                    "Alert delivered"
                );
                Ok(AlertOutcome::Notified { records: count })
            }
            Err(e) => {
                warn!(
                    alert = label,
                    channel = self.notifier.channel_name(),
                    error = %e,
                    "Alert delivery failed"
                );
                Ok(AlertOutcome::NotifyFailed {
                    reason: e.to_string(),
                })
            }
        }
    }
}
