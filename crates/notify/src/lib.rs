//! Notification boundary for inventory alerts.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable notification channels
//! - `Notification`, a subject plus a JSON body
//! - Webhook and log notifier implementations

pub mod log;
pub mod traits;
pub mod webhook;

pub use log::LogNotifier;
pub use traits::{Notification, Notifier, NotifyError};
pub use webhook::WebhookNotifier;
