//! Integration tests for inventory-athena.
//!
//! Everything runs against `ScriptedEngine`; no AWS credentials are needed.

mod executor;
mod pagination;
