//! Integration tests for inventory-catalog.
//!
//! The live catalog is a `ScriptedEngine`; declared state comes from a
//! temporary directory read through `LocalSource`.

mod reconcile;
mod sync;
