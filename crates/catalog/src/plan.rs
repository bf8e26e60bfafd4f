use std::collections::BTreeSet;

use serde::Serialize;

/// What a reconciliation run has to change.
///
/// `to_create`, `to_drop` and `unchanged` are pairwise disjoint and together
/// cover every declared and live table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    /// Declared but not live.
    pub to_create: BTreeSet<String>,
    /// Live but no longer declared.
    pub to_drop: BTreeSet<String>,
    /// Declared and live.
    pub unchanged: BTreeSet<String>,
}

impl ReconcilePlan {
    /// Diff the declared table set against the live one.
    pub fn new(declared: &BTreeSet<String>, live: &BTreeSet<String>) -> Self {
        Self {
            to_create: declared.difference(live).cloned().collect(),
            to_drop: live.difference(declared).cloned().collect(),
            unchanged: declared.intersection(live).cloned().collect(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.to_create.is_empty() && self.to_drop.is_empty()
    }
}
