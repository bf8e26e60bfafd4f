use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One decoded row: column name to value, in result-set column order.
pub type Record = IndexMap<String, serde_json::Value>;

/// One page of a query's result set as returned by the engine.
///
/// Cells are `None` for SQL NULL. For a fresh (non-DDL) result set the first
/// row of the first page echoes the column names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPage {
    /// Column names in result-set order.
    pub columns: Vec<String>,
    /// Row data, positionally aligned with `columns`.
    pub rows: Vec<Vec<Option<String>>>,
    /// Token for the next page, `None` on the last page.
    pub next_token: Option<String>,
}

impl ResultPage {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_last(&self) -> bool {
        self.next_token.is_none()
    }
}

/// One page of a catalog table listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePage {
    pub names: Vec<String>,
    pub next_token: Option<String>,
}
