//! Turns result pages into ordered records.
//!
//! Every cell goes through the same path: SQL NULL becomes JSON `null`, and a
//! string is kept as the parsed JSON value when it parses, or as the raw string
//! when it does not. Numeric, boolean and nested columns therefore come back
//! typed without any per-column declarations.

use serde_json::Value;

use crate::result::{Record, ResultPage};

/// Decode one page into records.
///
/// When `drop_header` is set the first row is discarded unconditionally; pass
/// `true` only for the first page of a fresh result set.
pub fn decode(page: &ResultPage, drop_header: bool) -> Vec<Record> {
    let skip = usize::from(drop_header);

    page.rows
        .iter()
        .skip(skip)
        .map(|row| {
            page.columns
                .iter()
                .enumerate()
                .map(|(i, column)| {
                    let cell = row.get(i).and_then(|c| c.as_deref());
                    (column.clone(), decode_cell(cell))
                })
                .collect()
        })
        .collect()
}

/// Decode a full paginated result set, dropping the header from the first page only.
pub fn decode_pages<'a, I>(pages: I) -> Vec<Record>
where
    I: IntoIterator<Item = &'a ResultPage>,
{
    pages
        .into_iter()
        .enumerate()
        .flat_map(|(i, page)| decode(page, i == 0))
        .collect()
}

/// Decode a single cell: NULL → `null`, JSON text → parsed value, otherwise the string.
pub fn decode_cell(cell: Option<&str>) -> Value {
    match cell {
        None => Value::Null,
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
    }
}
