//! Row limiting and page selection, applied after all rows are built.

use serde_json::Value;

use crate::RunOptions;

/// Apply `limit`/`page` to a fully assembled row set.
///
/// `page` is 1-based with `limit` as the page size; pages past the end
/// come back empty. Option combinations are validated before execution,
/// so `page` without `limit` never reaches this point.
pub(crate) fn apply(rows: Vec<Vec<Value>>, options: &RunOptions) -> Vec<Vec<Value>> {
    match (options.limit, options.page) {
        (None, _) => rows,
        (Some(limit), None) => rows.into_iter().take(limit).collect(),
        (Some(limit), Some(page)) => {
            let start = (page - 1).saturating_mul(limit);
            rows.into_iter().skip(start).take(limit).collect()
        }
    }
}
