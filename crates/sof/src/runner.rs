//! View execution: fan resources out over worker threads, reassemble
//! rows in bundle order, apply filtering and pagination.

use std::thread;

use serde_json::{Map, Value};

use crate::bundle::{Bundle, resource_last_updated};
use crate::column::{ColumnInfo, ColumnType};
use crate::engine::CompiledView;
use crate::{Result, RunOptions, SofError, pagination};

/// Executes a compiled view against Bundles.
#[derive(Debug, Clone)]
pub struct ViewRunner {
    view: CompiledView,
}

/// The tabular result of a view execution, before serialization.
#[derive(Debug, Clone)]
pub struct ViewResult {
    /// Column metadata in output order.
    pub columns: Vec<ColumnInfo>,

    /// Row values, one full-width vector per row. Absent values are
    /// `Value::Null`.
    pub data: Vec<Vec<Value>>,

    /// Number of rows in `data`.
    pub row_count: usize,
}

impl ViewResult {
    /// One row as a JSON object keyed by column name. Null values are
    /// omitted, matching how FHIR omits absent elements.
    pub fn row_as_object(&self, index: usize) -> Map<String, Value> {
        let mut object = Map::new();
        if let Some(row) = self.data.get(index) {
            for (column, value) in self.columns.iter().zip(row) {
                if !value.is_null() {
                    object.insert(column.name.clone(), value.clone());
                }
            }
        }
        object
    }

    /// All rows as a JSON array of objects.
    pub fn to_json_array(&self) -> Value {
        Value::Array(
            (0..self.data.len())
                .map(|i| Value::Object(self.row_as_object(i)))
                .collect(),
        )
    }
}

impl ViewRunner {
    pub fn new(view: CompiledView) -> Self {
        Self { view }
    }

    /// The compiled view this runner executes.
    pub fn view(&self) -> &CompiledView {
        &self.view
    }

    /// Run the view against a Bundle.
    ///
    /// Rows come out in bundle order regardless of the worker count; the
    /// same input and options always produce the same result.
    ///
    /// # Errors
    ///
    /// Row expansion itself is total. The only runtime failure is a
    /// panicking worker thread, surfaced as [`SofError::Io`].
    pub fn run(&self, bundle: &Bundle, options: &RunOptions) -> Result<ViewResult> {
        let resources: Vec<&Value> = bundle
            .resources()
            .iter()
            .filter(|resource| match (options.since, resource_last_updated(resource)) {
                (Some(since), Some(updated)) => updated >= since,
                // No cutoff, or no timestamp to compare: keep it.
                _ => true,
            })
            .collect();

        let workers = self.worker_count(resources.len(), options);
        tracing::debug!(
            resources = resources.len(),
            workers,
            resource_type = self.view.resource_type(),
            "executing view"
        );

        let rows = if workers <= 1 {
            self.run_sequential(&resources, options)
        } else {
            self.run_parallel(&resources, workers)?
        };

        let rows = pagination::apply(rows, options);
        let columns = self.column_infos(&rows);
        let row_count = rows.len();
        tracing::debug!(rows = row_count, "view execution complete");

        Ok(ViewResult {
            columns,
            data: rows,
            row_count,
        })
    }

    fn worker_count(&self, resource_count: usize, options: &RunOptions) -> usize {
        let requested = options.num_threads.unwrap_or_else(|| {
            thread::available_parallelism().map_or(1, |n| n.get())
        });
        // A worker per resource is the most parallelism that can help.
        requested.min(resource_count.max(1))
    }

    fn run_sequential(&self, resources: &[&Value], options: &RunOptions) -> Vec<Vec<Value>> {
        // With a limit we can stop as soon as the requested window is
        // covered; rows are in bundle order so later resources cannot
        // contribute to it.
        let needed = options
            .limit
            .map(|limit| limit.saturating_mul(options.page.unwrap_or(1)));

        let mut rows = Vec::new();
        for resource in resources {
            rows.extend(self.view.rows_for_resource(resource));
            if needed.is_some_and(|n| rows.len() >= n) {
                break;
            }
        }
        rows
    }

    /// Fork-join over contiguous chunks. Each worker expands one chunk;
    /// joining the handles in spawn order restores bundle order exactly.
    fn run_parallel(&self, resources: &[&Value], workers: usize) -> Result<Vec<Vec<Value>>> {
        let chunk_size = resources.len().div_ceil(workers);

        let chunk_rows: std::result::Result<Vec<Vec<Vec<Value>>>, _> =
            thread::scope(|scope| {
                let handles: Vec<_> = resources
                    .chunks(chunk_size)
                    .map(|chunk| {
                        scope.spawn(move || {
                            chunk
                                .iter()
                                .flat_map(|resource| self.view.rows_for_resource(resource))
                                .collect::<Vec<_>>()
                        })
                    })
                    .collect();
                handles.into_iter().map(|handle| handle.join()).collect()
            });

        let chunk_rows = chunk_rows
            .map_err(|_| SofError::Io(std::io::Error::other("worker thread panicked")))?;
        Ok(chunk_rows.into_iter().flatten().collect())
    }

    /// Column metadata for the final row set. Collection columns carry
    /// arrays and are always JSON-typed; elsewhere declared types win,
    /// otherwise the type is inferred from the first non-null value in
    /// the column, defaulting to string for all-null columns.
    fn column_infos(&self, rows: &[Vec<Value>]) -> Vec<ColumnInfo> {
        self.view
            .column_specs()
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let col_type = if spec.collection {
                    ColumnType::Json
                } else {
                    spec.declared.unwrap_or_else(|| {
                        rows.iter()
                            .find_map(|row| ColumnType::from_value(&row[index]))
                            .unwrap_or_default()
                    })
                };
                let mut info = ColumnInfo::new(spec.name.clone(), col_type);
                info.description = spec.description.clone();
                info
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ViewDefinition;
    use serde_json::json;

    fn runner(view: Value) -> ViewRunner {
        let definition = ViewDefinition::from_json(&view).unwrap();
        ViewRunner::new(CompiledView::compile(&definition).unwrap())
    }

    fn patient_view() -> Value {
        json!({
            "resourceType": "ViewDefinition",
            "resource": "Patient",
            "select": [{"column": [
                {"name": "id", "path": "id"},
                {"name": "gender", "path": "gender"}
            ]}]
        })
    }

    fn bundle_of(resources: Vec<Value>) -> Bundle {
        let entries: Vec<Value> = resources
            .into_iter()
            .map(|resource| json!({"resource": resource}))
            .collect();
        Bundle::from_json(&json!({"resourceType": "Bundle", "entry": entries})).unwrap()
    }

    fn patients(n: usize) -> Bundle {
        bundle_of(
            (0..n)
                .map(|i| json!({"resourceType": "Patient", "id": format!("p{i}")}))
                .collect(),
        )
    }

    #[test]
    fn rows_follow_bundle_order() {
        let runner = runner(patient_view());
        let result = runner.run(&patients(5), &RunOptions::default()).unwrap();

        assert_eq!(result.row_count, 5);
        let ids: Vec<&Value> = result.data.iter().map(|row| &row[0]).collect();
        assert_eq!(
            ids,
            vec![&json!("p0"), &json!("p1"), &json!("p2"), &json!("p3"), &json!("p4")]
        );
    }

    #[test]
    fn thread_count_does_not_change_the_result() {
        let runner = runner(patient_view());
        let bundle = patients(23);

        let sequential = runner
            .run(
                &bundle,
                &RunOptions {
                    num_threads: Some(1),
                    ..Default::default()
                },
            )
            .unwrap();
        let parallel = runner
            .run(
                &bundle,
                &RunOptions {
                    num_threads: Some(4),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(sequential.data, parallel.data);
    }

    #[test]
    fn more_workers_than_resources() {
        let runner = runner(patient_view());
        let result = runner
            .run(
                &patients(2),
                &RunOptions {
                    num_threads: Some(16),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(result.row_count, 2);
    }

    #[test]
    fn empty_bundle_yields_columns_but_no_rows() {
        let runner = runner(patient_view());
        let result = runner.run(&patients(0), &RunOptions::default()).unwrap();

        assert_eq!(result.row_count, 0);
        assert_eq!(result.columns.len(), 2);
        assert_eq!(result.columns[0].name, "id");
        assert_eq!(result.to_json_array(), json!([]));
    }

    #[test]
    fn since_drops_older_resources() {
        let runner = runner(patient_view());
        let bundle = bundle_of(vec![
            json!({
                "resourceType": "Patient",
                "id": "old",
                "meta": {"lastUpdated": "2023-01-01T00:00:00Z"}
            }),
            json!({
                "resourceType": "Patient",
                "id": "new",
                "meta": {"lastUpdated": "2024-06-01T00:00:00Z"}
            }),
            json!({"resourceType": "Patient", "id": "undated"}),
        ]);

        let since = chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let result = runner
            .run(
                &bundle,
                &RunOptions {
                    since: Some(since),
                    ..Default::default()
                },
            )
            .unwrap();

        let ids: Vec<&Value> = result.data.iter().map(|row| &row[0]).collect();
        assert_eq!(ids, vec![&json!("new"), &json!("undated")]);
    }

    #[test]
    fn limit_and_page_select_a_window() {
        let runner = runner(patient_view());
        let result = runner
            .run(
                &patients(7),
                &RunOptions {
                    limit: Some(2),
                    page: Some(2),
                    ..Default::default()
                },
            )
            .unwrap();

        let ids: Vec<&Value> = result.data.iter().map(|row| &row[0]).collect();
        assert_eq!(ids, vec![&json!("p2"), &json!("p3")]);
    }

    #[test]
    fn limit_zero_yields_no_rows() {
        let runner = runner(patient_view());
        let result = runner
            .run(
                &patients(4),
                &RunOptions {
                    limit: Some(0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(result.row_count, 0);
    }

    #[test]
    fn pagination_is_identical_across_thread_counts() {
        let runner = runner(patient_view());
        let bundle = patients(20);
        let base = RunOptions {
            limit: Some(3),
            page: Some(3),
            ..Default::default()
        };

        let sequential = runner
            .run(
                &bundle,
                &RunOptions {
                    num_threads: Some(1),
                    ..base.clone()
                },
            )
            .unwrap();
        let parallel = runner
            .run(
                &bundle,
                &RunOptions {
                    num_threads: Some(8),
                    ..base
                },
            )
            .unwrap();

        assert_eq!(sequential.data, parallel.data);
        assert_eq!(sequential.row_count, 3);
    }

    #[test]
    fn column_types_inferred_from_values() {
        let runner = runner(json!({
            "resourceType": "ViewDefinition",
            "resource": "Patient",
            "select": [{"column": [
                {"name": "id", "path": "id"},
                {"name": "active", "path": "active"},
                {"name": "missing", "path": "communication.language"}
            ]}]
        }));
        let bundle = bundle_of(vec![
            json!({"resourceType": "Patient", "id": "p1", "active": true}),
        ]);

        let result = runner.run(&bundle, &RunOptions::default()).unwrap();
        assert_eq!(result.columns[0].col_type, ColumnType::String);
        assert_eq!(result.columns[1].col_type, ColumnType::Boolean);
        // All-null columns fall back to string.
        assert_eq!(result.columns[2].col_type, ColumnType::String);
    }

    #[test]
    fn collection_columns_are_json_typed_even_without_rows() {
        let runner = runner(json!({
            "resourceType": "ViewDefinition",
            "resource": "Patient",
            "select": [{"column": [
                {"name": "id", "path": "id"},
                {"name": "given", "path": "name.given", "collection": true}
            ]}]
        }));

        let result = runner.run(&patients(0), &RunOptions::default()).unwrap();
        assert_eq!(result.columns[0].col_type, ColumnType::String);
        assert_eq!(result.columns[1].col_type, ColumnType::Json);
    }

    #[test]
    fn row_objects_omit_nulls() {
        let runner = runner(patient_view());
        let bundle = bundle_of(vec![json!({"resourceType": "Patient", "id": "p1"})]);

        let result = runner.run(&bundle, &RunOptions::default()).unwrap();
        assert_eq!(result.to_json_array(), json!([{"id": "p1"}]));
    }
}
