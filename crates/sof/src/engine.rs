//! View compilation and per-resource row expansion.
//!
//! A [`CompiledView`] is a ViewDefinition with every path expression
//! parsed, every `%constant` resolved, and the output column order fixed
//! by flattening the select tree depth-first, left to right. Compilation
//! is the last point at which an error can occur; row expansion is total.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use sof_fhirpath::{PathExpr, evaluate, parse};

use crate::column::ColumnType;
use crate::view_definition::{Select, ViewDefinition};
use crate::{Result, SofError};

/// A ViewDefinition compiled for execution.
#[derive(Debug, Clone)]
pub struct CompiledView {
    resource_type: String,
    width: usize,
    columns: Vec<ColumnSpec>,
    selects: Vec<CompiledSelect>,
    filters: Vec<PathExpr>,
}

/// Metadata for one output column slot.
#[derive(Debug, Clone)]
pub(crate) struct ColumnSpec {
    pub name: String,
    /// Type declared in the ViewDefinition, if any. Undeclared types are
    /// inferred from observed values after execution.
    pub declared: Option<ColumnType>,
    pub collection: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
struct CompiledColumn {
    /// Slot in the flattened row this column writes to.
    index: usize,
    path: PathExpr,
    collection: bool,
}

#[derive(Debug, Clone)]
struct CompiledSelect {
    columns: Vec<CompiledColumn>,
    for_each: Option<PathExpr>,
    for_each_or_null: Option<PathExpr>,
    selects: Vec<CompiledSelect>,
}

impl CompiledView {
    /// Compile a parsed ViewDefinition.
    ///
    /// # Errors
    ///
    /// Returns [`SofError::FhirPath`] when a path expression fails to
    /// parse or references an undefined constant, and
    /// [`SofError::InvalidViewDefinition`] for duplicate column names.
    pub fn compile(view: &ViewDefinition) -> Result<Self> {
        let constants: HashMap<String, Value> = view
            .constant
            .iter()
            .map(|c| (c.name.clone(), c.value()))
            .collect();
        let lookup = |name: &str| constants.get(name).cloned();

        let mut columns = Vec::new();
        let selects = compile_selects(&view.select, &mut columns, &lookup)?;

        let mut seen = HashSet::new();
        for spec in &columns {
            if !seen.insert(spec.name.as_str()) {
                return Err(SofError::InvalidViewDefinition(format!(
                    "duplicate column name: {}",
                    spec.name
                )));
            }
        }

        let mut filters = Vec::new();
        for clause in &view.where_ {
            let mut expr = parse(&clause.path)?;
            expr.resolve_constants(&lookup)?;
            filters.push(expr);
        }

        Ok(Self {
            resource_type: view.resource().to_string(),
            width: columns.len(),
            columns,
            selects,
            filters,
        })
    }

    /// The resource type this view selects over.
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Number of output columns.
    pub fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn column_specs(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Expand one resource into zero or more full-width rows.
    ///
    /// Resources of a different type, or failing any `where` clause,
    /// yield no rows. Total; never errors.
    pub(crate) fn rows_for_resource(&self, resource: &Value) -> Vec<Vec<Value>> {
        if resource.get("resourceType").and_then(Value::as_str)
            != Some(self.resource_type.as_str())
        {
            return Vec::new();
        }

        for filter in &self.filters {
            if !passes(resource, filter) {
                return Vec::new();
            }
        }

        let mut rows = vec![vec![Value::Null; self.width]];
        for select in &self.selects {
            let fragments = select.expand(resource, self.width);
            rows = cross(rows, fragments);
            if rows.is_empty() {
                break;
            }
        }
        rows
    }
}

/// A `where` clause passes only when it evaluates to the single value
/// `true`. Empty results, non-booleans and multi-item collections all
/// filter the resource out.
fn passes(resource: &Value, filter: &PathExpr) -> bool {
    matches!(evaluate(resource, filter).as_slice(), [Value::Bool(true)])
}

impl CompiledSelect {
    fn expand(&self, node: &Value, width: usize) -> Vec<Vec<Value>> {
        if let Some(path) = &self.for_each {
            let elements = evaluate(node, path);
            elements
                .iter()
                .flat_map(|element| self.expand_element(element, width))
                .collect()
        } else if let Some(path) = &self.for_each_or_null {
            let elements = evaluate(node, path);
            if elements.is_empty() {
                return vec![vec![Value::Null; width]];
            }
            elements
                .iter()
                .flat_map(|element| self.expand_element(element, width))
                .collect()
        } else {
            self.expand_element(node, width)
        }
    }

    /// Rows for a single iteration element: this block's columns filled
    /// in, crossed with every nested select's fragments.
    fn expand_element(&self, element: &Value, width: usize) -> Vec<Vec<Value>> {
        let mut base = vec![Value::Null; width];
        for column in &self.columns {
            base[column.index] = column.extract(element);
        }

        let mut rows = vec![base];
        for nested in &self.selects {
            let fragments = nested.expand(element, width);
            rows = cross(rows, fragments);
            if rows.is_empty() {
                break;
            }
        }
        rows
    }
}

impl CompiledColumn {
    fn extract(&self, node: &Value) -> Value {
        let results = evaluate(node, &self.path);
        if self.collection {
            Value::Array(results)
        } else {
            results.into_iter().next().unwrap_or(Value::Null)
        }
    }
}

/// Cartesian product of row fragments. Sibling fragments write disjoint
/// column slots, so merging takes the non-null value per slot. An empty
/// side empties the product, which is what drops a row when a `forEach`
/// matched nothing.
fn cross(rows: Vec<Vec<Value>>, fragments: Vec<Vec<Value>>) -> Vec<Vec<Value>> {
    if rows.is_empty() || fragments.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(rows.len() * fragments.len());
    for row in &rows {
        for fragment in &fragments {
            let mut merged = row.clone();
            for (slot, value) in merged.iter_mut().zip(fragment) {
                if slot.is_null() && !value.is_null() {
                    *slot = value.clone();
                }
            }
            out.push(merged);
        }
    }
    out
}

fn compile_selects(
    selects: &[Select],
    columns: &mut Vec<ColumnSpec>,
    lookup: &dyn Fn(&str) -> Option<Value>,
) -> Result<Vec<CompiledSelect>> {
    let mut compiled = Vec::with_capacity(selects.len());
    for select in selects {
        let mut compiled_columns = Vec::with_capacity(select.column.len());
        for column in &select.column {
            let mut path = parse(&column.path)?;
            path.resolve_constants(lookup)?;
            compiled_columns.push(CompiledColumn {
                index: columns.len(),
                path,
                collection: column.collection.unwrap_or(false),
            });
            columns.push(ColumnSpec {
                name: column.name.clone(),
                declared: column.col_type.as_deref().map(ColumnType::from_fhir_type),
                collection: column.collection.unwrap_or(false),
                description: column.description.clone(),
            });
        }

        let for_each = match &select.for_each {
            Some(path) => {
                let mut expr = parse(path)?;
                expr.resolve_constants(lookup)?;
                Some(expr)
            }
            None => None,
        };
        let for_each_or_null = match &select.for_each_or_null {
            Some(path) => {
                let mut expr = parse(path)?;
                expr.resolve_constants(lookup)?;
                Some(expr)
            }
            None => None,
        };

        let nested = compile_selects(&select.select, columns, lookup)?;
        compiled.push(CompiledSelect {
            columns: compiled_columns,
            for_each,
            for_each_or_null,
            selects: nested,
        });
    }
    Ok(compiled)
}
