//! ViewDefinition parsing and structural validation.
//!
//! The data structures here mirror the FHIR ViewDefinition resource from
//! the SQL on FHIR Implementation Guide, restricted to the parts the
//! engine executes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, SofError};

/// A ViewDefinition resource that defines a tabular view over FHIR data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewDefinition {
    /// The FHIR resource type (must be "ViewDefinition").
    pub resource_type: String,

    /// Human-readable name for the view.
    pub name: Option<String>,

    /// Publication status: draft | active | retired | unknown.
    pub status: Option<String>,

    /// The FHIR resource type this view is based on (e.g., "Patient").
    pub resource: Option<String>,

    /// Description of the view's purpose.
    pub description: Option<String>,

    /// The columns and nested selects to include in the view.
    #[serde(default)]
    pub select: Vec<Select>,

    /// Filter conditions applied per resource before any rows are built.
    /// Named `where_` because `where` is a Rust reserved keyword.
    #[serde(default, rename = "where")]
    pub where_: Vec<WhereClause>,

    /// Constants referenced as `%name` in path expressions.
    #[serde(default)]
    pub constant: Vec<Constant>,
}

/// A select block: columns at this level plus optional row-multiplying
/// iteration and nested selects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Select {
    /// Column definitions at this level.
    #[serde(default)]
    pub column: Vec<Column>,

    /// Path expression whose result elements each produce one row.
    /// Zero elements drop the row entirely.
    pub for_each: Option<String>,

    /// Like `forEach`, but zero elements yield exactly one row with all
    /// descendant columns null.
    pub for_each_or_null: Option<String>,

    /// Nested select blocks, crossed with this block's columns.
    #[serde(default)]
    pub select: Vec<Select>,
}

/// A column definition in a ViewDefinition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// The column name in the output.
    pub name: String,

    /// Path expression to extract the column value.
    pub path: String,

    /// Declared data type of the column.
    #[serde(rename = "type")]
    pub col_type: Option<String>,

    /// Whether multiple path results are preserved as a list value.
    pub collection: Option<bool>,

    /// Human-readable description of the column.
    pub description: Option<String>,
}

/// A filter clause; the resource is skipped unless the expression
/// evaluates to exactly `true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhereClause {
    pub path: String,
}

/// A constant value referenced as `%name` in path expressions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constant {
    pub name: String,
    pub value_string: Option<String>,
    pub value_integer: Option<i64>,
    pub value_boolean: Option<bool>,
    pub value_decimal: Option<f64>,
}

impl Constant {
    /// The constant's value as a JSON value.
    pub fn value(&self) -> Value {
        if let Some(s) = &self.value_string {
            Value::String(s.clone())
        } else if let Some(i) = self.value_integer {
            Value::from(i)
        } else if let Some(b) = self.value_boolean {
            Value::Bool(b)
        } else if let Some(d) = self.value_decimal {
            serde_json::Number::from_f64(d)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        } else {
            Value::Null
        }
    }
}

impl ViewDefinition {
    /// Parse a ViewDefinition from a JSON value and check its structural
    /// invariants. This runs before any resource is touched.
    ///
    /// # Errors
    ///
    /// Returns [`SofError::InvalidViewDefinition`] for missing or null
    /// `resourceType`/`resource`, or a malformed select tree.
    pub fn from_json(value: &Value) -> Result<Self> {
        let definition: Self = serde_json::from_value(value.clone())
            .map_err(|e| SofError::InvalidViewDefinition(e.to_string()))?;
        definition.check_structure()?;
        Ok(definition)
    }

    /// Parse a ViewDefinition from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid JSON or the document
    /// fails structural validation.
    pub fn parse(s: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(s).map_err(|e| SofError::Serialization(e.to_string()))?;
        Self::from_json(&value)
    }

    /// The resource type this view selects over.
    ///
    /// Only callable on a definition that passed [`Self::from_json`].
    pub fn resource(&self) -> &str {
        self.resource.as_deref().unwrap_or_default()
    }

    /// All output column names in depth-first, left-to-right order.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_column_names(&self.select, &mut names);
        names
    }

    fn check_structure(&self) -> Result<()> {
        if self.resource_type != "ViewDefinition" {
            return Err(SofError::InvalidViewDefinition(format!(
                "resourceType must be \"ViewDefinition\", found \"{}\"",
                self.resource_type
            )));
        }

        match self.resource.as_deref() {
            None | Some("") => {
                return Err(SofError::InvalidViewDefinition(
                    "resource is required and must be non-empty".to_string(),
                ));
            }
            Some(_) => {}
        }

        check_selects(&self.select)?;
        Ok(())
    }
}

fn check_selects(selects: &[Select]) -> Result<()> {
    for select in selects {
        if select.for_each.is_some() && select.for_each_or_null.is_some() {
            return Err(SofError::InvalidViewDefinition(
                "a select may set forEach or forEachOrNull, not both".to_string(),
            ));
        }
        if select.column.is_empty() && select.select.is_empty() {
            return Err(SofError::InvalidViewDefinition(
                "a select must define columns or nested selects".to_string(),
            ));
        }
        for column in &select.column {
            if column.name.is_empty() {
                return Err(SofError::InvalidViewDefinition(
                    "column name must be non-empty".to_string(),
                ));
            }
        }
        check_selects(&select.select)?;
    }
    Ok(())
}

fn collect_column_names(selects: &[Select], names: &mut Vec<String>) {
    for select in selects {
        for column in &select.column {
            names.push(column.name.clone());
        }
        collect_column_names(&select.select, names);
    }
}
