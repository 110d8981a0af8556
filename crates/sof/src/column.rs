//! Column metadata for view results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Information about one column of a view result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// The column name.
    pub name: String,

    /// The column's data type.
    pub col_type: ColumnType,

    /// Whether this column can contain null values.
    pub nullable: bool,

    /// Human-readable description of the column.
    pub description: Option<String>,
}

impl ColumnInfo {
    /// Create a new column info with default settings.
    pub fn new(name: impl Into<String>, col_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            col_type,
            nullable: true,
            description: None,
        }
    }

    /// Set the column description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Data types a view column can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// String/text values; also the fallback for null-only columns.
    #[default]
    String,

    /// Integer values.
    Integer,

    /// Decimal/floating-point values.
    Decimal,

    /// Boolean values.
    Boolean,

    /// Date values (YYYY-MM-DD).
    Date,

    /// DateTime values (ISO 8601).
    DateTime,

    /// Collection or complex object values, carried as JSON text in
    /// formats without a native representation.
    Json,
}

impl ColumnType {
    /// Map a declared FHIR primitive type name to a column type.
    /// Unknown names fall back to `String`.
    pub fn from_fhir_type(type_str: &str) -> Self {
        match type_str.to_lowercase().as_str() {
            "integer" | "positiveint" | "unsignedint" | "integer64" => Self::Integer,
            "decimal" => Self::Decimal,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "datetime" | "instant" => Self::DateTime,
            _ => Self::String,
        }
    }

    /// Infer a column type from an observed value. Used for columns
    /// without a declared type; null values never resolve the type.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(Self::Boolean),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(Self::Integer),
            Value::Number(_) => Some(Self::Decimal),
            Value::String(_) => Some(Self::String),
            Value::Array(_) | Value::Object(_) => Some(Self::Json),
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Decimal => write!(f, "decimal"),
            Self::Boolean => write!(f, "boolean"),
            Self::Date => write!(f, "date"),
            Self::DateTime => write!(f, "dateTime"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_fhir_type_maps_primitives() {
        assert_eq!(ColumnType::from_fhir_type("string"), ColumnType::String);
        assert_eq!(ColumnType::from_fhir_type("code"), ColumnType::String);
        assert_eq!(ColumnType::from_fhir_type("integer"), ColumnType::Integer);
        assert_eq!(
            ColumnType::from_fhir_type("positiveInt"),
            ColumnType::Integer
        );
        assert_eq!(ColumnType::from_fhir_type("decimal"), ColumnType::Decimal);
        assert_eq!(ColumnType::from_fhir_type("boolean"), ColumnType::Boolean);
        assert_eq!(ColumnType::from_fhir_type("date"), ColumnType::Date);
        assert_eq!(ColumnType::from_fhir_type("dateTime"), ColumnType::DateTime);
        assert_eq!(ColumnType::from_fhir_type("instant"), ColumnType::DateTime);
        assert_eq!(
            ColumnType::from_fhir_type("UnknownType"),
            ColumnType::String
        );
    }

    #[test]
    fn from_value_infers_observed_types() {
        assert_eq!(ColumnType::from_value(&json!(true)), Some(ColumnType::Boolean));
        assert_eq!(ColumnType::from_value(&json!(42)), Some(ColumnType::Integer));
        assert_eq!(ColumnType::from_value(&json!(1.5)), Some(ColumnType::Decimal));
        assert_eq!(ColumnType::from_value(&json!("x")), Some(ColumnType::String));
        assert_eq!(ColumnType::from_value(&json!(["a"])), Some(ColumnType::Json));
        assert_eq!(ColumnType::from_value(&Value::Null), None);
    }

    #[test]
    fn column_info_builder() {
        let col = ColumnInfo::new("family_name", ColumnType::String)
            .with_description("Patient family name");
        assert_eq!(col.name, "family_name");
        assert!(col.nullable);
        assert_eq!(col.description.as_deref(), Some("Patient family name"));
    }
}
