//! Bundle handling: extracting the resources a view runs over.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{Result, SofError};

/// A FHIR Bundle reduced to the resources it carries.
///
/// Entries without a `resource` field are skipped; everything else about
/// the Bundle (type, links, search metadata) is ignored.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    resources: Vec<Value>,
}

impl Bundle {
    /// Extract resources from a Bundle JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`SofError::Serialization`] when the document is not a
    /// Bundle or its `entry` field is not an array.
    pub fn from_json(value: &Value) -> Result<Self> {
        if value.get("resourceType").and_then(Value::as_str) != Some("Bundle") {
            return Err(SofError::Serialization(
                "input document is not a Bundle resource".to_string(),
            ));
        }

        let resources = match value.get("entry") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(|entry| entry.get("resource"))
                .filter(|resource| resource.is_object())
                .cloned()
                .collect(),
            Some(_) => {
                return Err(SofError::Serialization(
                    "Bundle entry must be an array".to_string(),
                ));
            }
        };

        Ok(Self { resources })
    }

    /// Parse a Bundle from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid JSON or the document
    /// is not a Bundle.
    pub fn parse(s: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(s).map_err(|e| SofError::Serialization(e.to_string()))?;
        Self::from_json(&value)
    }

    /// The resources in bundle order.
    pub fn resources(&self) -> &[Value] {
        &self.resources
    }

    /// Number of resources carried.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the bundle carries no resources.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// A resource's `meta.lastUpdated` instant, when present and parseable.
pub fn resource_last_updated(resource: &Value) -> Option<DateTime<Utc>> {
    resource
        .get("meta")
        .and_then(|meta| meta.get("lastUpdated"))
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
