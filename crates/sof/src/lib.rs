//! SQL-on-FHIR ViewDefinition engine.
//!
//! This crate transforms FHIR resources into flat tabular data using
//! ViewDefinition resources, entirely in memory: a ViewDefinition and a
//! Bundle go in as generic JSON documents, bytes in one of several wire
//! formats (CSV, JSON array, NDJSON, Parquet) come out.
//!
//! # Components
//!
//! - [`ViewDefinition`] - Parsed representation of a FHIR ViewDefinition
//! - [`CompiledView`] - A ViewDefinition with every path expression
//!   compiled and the output column order fixed
//! - [`ViewRunner`] - Executes a compiled view against a Bundle, fanning
//!   resources out across worker threads
//! - [`output`] - Writers for the supported output formats
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use sof::{run_view_definition, ContentType};
//!
//! let view = json!({
//!     "resourceType": "ViewDefinition",
//!     "resource": "Patient",
//!     "select": [{"column": [{"name": "id", "path": "id"}]}]
//! });
//! let bundle = json!({"resourceType": "Bundle", "entry": []});
//!
//! let bytes = run_view_definition(&view, &bundle, ContentType::Json).unwrap();
//! assert_eq!(bytes, b"[]");
//! ```
//!
//! # SQL on FHIR Specification
//!
//! See: <https://build.fhir.org/ig/FHIR/sql-on-fhir-v2/>

mod bundle;
mod column;
mod content_type;
mod engine;
mod options;
pub mod output;
mod pagination;
mod runner;
mod view_definition;

pub use bundle::Bundle;
pub use column::{ColumnInfo, ColumnType};
pub use content_type::ContentType;
pub use engine::CompiledView;
pub use options::{FhirVersion, RunOptions, supported_versions};
pub use runner::{ViewResult, ViewRunner};
pub use view_definition::{Column, Constant, Select, ViewDefinition, WhereClause};

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while running a ViewDefinition.
///
/// Every failure aborts the current call and surfaces with its specific
/// kind; nothing is retried or downgraded to a warning.
#[derive(Debug, Error)]
pub enum SofError {
    /// The ViewDefinition is missing required fields or structurally
    /// malformed. Raised at parse time, before any resource is touched.
    #[error("Invalid ViewDefinition: {0}")]
    InvalidViewDefinition(String),

    /// A path expression failed to compile. Evaluation itself is total
    /// and cannot produce this.
    #[error("FHIRPath error: {0}")]
    FhirPath(#[from] sof_fhirpath::ParseError),

    /// An input document is not well-formed structured data.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Unrecognized output format token/MIME type, or an unsupported
    /// FHIR version.
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// Invalid execution options (pagination arithmetic, thread count).
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// CSV encoder failure.
    #[error("CSV generation error: {0}")]
    CsvGeneration(String),

    /// Environment-level failure in a serializer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for SofError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl SofError {
    /// Coarse error grouping for logging and callers that catch broadly.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidViewDefinition(_) | Self::InvalidOptions(_) => ErrorCategory::Validation,
            Self::FhirPath(_) => ErrorCategory::Path,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::UnsupportedContentType(_) => ErrorCategory::ContentType,
            Self::CsvGeneration(_) => ErrorCategory::Output,
            Self::Io(_) => ErrorCategory::Io,
        }
    }
}

/// Error categories for monitoring and classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Path,
    Serialization,
    ContentType,
    Output,
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Path => write!(f, "path"),
            Self::Serialization => write!(f, "serialization"),
            Self::ContentType => write!(f, "content_type"),
            Self::Output => write!(f, "output"),
            Self::Io => write!(f, "io"),
        }
    }
}

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, SofError>;

/// Run a ViewDefinition against a Bundle with default options and return
/// the serialized result.
///
/// # Errors
///
/// Returns an error if the ViewDefinition is invalid, a path expression
/// fails to compile, or serialization fails.
pub fn run_view_definition(
    view: &Value,
    bundle: &Value,
    content_type: ContentType,
) -> Result<Vec<u8>> {
    run_view_definition_with_options(view, bundle, content_type, RunOptions::default())
}

/// Run a ViewDefinition against a Bundle with filtering, pagination and
/// threading options.
///
/// Output is byte-for-byte independent of `num_threads` for the same
/// input.
///
/// # Errors
///
/// In addition to the failure modes of [`run_view_definition`], invalid
/// option combinations (`num_threads = 0`, `page` without `limit`) are
/// rejected before execution starts.
pub fn run_view_definition_with_options(
    view: &Value,
    bundle: &Value,
    content_type: ContentType,
    options: RunOptions,
) -> Result<Vec<u8>> {
    options.validate()?;

    let definition = ViewDefinition::from_json(view)?;
    let compiled = CompiledView::compile(&definition)?;
    let bundle = Bundle::from_json(bundle)?;

    let runner = ViewRunner::new(compiled);
    let result = runner.run(&bundle, &options)?;

    let writer = output::writer_for(content_type);
    let mut buffer = Vec::new();
    writer.write(&result, &mut buffer)?;
    Ok(buffer)
}

/// Structural validity check for a ViewDefinition document: required
/// fields are present and non-null. Path expressions are not compiled,
/// so a view with unresolvable paths can still validate.
pub fn validate_view_definition(view: &Value) -> bool {
    view.get("resourceType").and_then(Value::as_str) == Some("ViewDefinition")
        && view
            .get("resource")
            .and_then(Value::as_str)
            .is_some_and(|r| !r.is_empty())
}

/// Structural validity check for a Bundle document.
pub fn validate_bundle(bundle: &Value) -> bool {
    bundle.get("resourceType").and_then(Value::as_str) == Some("Bundle")
        && match bundle.get("entry") {
            None | Some(Value::Null) => true,
            Some(Value::Array(_)) => true,
            Some(_) => false,
        }
}

/// Parse a content type token or MIME string into its canonical form.
///
/// Convenience wrapper over [`ContentType::from_string`] returning the
/// canonical token (`csv`, `csv_with_header`, `json`, `ndjson`,
/// `parquet`).
pub fn parse_content_type(s: &str) -> Result<&'static str> {
    Ok(ContentType::from_string(s)?.as_str())
}
