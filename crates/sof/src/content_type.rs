//! Output content type parsing and normalization.
//!
//! Accepts both bare format tokens (`"csv"`, `"json"`, `"ndjson"`) and
//! MIME types (`"text/csv"`, `"application/json"`); `text/csv` defaults
//! to header-included, with a `;header=false` parameter selecting the
//! headerless variant. There is no fallback format: anything else is an
//! [`SofError::UnsupportedContentType`].

use crate::{Result, SofError};

/// Normalized output content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// CSV without a header row.
    Csv,

    /// CSV with a header row (the default for `csv` and `text/csv`).
    CsvWithHeader,

    /// Single JSON array of row objects.
    Json,

    /// Newline-delimited JSON, one row object per line.
    Ndjson,

    /// Apache Parquet columnar binary (requires the `parquet` feature).
    #[cfg(feature = "parquet")]
    Parquet,
}

impl ContentType {
    /// Parse a format token or MIME type string.
    ///
    /// # Errors
    ///
    /// Returns [`SofError::UnsupportedContentType`] for anything outside
    /// the supported set.
    pub fn from_string(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        let (base, params) = match normalized.split_once(';') {
            Some((base, params)) => (base.trim(), Some(params)),
            None => (normalized.as_str(), None),
        };

        match base {
            "csv" | "csv_with_header" | "text/csv" => {
                if csv_header_included(params)? {
                    Ok(Self::CsvWithHeader)
                } else {
                    Ok(Self::Csv)
                }
            }
            "json" | "application/json" => Ok(Self::Json),
            "ndjson" | "jsonl" | "application/ndjson" | "application/x-ndjson" => Ok(Self::Ndjson),
            #[cfg(feature = "parquet")]
            "parquet" | "application/parquet" | "application/vnd.apache.parquet" => {
                Ok(Self::Parquet)
            }
            _ => Err(SofError::UnsupportedContentType(s.to_string())),
        }
    }

    /// Canonical token for this content type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::CsvWithHeader => "csv_with_header",
            Self::Json => "json",
            Self::Ndjson => "ndjson",
            #[cfg(feature = "parquet")]
            Self::Parquet => "parquet",
        }
    }

    /// MIME type for HTTP responses carrying this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Csv | Self::CsvWithHeader => "text/csv; charset=utf-8",
            Self::Json => "application/json",
            Self::Ndjson => "application/x-ndjson",
            #[cfg(feature = "parquet")]
            Self::Parquet => "application/vnd.apache.parquet",
        }
    }

    /// Conventional file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv | Self::CsvWithHeader => "csv",
            Self::Json => "json",
            Self::Ndjson => "ndjson",
            #[cfg(feature = "parquet")]
            Self::Parquet => "parquet",
        }
    }
}

/// Interpret MIME parameters after `text/csv`. Only `header=true|false`
/// is recognized; headers are included when the parameter is absent.
fn csv_header_included(params: Option<&str>) -> Result<bool> {
    let Some(params) = params else {
        return Ok(true);
    };

    for param in params.split(';') {
        let mut parts = param.splitn(2, '=');
        let key = parts.next().unwrap_or("").trim();
        let value = parts.next().unwrap_or("").trim();
        if key == "header" {
            return match value {
                "true" => Ok(true),
                "false" => Ok(false),
                other => Err(SofError::UnsupportedContentType(format!(
                    "invalid csv header parameter: {other}"
                ))),
            };
        }
    }

    Ok(true)
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = SofError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}
