//! Execution options and the FHIR version capability table.

use chrono::{DateTime, Utc};

use crate::{Result, SofError};

/// Options controlling a single view execution.
///
/// Construct with struct-update syntax to stay forward-compatible:
///
/// ```
/// use sof::RunOptions;
///
/// let options = RunOptions {
///     limit: Some(100),
///     num_threads: Some(8),
///     ..Default::default()
/// };
/// assert_eq!(options.limit, Some(100));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    /// Drop resources whose `meta.lastUpdated` is strictly earlier than
    /// this instant. Resources without the metadata are kept.
    pub since: Option<DateTime<Utc>>,

    /// Maximum number of rows to emit. `Some(0)` yields zero rows.
    pub limit: Option<usize>,

    /// 1-based page selector; requires `limit` as the page size.
    pub page: Option<usize>,

    /// FHIR version the input documents are expressed in.
    pub fhir_version: FhirVersion,

    /// Worker count for parallel execution. `None` lets the platform
    /// choose; `Some(1)` forces sequential execution.
    pub num_threads: Option<usize>,
}

impl RunOptions {
    /// Validate option combinations before execution starts.
    ///
    /// # Errors
    ///
    /// Returns [`SofError::InvalidOptions`] for a zero thread count, a
    /// zero page number, or `page` without `limit`.
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == Some(0) {
            return Err(SofError::InvalidOptions(
                "num_threads must be a positive integer".to_string(),
            ));
        }
        if self.page == Some(0) {
            return Err(SofError::InvalidOptions(
                "page is 1-based and must be positive".to_string(),
            ));
        }
        if self.page.is_some() && self.limit.is_none() {
            return Err(SofError::InvalidOptions(
                "page requires limit to define the page size".to_string(),
            ));
        }
        Ok(())
    }
}

/// FHIR versions this build can accept.
///
/// `R4` is always available; the others are build-time capability flags,
/// mirroring how the engine is compiled for downstream distributions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FhirVersion {
    #[default]
    R4,
    #[cfg(feature = "R4B")]
    R4B,
    #[cfg(feature = "R5")]
    R5,
    #[cfg(feature = "R6")]
    R6,
}

impl FhirVersion {
    /// Parse a version label such as `"R4"`.
    ///
    /// # Errors
    ///
    /// Unknown or not-compiled-in versions return
    /// [`SofError::UnsupportedContentType`], matching how the binding
    /// layer surfaces unsupported versions.
    pub fn from_string(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "R4" => Ok(Self::R4),
            #[cfg(feature = "R4B")]
            "R4B" => Ok(Self::R4B),
            #[cfg(feature = "R5")]
            "R5" => Ok(Self::R5),
            #[cfg(feature = "R6")]
            "R6" => Ok(Self::R6),
            _ => Err(SofError::UnsupportedContentType(format!(
                "unsupported FHIR version: {s}"
            ))),
        }
    }

    /// Version label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::R4 => "R4",
            #[cfg(feature = "R4B")]
            Self::R4B => "R4B",
            #[cfg(feature = "R5")]
            Self::R5 => "R5",
            #[cfg(feature = "R6")]
            Self::R6 => "R6",
        }
    }
}

impl std::fmt::Display for FhirVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// FHIR versions compiled into this build. Static and read-only; `R4` is
/// always present.
pub fn supported_versions() -> &'static [FhirVersion] {
    static VERSIONS: &[FhirVersion] = &[
        FhirVersion::R4,
        #[cfg(feature = "R4B")]
        FhirVersion::R4B,
        #[cfg(feature = "R5")]
        FhirVersion::R5,
        #[cfg(feature = "R6")]
        FhirVersion::R6,
    ];
    VERSIONS
}
