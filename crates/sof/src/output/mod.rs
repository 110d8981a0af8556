//! Serializers turning a [`ViewResult`] into output bytes.
//!
//! One writer per wire format: CSV (with or without header), a single
//! JSON array, NDJSON, and Parquet when the `parquet` feature is
//! enabled. All writers are synchronous and buffer-friendly.

mod csv;
mod ndjson;

pub use csv::CsvWriter;
pub use ndjson::{JsonArrayWriter, NdjsonWriter};

#[cfg(feature = "parquet")]
mod parquet_writer;

#[cfg(feature = "parquet")]
pub use parquet_writer::{ParquetCompression, ParquetWriter};

use std::io::Write;

use crate::ContentType;
use crate::Result;
use crate::runner::ViewResult;

/// A serializer for one output format.
pub trait OutputWriter: Send + Sync {
    /// MIME content type of the produced bytes.
    fn content_type(&self) -> &'static str;

    /// Conventional file extension.
    fn file_extension(&self) -> &'static str;

    /// Serialize the result into `output`.
    fn write(&self, result: &ViewResult, output: &mut dyn Write) -> Result<()>;
}

/// The writer for a parsed content type.
pub fn writer_for(content_type: ContentType) -> Box<dyn OutputWriter> {
    match content_type {
        ContentType::Csv => Box::new(CsvWriter::new().with_header(false)),
        ContentType::CsvWithHeader => Box::new(CsvWriter::new()),
        ContentType::Json => Box::new(JsonArrayWriter::new()),
        ContentType::Ndjson => Box::new(NdjsonWriter::new()),
        #[cfg(feature = "parquet")]
        ContentType::Parquet => Box::new(ParquetWriter::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_for_covers_every_content_type() {
        assert_eq!(writer_for(ContentType::Csv).file_extension(), "csv");
        assert_eq!(
            writer_for(ContentType::CsvWithHeader).file_extension(),
            "csv"
        );
        assert_eq!(writer_for(ContentType::Json).file_extension(), "json");
        assert_eq!(writer_for(ContentType::Ndjson).file_extension(), "ndjson");
        #[cfg(feature = "parquet")]
        assert_eq!(writer_for(ContentType::Parquet).file_extension(), "parquet");
    }

    #[test]
    fn csv_header_variants_differ() {
        use crate::column::{ColumnInfo, ColumnType};

        let result = ViewResult {
            columns: vec![ColumnInfo::new("id", ColumnType::String)],
            data: vec![],
            row_count: 0,
        };

        let mut with_header = Vec::new();
        writer_for(ContentType::CsvWithHeader)
            .write(&result, &mut with_header)
            .unwrap();
        assert_eq!(String::from_utf8(with_header).unwrap(), "id\n");

        let mut without_header = Vec::new();
        writer_for(ContentType::Csv)
            .write(&result, &mut without_header)
            .unwrap();
        assert!(without_header.is_empty());
    }
}
