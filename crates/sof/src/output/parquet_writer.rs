//! Parquet serializer, available with the `parquet` feature.

use std::io::Write;
use std::sync::Arc;

use serde_json::Value;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use super::OutputWriter;
use crate::column::{ColumnInfo, ColumnType};
use crate::runner::ViewResult;
use crate::{Result, SofError};

/// Parquet compression codecs.
#[derive(Debug, Clone, Copy, Default)]
pub enum ParquetCompression {
    /// No compression.
    None,
    /// Snappy compression (default, good balance of speed and ratio).
    #[default]
    Snappy,
    /// Gzip compression (better ratio, slower).
    Gzip,
    /// Zstd compression (good balance).
    Zstd,
}

impl From<ParquetCompression> for Compression {
    fn from(compression: ParquetCompression) -> Self {
        match compression {
            ParquetCompression::None => Compression::UNCOMPRESSED,
            ParquetCompression::Snappy => Compression::SNAPPY,
            ParquetCompression::Gzip => Compression::GZIP(Default::default()),
            ParquetCompression::Zstd => Compression::ZSTD(Default::default()),
        }
    }
}

/// Parquet output writer configuration.
#[derive(Debug, Clone, Default)]
pub struct ParquetWriter {
    /// Compression codec to use.
    pub compression: ParquetCompression,
}

impl ParquetWriter {
    /// Create a new Parquet writer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compression codec.
    pub fn with_compression(mut self, compression: ParquetCompression) -> Self {
        self.compression = compression;
        self
    }

    fn arrow_type(col_type: ColumnType) -> DataType {
        match col_type {
            ColumnType::Integer => DataType::Int64,
            ColumnType::Decimal => DataType::Float64,
            ColumnType::Boolean => DataType::Boolean,
            // Dates and JSON are carried as text.
            ColumnType::String | ColumnType::Date | ColumnType::DateTime | ColumnType::Json => {
                DataType::Utf8
            }
        }
    }

    fn build_schema(columns: &[ColumnInfo]) -> Schema {
        let fields: Vec<Field> = columns
            .iter()
            .map(|c| Field::new(&c.name, Self::arrow_type(c.col_type), c.nullable))
            .collect();
        Schema::new(fields)
    }

    fn build_arrays(columns: &[ColumnInfo], data: &[Vec<Value>]) -> Vec<ArrayRef> {
        columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let values: Vec<Option<&Value>> = data
                    .iter()
                    .map(|row| row.get(i).filter(|v| !v.is_null()))
                    .collect();
                Self::values_to_array(col.col_type, &values)
            })
            .collect()
    }

    fn values_to_array(col_type: ColumnType, values: &[Option<&Value>]) -> ArrayRef {
        match col_type {
            ColumnType::Integer => {
                let arr: Int64Array = values.iter().map(|v| v.and_then(|v| v.as_i64())).collect();
                Arc::new(arr)
            }
            ColumnType::Decimal => {
                let arr: Float64Array =
                    values.iter().map(|v| v.and_then(|v| v.as_f64())).collect();
                Arc::new(arr)
            }
            ColumnType::Boolean => {
                let arr: BooleanArray =
                    values.iter().map(|v| v.and_then(|v| v.as_bool())).collect();
                Arc::new(arr)
            }
            _ => {
                let arr: StringArray = values
                    .iter()
                    .map(|v| {
                        v.map(|v| match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                    })
                    .collect();
                Arc::new(arr)
            }
        }
    }

    fn write_to_buffer(&self, result: &ViewResult) -> Result<Vec<u8>> {
        let schema = Arc::new(Self::build_schema(&result.columns));
        let arrays = Self::build_arrays(&result.columns, &result.data);

        let record_batch = RecordBatch::try_new(schema.clone(), arrays)
            .map_err(|e| SofError::Io(std::io::Error::other(e.to_string())))?;

        let props = WriterProperties::builder()
            .set_compression(self.compression.into())
            .build();

        let mut buffer = Vec::new();
        let mut arrow_writer = ArrowWriter::try_new(&mut buffer, schema, Some(props))
            .map_err(|e| SofError::Io(std::io::Error::other(e.to_string())))?;
        arrow_writer
            .write(&record_batch)
            .map_err(|e| SofError::Io(std::io::Error::other(e.to_string())))?;
        arrow_writer
            .close()
            .map_err(|e| SofError::Io(std::io::Error::other(e.to_string())))?;

        Ok(buffer)
    }
}

impl OutputWriter for ParquetWriter {
    fn content_type(&self) -> &'static str {
        "application/vnd.apache.parquet"
    }

    fn file_extension(&self) -> &'static str {
        "parquet"
    }

    fn write(&self, result: &ViewResult, output: &mut dyn Write) -> Result<()> {
        let buffer = self.write_to_buffer(result)?;
        output.write_all(&buffer)?;
        output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_compression_is_snappy() {
        let writer = ParquetWriter::new();
        assert!(matches!(writer.compression, ParquetCompression::Snappy));
    }

    #[test]
    fn arrow_type_mapping() {
        assert_eq!(
            ParquetWriter::arrow_type(ColumnType::Integer),
            DataType::Int64
        );
        assert_eq!(
            ParquetWriter::arrow_type(ColumnType::Decimal),
            DataType::Float64
        );
        assert_eq!(
            ParquetWriter::arrow_type(ColumnType::Boolean),
            DataType::Boolean
        );
        assert_eq!(ParquetWriter::arrow_type(ColumnType::String), DataType::Utf8);
        assert_eq!(
            ParquetWriter::arrow_type(ColumnType::DateTime),
            DataType::Utf8
        );
        assert_eq!(ParquetWriter::arrow_type(ColumnType::Json), DataType::Utf8);
    }

    #[test]
    fn schema_follows_column_order() {
        let columns = vec![
            ColumnInfo::new("id", ColumnType::String),
            ColumnInfo::new("value", ColumnType::Integer),
            ColumnInfo::new("active", ColumnType::Boolean),
        ];

        let schema = ParquetWriter::build_schema(&columns);
        assert_eq!(schema.fields().len(), 3);
        assert_eq!(schema.field(0).name(), "id");
        assert_eq!(schema.field(1).data_type(), &DataType::Int64);
        assert_eq!(schema.field(2).data_type(), &DataType::Boolean);
    }

    #[test]
    fn output_starts_with_parquet_magic() {
        let result = ViewResult {
            columns: vec![
                ColumnInfo::new("id", ColumnType::String),
                ColumnInfo::new("value", ColumnType::Integer),
            ],
            data: vec![vec![json!("1"), json!(100)], vec![json!("2"), json!(200)]],
            row_count: 2,
        };

        let mut output = Vec::new();
        ParquetWriter::new().write(&result, &mut output).unwrap();

        assert!(output.len() > 4);
        assert_eq!(&output[0..4], b"PAR1");
    }

    #[test]
    fn empty_result_still_writes_a_valid_file() {
        let result = ViewResult {
            columns: vec![ColumnInfo::new("id", ColumnType::String)],
            data: vec![],
            row_count: 0,
        };

        let mut output = Vec::new();
        ParquetWriter::new().write(&result, &mut output).unwrap();
        assert_eq!(&output[0..4], b"PAR1");
    }

    #[test]
    fn null_values_are_preserved() {
        let result = ViewResult {
            columns: vec![
                ColumnInfo::new("id", ColumnType::String),
                ColumnInfo::new("name", ColumnType::String),
            ],
            data: vec![vec![json!("1"), Value::Null]],
            row_count: 1,
        };

        let mut output = Vec::new();
        ParquetWriter::new().write(&result, &mut output).unwrap();
        assert!(output.len() > 4);
    }

    #[test]
    fn collection_values_written_as_json_text() {
        let result = ViewResult {
            columns: vec![ColumnInfo::new("given", ColumnType::Json)],
            data: vec![vec![json!(["John", "J."])]],
            row_count: 1,
        };

        let mut output = Vec::new();
        ParquetWriter::new().write(&result, &mut output).unwrap();
        assert_eq!(&output[0..4], b"PAR1");
    }
}
