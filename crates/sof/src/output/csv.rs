//! CSV serializer.

use std::io::Write;

use serde_json::Value;

use super::OutputWriter;
use crate::runner::ViewResult;
use crate::{Result, SofError};

/// CSV output writer configuration.
#[derive(Debug, Clone)]
pub struct CsvWriter {
    /// Whether to emit a header row before the data.
    pub include_header: bool,

    /// Field delimiter (default: comma).
    pub delimiter: u8,

    /// Quote character (default: double quote).
    pub quote: u8,
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self {
            include_header: true,
            delimiter: b',',
            quote: b'"',
        }
    }
}

impl CsvWriter {
    /// Create a new CSV writer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to emit a header row.
    pub fn with_header(mut self, include: bool) -> Self {
        self.include_header = include;
        self
    }

    /// Set the field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

/// Render one cell. Nulls become empty fields; arrays are joined with
/// commas inside the (quoted) field; objects are embedded as JSON text.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(cell_text)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

impl OutputWriter for CsvWriter {
    fn content_type(&self) -> &'static str {
        "text/csv; charset=utf-8"
    }

    fn file_extension(&self) -> &'static str {
        "csv"
    }

    fn write(&self, result: &ViewResult, output: &mut dyn Write) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote(self.quote)
            .has_headers(false)
            .from_writer(output);

        if self.include_header {
            let headers: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
            writer
                .write_record(&headers)
                .map_err(|e| SofError::CsvGeneration(e.to_string()))?;
        }

        for row in &result.data {
            let cells: Vec<String> = row.iter().map(cell_text).collect();
            writer
                .write_record(&cells)
                .map_err(|e| SofError::CsvGeneration(e.to_string()))?;
        }

        writer
            .flush()
            .map_err(|e| SofError::CsvGeneration(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnInfo, ColumnType};
    use serde_json::json;

    fn result() -> ViewResult {
        ViewResult {
            columns: vec![
                ColumnInfo::new("id", ColumnType::String),
                ColumnInfo::new("name", ColumnType::String),
            ],
            data: vec![
                vec![json!("1"), json!("Alice")],
                vec![json!("2"), json!("Bob")],
            ],
            row_count: 2,
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let mut output = Vec::new();
        CsvWriter::new().write(&result(), &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "id,name\n1,Alice\n2,Bob\n"
        );
    }

    #[test]
    fn header_can_be_suppressed() {
        let mut output = Vec::new();
        CsvWriter::new()
            .with_header(false)
            .write(&result(), &mut output)
            .unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), "1,Alice\n2,Bob\n");
    }

    #[test]
    fn nulls_become_empty_fields() {
        let result = ViewResult {
            columns: vec![
                ColumnInfo::new("id", ColumnType::String),
                ColumnInfo::new("gender", ColumnType::String),
            ],
            data: vec![vec![json!("1"), Value::Null]],
            row_count: 1,
        };

        let mut output = Vec::new();
        CsvWriter::new().write(&result, &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "id,gender\n1,\n");
    }

    #[test]
    fn array_cells_are_joined_and_quoted() {
        let result = ViewResult {
            columns: vec![ColumnInfo::new("given", ColumnType::Json)],
            data: vec![vec![json!(["John", "J."])]],
            row_count: 1,
        };

        let mut output = Vec::new();
        CsvWriter::new().write(&result, &mut output).unwrap();
        // The embedded comma forces quoting of the whole field.
        assert_eq!(String::from_utf8(output).unwrap(), "given\n\"John,J.\"\n");
    }

    #[test]
    fn special_characters_are_escaped() {
        let result = ViewResult {
            columns: vec![ColumnInfo::new("note", ColumnType::String)],
            data: vec![vec![json!("say \"hi\", then\nleave")]],
            row_count: 1,
        };

        let mut output = Vec::new();
        CsvWriter::new().write(&result, &mut output).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "note\n\"say \"\"hi\"\", then\nleave\"\n"
        );
    }

    #[test]
    fn empty_result_is_header_only() {
        let result = ViewResult {
            columns: vec![ColumnInfo::new("id", ColumnType::String)],
            data: vec![],
            row_count: 0,
        };

        let mut output = Vec::new();
        CsvWriter::new().write(&result, &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "id\n");
    }

    #[test]
    fn cell_text_rendering() {
        assert_eq!(cell_text(&Value::Null), "");
        assert_eq!(cell_text(&json!(true)), "true");
        assert_eq!(cell_text(&json!(42)), "42");
        assert_eq!(cell_text(&json!("hello")), "hello");
        assert_eq!(cell_text(&json!(["a", "b"])), "a,b");
        assert_eq!(cell_text(&json!({"k": 1})), "{\"k\":1}");
    }
}
