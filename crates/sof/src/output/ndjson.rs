//! JSON serializers: NDJSON (one object per line) and a single JSON
//! array. Both emit the same row objects, with null columns omitted, so
//! the formats differ only in framing.

use std::io::Write;

use serde_json::Value;

use super::OutputWriter;
use crate::runner::ViewResult;
use crate::Result;

/// Newline-delimited JSON writer.
#[derive(Debug, Clone, Default)]
pub struct NdjsonWriter;

impl NdjsonWriter {
    pub fn new() -> Self {
        Self
    }
}

impl OutputWriter for NdjsonWriter {
    fn content_type(&self) -> &'static str {
        "application/x-ndjson"
    }

    fn file_extension(&self) -> &'static str {
        "ndjson"
    }

    fn write(&self, result: &ViewResult, output: &mut dyn Write) -> Result<()> {
        for index in 0..result.data.len() {
            let object = Value::Object(result.row_as_object(index));
            serde_json::to_writer(&mut *output, &object)?;
            output.write_all(b"\n")?;
        }
        output.flush()?;
        Ok(())
    }
}

/// JSON array writer.
#[derive(Debug, Clone, Default)]
pub struct JsonArrayWriter;

impl JsonArrayWriter {
    pub fn new() -> Self {
        Self
    }
}

impl OutputWriter for JsonArrayWriter {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }

    fn write(&self, result: &ViewResult, output: &mut dyn Write) -> Result<()> {
        serde_json::to_writer(&mut *output, &result.to_json_array())?;
        output.flush()?;
        Ok(())
    }
}
