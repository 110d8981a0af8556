//! Restricted FHIRPath subset for SQL-on-FHIR view evaluation.
//!
//! This crate implements the small slice of FHIRPath that ViewDefinition
//! `column.path`, `forEach` and `where` expressions need: member access,
//! collection indexing, a handful of collection functions and an optional
//! trailing equality comparison. It is deliberately not a general FHIRPath
//! engine.
//!
//! Expressions are compiled once into a [`PathExpr`]; all syntax errors are
//! reported at compile time. Evaluation against a JSON tree is a total
//! function: it returns a (possibly empty) collection and cannot fail.
//!
//! ```
//! use sof_fhirpath::{parse, evaluate};
//! use serde_json::json;
//!
//! let expr = parse("name.given.first()").unwrap();
//! let patient = json!({
//!     "resourceType": "Patient",
//!     "name": [{"family": "Doe", "given": ["John", "J."]}]
//! });
//! assert_eq!(evaluate(&patient, &expr), vec![json!("John")]);
//! ```

mod ast;
mod evaluator;
mod parser;
mod tokenizer;

pub use ast::{CompareOp, Comparison, Function, Literal, Operand, PathExpr, Step};
pub use evaluator::evaluate;
pub use parser::parse;

use thiserror::Error;

/// Errors produced while compiling a path expression.
///
/// Evaluation never errors; every failure mode of this crate is a compile
/// time failure surfaced through this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// An unexpected character was found in the input.
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    /// The expression ended before a complete construct was parsed.
    #[error("unexpected end of expression")]
    UnexpectedEof,

    /// A token appeared in a position where the grammar does not allow it.
    #[error("unexpected {found} at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        offset: usize,
    },

    /// A string literal was not closed before the end of the input.
    #[error("unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize },

    /// A numeric literal could not be represented.
    #[error("invalid number '{text}' at offset {offset}")]
    InvalidNumber { text: String, offset: usize },

    /// A function name outside the supported subset was called.
    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    /// A supported function was called with arguments it does not take.
    #[error("function '{name}' takes no arguments")]
    UnexpectedArguments { name: String },

    /// A `%constant` reference could not be resolved against the
    /// ViewDefinition's constant table.
    #[error("unknown constant '%{name}'")]
    UnknownConstant { name: String },
}

/// Result alias for path compilation.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
