//! AST for compiled path expressions.

use serde_json::Value;

use crate::{ParseError, ParseResult};

/// A compiled path expression: a sequence of navigation steps followed by
/// an optional equality comparison (used by `where` clauses).
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    /// Navigation steps, applied left to right.
    pub steps: Vec<Step>,

    /// Optional trailing comparison against a literal or constant.
    pub comparison: Option<Comparison>,
}

impl PathExpr {
    /// Replace every `%constant` operand with its value from `lookup`.
    ///
    /// ViewDefinition constants are fixed for the lifetime of a view, so
    /// resolution happens once at compile time and evaluation never sees an
    /// unresolved reference.
    pub fn resolve_constants<F>(&mut self, lookup: F) -> ParseResult<()>
    where
        F: Fn(&str) -> Option<Value>,
    {
        if let Some(cmp) = &mut self.comparison {
            if let Operand::Constant(name) = &cmp.rhs {
                match lookup(name) {
                    Some(value) => cmp.rhs = Operand::Resolved(value),
                    None => {
                        return Err(ParseError::UnknownConstant { name: name.clone() });
                    }
                }
            }
        }
        Ok(())
    }
}

/// One navigation step of a path expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Member access by name; maps over arrays per FHIRPath collection
    /// semantics.
    Member(String),

    /// Zero-based index into the current collection.
    Index(usize),

    /// One of the supported collection functions.
    Function(Function),
}

/// Collection functions supported by the subset. None of them take
/// arguments; calls with arguments are rejected at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    First,
    Last,
    Exists,
    Empty,
    Count,
}

impl Function {
    /// Look up a function by its FHIRPath name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "first" => Some(Self::First),
            "last" => Some(Self::Last),
            "exists" => Some(Self::Exists),
            "empty" => Some(Self::Empty),
            "count" => Some(Self::Count),
            _ => None,
        }
    }

    /// The FHIRPath name of this function.
    pub fn name(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Last => "last",
            Self::Exists => "exists",
            Self::Empty => "empty",
            Self::Count => "count",
        }
    }
}

/// A trailing comparison, e.g. `active = true` or `status = %statusFilter`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub op: CompareOp,
    pub rhs: Operand,
}

/// Comparison operators supported by the subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A literal written in the expression.
    Literal(Literal),

    /// A `%name` reference to a ViewDefinition constant, not yet resolved.
    Constant(String),

    /// A constant reference after resolution.
    Resolved(Value),
}

impl Operand {
    /// The concrete JSON value to compare against, if resolution has
    /// happened (or was never needed).
    pub fn value(&self) -> Option<Value> {
        match self {
            Self::Literal(lit) => Some(lit.to_value()),
            Self::Resolved(value) => Some(value.clone()),
            Self::Constant(_) => None,
        }
    }
}

/// Literal values allowed on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
}

impl Literal {
    /// Convert to a JSON value for comparison.
    pub fn to_value(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(i) => Value::from(*i),
            Self::Decimal(d) => serde_json::Number::from_f64(*d)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Boolean(b) => Value::Bool(*b),
        }
    }
}
