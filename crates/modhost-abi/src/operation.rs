//! Operation tables and dynamically typed values
//!
//! Each module type declares its own operations in a `&'static [OperationSpec]`
//! table. Generic tooling reads the table to show what a module can do and
//! to build [`Value`] arguments for ad-hoc invocation.

use std::fmt;
use thiserror::Error;

use crate::interfaces::LookupError;

/// Kind of a parameter or return value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Unit,
    Bool,
    Int,
    Float,
    Str,
    List,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Unit => "void",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Str => "string",
            ValueKind::List => "list",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dynamically typed argument or result
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Unit => ValueKind::Unit,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::List(_) => ValueKind::List,
        }
    }

    /// Parse a textual argument (e.g. from a command line) as `kind`.
    ///
    /// Lists are comma separated and parsed element-wise as strings.
    pub fn parse(kind: ValueKind, raw: &str) -> Result<Value, InvokeError> {
        let invalid = || InvokeError::Parse {
            kind,
            input: raw.to_string(),
        };
        match kind {
            ValueKind::Unit => {
                if raw.is_empty() {
                    Ok(Value::Unit)
                } else {
                    Err(invalid())
                }
            }
            ValueKind::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "0" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            ValueKind::Int => raw.trim().parse().map(Value::Int).map_err(|_| invalid()),
            ValueKind::Float => raw.trim().parse().map(Value::Float).map_err(|_| invalid()),
            ValueKind::Str => Ok(Value::Str(raw.to_string())),
            ValueKind::List => Ok(Value::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| Value::Str(item.to_string()))
                    .collect(),
            )),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => f.write_str("()"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(v) => f.write_str(v),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

/// A named, typed parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ValueKind,
}

impl ParamSpec {
    pub const fn new(name: &'static str, kind: ValueKind) -> Self {
        ParamSpec { name, kind }
    }
}

/// One entry of a module's operation table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: &'static str,
    pub returns: ValueKind,
    pub params: &'static [ParamSpec],
    /// Event streams are listed for discovery but cannot be called.
    pub invokable: bool,
}

impl OperationSpec {
    pub const fn new(name: &'static str, returns: ValueKind, params: &'static [ParamSpec]) -> Self {
        OperationSpec {
            name,
            returns,
            params,
            invokable: true,
        }
    }

    /// An event stream the module emits; shown by introspection, never invoked.
    pub const fn event(name: &'static str, params: &'static [ParamSpec]) -> Self {
        OperationSpec {
            name,
            returns: ValueKind::Unit,
            params,
            invokable: false,
        }
    }

    /// Normalized signature, e.g. `add(int,int)`
    pub fn signature(&self) -> String {
        let kinds: Vec<&str> = self.params.iter().map(|p| p.kind.as_str()).collect();
        format!("{}({})", self.name, kinds.join(","))
    }

    /// Check that `args` fit this operation's parameter list.
    pub fn check_arguments(&self, args: &[Value]) -> Result<(), InvokeError> {
        if !self.invokable {
            return Err(InvokeError::NotInvokable(self.name.to_string()));
        }
        if args.len() != self.params.len() {
            return Err(InvokeError::Arity {
                operation: self.name.to_string(),
                expected: self.params.len(),
                found: args.len(),
            });
        }
        for (param, arg) in self.params.iter().zip(args) {
            if param.kind != arg.kind() {
                return Err(InvokeError::ArgumentKind {
                    operation: self.name.to_string(),
                    parameter: param.name.to_string(),
                    expected: param.kind,
                    found: arg.kind(),
                });
            }
        }
        Ok(())
    }
}

/// Errors raised while invoking a module operation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvokeError {
    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("Operation '{0}' is an event and cannot be invoked")]
    NotInvokable(String),

    #[error("Operation '{operation}' takes {expected} argument(s), got {found}")]
    Arity {
        operation: String,
        expected: usize,
        found: usize,
    },

    #[error("Argument '{parameter}' of '{operation}' must be {expected}, got {found}")]
    ArgumentKind {
        operation: String,
        parameter: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("Cannot parse '{input}' as {kind}")]
    Parse { kind: ValueKind, input: String },

    #[error("Dependency unavailable: {0}")]
    Dependency(#[from] LookupError),

    #[error("{0}")]
    Failed(String),
}
