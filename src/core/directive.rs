//! Directives attached to schema nodes
//!
//! A [`Directive`] is a name plus an ordered map of literal arguments. The
//! typed accessors (`string_arg`, `enum_arg`, `list_arg`, ...) treat an
//! omitted argument as `None` so callers can apply their documented default.

use graphql_parser::schema::{Directive as AstDirective, Value as AstValue};
use indexmap::IndexMap;
use serde_json::Value;

/// A literal directive argument value
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    Enum(String),
    List(Vec<ArgValue>),
    Object(IndexMap<String, ArgValue>),
}

impl ArgValue {
    /// Convert a literal from the schema AST
    ///
    /// Variables can not appear in schema literals and are mapped to `Null`.
    pub fn from_ast(value: &AstValue<'_, String>) -> Self {
        match value {
            AstValue::Null | AstValue::Variable(_) => ArgValue::Null,
            AstValue::Boolean(b) => ArgValue::Boolean(*b),
            AstValue::Int(i) => ArgValue::Int(i.as_i64().unwrap_or(0)),
            AstValue::Float(f) => ArgValue::Float(*f),
            AstValue::String(s) => ArgValue::String(s.clone()),
            AstValue::Enum(e) => ArgValue::Enum(e.clone()),
            AstValue::List(items) => ArgValue::List(items.iter().map(Self::from_ast).collect()),
            AstValue::Object(fields) => ArgValue::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from_ast(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to JSON, enums become strings
    pub fn to_json(&self) -> Value {
        match self {
            ArgValue::Null => Value::Null,
            ArgValue::Boolean(b) => Value::Bool(*b),
            ArgValue::Int(i) => Value::from(*i),
            ArgValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ArgValue::String(s) | ArgValue::Enum(s) => Value::String(s.clone()),
            ArgValue::List(items) => Value::Array(items.iter().map(ArgValue::to_json).collect()),
            ArgValue::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ArgValue::Null => "null",
            ArgValue::Boolean(_) => "Boolean",
            ArgValue::Int(_) => "Int",
            ArgValue::Float(_) => "Float",
            ArgValue::String(_) => "String",
            ArgValue::Enum(_) => "enum",
            ArgValue::List(_) => "list",
            ArgValue::Object(_) => "input object",
        }
    }
}

/// A directive argument could not be read
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArgumentError {
    #[error("argument '{argument}' is required")]
    Missing { argument: String },

    #[error("argument '{argument}' must be {expected}, got {found}")]
    WrongType {
        argument: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// A directive instance with its literal arguments, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// Directive name without the `@`
    pub name: String,

    arguments: IndexMap<String, ArgValue>,
}

impl Directive {
    /// Create a directive without arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: IndexMap::new(),
        }
    }

    /// Add an argument
    pub fn with_argument(mut self, name: impl Into<String>, value: ArgValue) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }

    /// Convert a directive from the schema AST
    pub fn from_ast(directive: &AstDirective<'_, String>) -> Self {
        Self {
            name: directive.name.clone(),
            arguments: directive
                .arguments
                .iter()
                .map(|(name, value)| (name.clone(), ArgValue::from_ast(value)))
                .collect(),
        }
    }

    /// All arguments in declaration order
    pub fn arguments(&self) -> &IndexMap<String, ArgValue> {
        &self.arguments
    }

    /// Raw argument value, `None` when omitted
    pub fn argument(&self, name: &str) -> Option<&ArgValue> {
        self.arguments.get(name)
    }

    /// String argument; an explicit `null` counts as omitted
    pub fn string_arg(&self, name: &str) -> Result<Option<String>, ArgumentError> {
        match self.arguments.get(name) {
            None | Some(ArgValue::Null) => Ok(None),
            Some(ArgValue::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(Self::wrong_type(name, "a String", other)),
        }
    }

    /// String argument, or `default` when omitted
    pub fn string_arg_or(&self, name: &str, default: &str) -> Result<String, ArgumentError> {
        Ok(self
            .string_arg(name)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// Required string argument
    pub fn require_string(&self, name: &str) -> Result<String, ArgumentError> {
        self.string_arg(name)?.ok_or_else(|| ArgumentError::Missing {
            argument: name.to_string(),
        })
    }

    /// Enum argument; string literals are accepted as well
    pub fn enum_arg(&self, name: &str) -> Result<Option<String>, ArgumentError> {
        match self.arguments.get(name) {
            None | Some(ArgValue::Null) => Ok(None),
            Some(ArgValue::Enum(s)) | Some(ArgValue::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(Self::wrong_type(name, "an enum value", other)),
        }
    }

    /// Boolean argument
    pub fn bool_arg(&self, name: &str) -> Result<Option<bool>, ArgumentError> {
        match self.arguments.get(name) {
            None | Some(ArgValue::Null) => Ok(None),
            Some(ArgValue::Boolean(b)) => Ok(Some(*b)),
            Some(other) => Err(Self::wrong_type(name, "a Boolean", other)),
        }
    }

    /// List of strings; a single string is coerced into a one-element list
    pub fn list_arg(&self, name: &str) -> Result<Option<Vec<String>>, ArgumentError> {
        match self.arguments.get(name) {
            None | Some(ArgValue::Null) => Ok(None),
            Some(ArgValue::String(s)) | Some(ArgValue::Enum(s)) => Ok(Some(vec![s.clone()])),
            Some(ArgValue::List(items)) => items
                .iter()
                .map(|item| match item {
                    ArgValue::String(s) | ArgValue::Enum(s) => Ok(s.clone()),
                    other => Err(Self::wrong_type(name, "a list of String", other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(other) => Err(Self::wrong_type(name, "a list of String", other)),
        }
    }

    fn wrong_type(name: &str, expected: &'static str, found: &ArgValue) -> ArgumentError {
        ArgumentError::WrongType {
            argument: name.to_string(),
            expected,
            found: found.kind(),
        }
    }
}
