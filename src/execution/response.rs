//! GraphQL response and per-field errors

use crate::core::error::{EngineError, ExecutionError, LoadError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One segment of a response path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(s: &str) -> Self {
        PathSegment::Field(s.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(i: usize) -> Self {
        PathSegment::Index(i)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, "{}", name),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Path from the response root to a field
pub type ResponsePath = Vec<PathSegment>;

/// An error entry of the response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: ResponsePath,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
            extensions: None,
        }
    }

    pub fn with_path(mut self, path: ResponsePath) -> Self {
        self.path = path;
        self
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Sets the `code` extension
    pub fn with_code(self, code: &str) -> Self {
        self.with_extension("code", Value::String(code.to_string()))
    }

    pub fn code(&self) -> Option<&str> {
        self.extensions
            .as_ref()
            .and_then(|e| e.get("code"))
            .and_then(Value::as_str)
    }

    /// Convert an error raised by a resolver, keeping engine error codes
    pub fn from_resolver_error(error: &anyhow::Error) -> Self {
        let code = if let Some(e) = error.downcast_ref::<LoadError>() {
            e.error_code()
        } else if let Some(e) = error.downcast_ref::<ExecutionError>() {
            e.error_code()
        } else if let Some(e) = error.downcast_ref::<EngineError>() {
            e.error_code()
        } else {
            "RESOLVER_ERROR"
        };
        Self::new(error.to_string()).with_code(code)
    }
}

impl From<&LoadError> for GraphQLError {
    fn from(error: &LoadError) -> Self {
        Self::new(error.to_string()).with_code(error.error_code())
    }
}

impl From<ExecutionError> for GraphQLError {
    fn from(error: ExecutionError) -> Self {
        Self::new(error.to_string()).with_code(error.error_code())
    }
}

/// Result of executing one operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
}

impl Response {
    pub fn new(data: Value, errors: Vec<GraphQLError>) -> Self {
        Self {
            data: Some(data),
            errors,
        }
    }

    /// A response for a request that failed before execution started
    pub fn from_error(error: impl Into<GraphQLError>) -> Self {
        Self {
            data: None,
            errors: vec![error.into()],
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The `data` entry, `Value::Null` when absent
    pub fn data(&self) -> &Value {
        self.data.as_ref().unwrap_or(&Value::Null)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_serializes_path_and_code() {
        let error = GraphQLError::new("Relation 'tasks' is not defined on model 'User'")
            .with_path(vec!["users".into(), 0.into(), "tasks".into()])
            .with_code("UNKNOWN_RELATION");

        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({
                "message": "Relation 'tasks' is not defined on model 'User'",
                "path": ["users", 0, "tasks"],
                "extensions": {"code": "UNKNOWN_RELATION"}
            })
        );
    }

    #[test]
    fn test_resolver_error_keeps_load_code() {
        let error = anyhow::Error::new(LoadError::Store {
            message: "timeout".to_string(),
        });
        assert_eq!(
            GraphQLError::from_resolver_error(&error).code(),
            Some("STORE_ERROR")
        );

        let plain = anyhow::anyhow!("boom");
        assert_eq!(
            GraphQLError::from_resolver_error(&plain).code(),
            Some("RESOLVER_ERROR")
        );
    }

    #[test]
    fn test_response_without_errors_omits_key() {
        let response = Response::new(json!({"user": null}), Vec::new());
        assert_eq!(response.to_json(), json!({"data": {"user": null}}));
        assert!(!response.has_errors());
    }
}
