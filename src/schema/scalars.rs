//! Scalar type implementations
//!
//! The five standard scalars are always present. Custom scalars declared in
//! the schema are bound to a [`ScalarType`] class through the scalar class
//! registry (`@scalar(class: ...)`, then the scalar's own name).

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::sync::Arc;

/// Serialization and input parsing of a scalar type
pub trait ScalarType: Send + Sync {
    /// Convert an internal value into its response representation
    fn serialize(&self, value: &Value) -> Result<Value>;

    /// Convert a client-provided value into its internal representation
    fn parse_value(&self, value: &Value) -> Result<Value>;
}

pub struct IntScalar;

impl ScalarType for IntScalar {
    fn serialize(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Number(n) if n.is_i64() => Ok(value.clone()),
            Value::Number(n) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| Value::from(f as i64))
                .ok_or_else(|| anyhow!("Int cannot represent non-integer value: {}", value)),
            Value::Bool(b) => Ok(Value::from(i64::from(*b))),
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| anyhow!("Int cannot represent non-integer value: \"{}\"", s)),
            _ => bail!("Int cannot represent value: {}", value),
        }
    }

    fn parse_value(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Number(n) if n.is_i64() => Ok(value.clone()),
            _ => bail!("Int cannot represent non-integer value: {}", value),
        }
    }
}

pub struct FloatScalar;

impl ScalarType for FloatScalar {
    fn serialize(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => s
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| anyhow!("Float cannot represent non numeric value: \"{}\"", s)),
            _ => bail!("Float cannot represent value: {}", value),
        }
    }

    fn parse_value(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Number(_) => Ok(value.clone()),
            _ => bail!("Float cannot represent non numeric value: {}", value),
        }
    }
}

pub struct StringScalar;

impl ScalarType for StringScalar {
    fn serialize(&self, value: &Value) -> Result<Value> {
        match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => bail!("String cannot represent value: {}", value),
        }
    }

    fn parse_value(&self, value: &Value) -> Result<Value> {
        match value {
            Value::String(_) => Ok(value.clone()),
            _ => bail!("String cannot represent a non string value: {}", value),
        }
    }
}

pub struct BooleanScalar;

impl ScalarType for BooleanScalar {
    fn serialize(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::Bool(n.as_f64().is_some_and(|f| f != 0.0))),
            _ => bail!("Boolean cannot represent a non boolean value: {}", value),
        }
    }

    fn parse_value(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Bool(_) => Ok(value.clone()),
            _ => bail!("Boolean cannot represent a non boolean value: {}", value),
        }
    }
}

/// IDs are serialized as strings, whatever their internal representation
pub struct IdScalar;

impl ScalarType for IdScalar {
    fn serialize(&self, value: &Value) -> Result<Value> {
        match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::String(n.to_string())),
            _ => bail!("ID cannot represent value: {}", value),
        }
    }

    fn parse_value(&self, value: &Value) -> Result<Value> {
        match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::String(n.to_string())),
            _ => bail!("ID cannot represent value: {}", value),
        }
    }
}

/// RFC 3339 date-time, stored as text or as a unix timestamp in seconds
pub struct DateTimeScalar;

impl DateTimeScalar {
    fn to_datetime(value: &Value) -> Result<DateTime<Utc>> {
        match value {
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| anyhow!("Invalid DateTime \"{}\": {}", s, e)),
            Value::Number(n) => n
                .as_i64()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .ok_or_else(|| anyhow!("Invalid DateTime timestamp: {}", n)),
            _ => bail!("DateTime cannot represent value: {}", value),
        }
    }
}

impl ScalarType for DateTimeScalar {
    fn serialize(&self, value: &Value) -> Result<Value> {
        let datetime = Self::to_datetime(value)?;
        Ok(Value::String(
            datetime.to_rfc3339_opts(SecondsFormat::Secs, true),
        ))
    }

    fn parse_value(&self, value: &Value) -> Result<Value> {
        match value {
            Value::String(_) => self.serialize(value),
            _ => bail!("DateTime must be given as an RFC 3339 string, got {}", value),
        }
    }
}

/// Arbitrary JSON, passed through untouched
pub struct JsonScalar;

impl ScalarType for JsonScalar {
    fn serialize(&self, value: &Value) -> Result<Value> {
        Ok(value.clone())
    }

    fn parse_value(&self, value: &Value) -> Result<Value> {
        Ok(value.clone())
    }
}

/// The implementation of a standard scalar, `None` for any other name
pub fn standard_scalar(name: &str) -> Option<Arc<dyn ScalarType>> {
    let scalar: Arc<dyn ScalarType> = match name {
        "Int" => Arc::new(IntScalar),
        "Float" => Arc::new(FloatScalar),
        "String" => Arc::new(StringScalar),
        "Boolean" => Arc::new(BooleanScalar),
        "ID" => Arc::new(IdScalar),
        _ => return None,
    };
    Some(scalar)
}
