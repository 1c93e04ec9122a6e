use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;

use crate::domain::errors::{DomainError, Result};

/// Declared type of a stored configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Int,
    Int64,
    Double,
    Bool,
    String,
    Bytes,
}

impl ValueType {
    fn is_int_like(&self) -> bool {
        matches!(self, Self::Int | Self::Int64)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Int64 => "int64",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

/// A typed value held by the config store
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Int(i32),
    Int64(i64),
    Double(f64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
}

impl ConfigValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Int(_) => ValueType::Int,
            Self::Int64(_) => ValueType::Int64,
            Self::Double(_) => ValueType::Double,
            Self::Bool(_) => ValueType::Bool,
            Self::String(_) => ValueType::String,
            Self::Bytes(_) => ValueType::Bytes,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(i64::from(*v)),
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(f64::from(*v)),
            Self::Int64(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// Bound conversion for integer types: integral doubles are accepted, and
    /// the bound must fit the declared width
    fn bound_as_integer(&self, declared: ValueType) -> Option<i64> {
        let bound = match self {
            Self::Double(v)
                if v.is_finite()
                    && v.fract() == 0.0
                    && *v >= i64::MIN as f64
                    && *v < i64::MAX as f64 =>
            {
                Some(*v as i64)
            }
            other => other.as_i64(),
        }?;
        match declared {
            ValueType::Int => i32::try_from(bound).ok().map(i64::from),
            _ => Some(bound),
        }
    }

    /// JSON representation written into the persisted document.
    /// Byte sequences are stored as base64 strings.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Int(v) => Value::from(*v),
            Self::Int64(v) => Value::from(*v),
            Self::Double(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Bool(v) => Value::Bool(*v),
            Self::String(v) => Value::String(v.clone()),
            Self::Bytes(v) => Value::String(STANDARD.encode(v)),
        }
    }

    /// Read a persisted JSON value back as `target`, if it can be coerced
    pub fn from_json(value: &Value, target: ValueType) -> Option<Self> {
        match target {
            ValueType::Int => value
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Self::Int),
            ValueType::Int64 => value.as_i64().map(Self::Int64),
            ValueType::Double => value.as_f64().map(Self::Double),
            ValueType::Bool => value.as_bool().map(Self::Bool),
            ValueType::String => value.as_str().map(|s| Self::String(s.to_string())),
            ValueType::Bytes => value
                .as_str()
                .and_then(|s| STANDARD.decode(s).ok())
                .map(Self::Bytes),
        }
    }

    /// Check this value against a declared type and optional inclusive bounds
    pub fn validate(
        &self,
        declared: ValueType,
        min: Option<&ConfigValue>,
        max: Option<&ConfigValue>,
    ) -> Result<()> {
        if self.value_type() != declared {
            return Err(DomainError::TypeMismatch {
                expected: declared,
                actual: self.value_type(),
            });
        }

        if declared.is_int_like() {
            let v = self.as_i64().unwrap_or_default();
            if let Some(min) = min {
                let bound = min
                    .bound_as_integer(declared)
                    .ok_or(DomainError::BoundNotConvertible(declared))?;
                if v < bound {
                    return Err(DomainError::OutOfRange(format!("{} < {}", v, bound)));
                }
            }
            if let Some(max) = max {
                let bound = max
                    .bound_as_integer(declared)
                    .ok_or(DomainError::BoundNotConvertible(declared))?;
                if v > bound {
                    return Err(DomainError::OutOfRange(format!("{} > {}", v, bound)));
                }
            }
            return Ok(());
        }

        match declared {
            ValueType::Double => {
                let v = self.as_f64().unwrap_or_default();
                // JSON has no representation for NaN or infinities
                if !v.is_finite() {
                    return Err(DomainError::OutOfRange(format!("{} is not finite", v)));
                }
                if let Some(min) = min {
                    let bound = min
                        .as_f64()
                        .ok_or(DomainError::BoundNotConvertible(declared))?;
                    if v < bound {
                        return Err(DomainError::OutOfRange(format!("{} < {}", v, bound)));
                    }
                }
                if let Some(max) = max {
                    let bound = max
                        .as_f64()
                        .ok_or(DomainError::BoundNotConvertible(declared))?;
                    if v > bound {
                        return Err(DomainError::OutOfRange(format!("{} > {}", v, bound)));
                    }
                }
                Ok(())
            }
            ValueType::String => {
                let v = self.as_str().unwrap_or_default();
                if let Some(min) = min {
                    let bound = min
                        .as_str()
                        .ok_or(DomainError::BoundNotConvertible(declared))?;
                    if v < bound {
                        return Err(DomainError::OutOfRange(format!("'{}' < '{}'", v, bound)));
                    }
                }
                if let Some(max) = max {
                    let bound = max
                        .as_str()
                        .ok_or(DomainError::BoundNotConvertible(declared))?;
                    if v > bound {
                        return Err(DomainError::OutOfRange(format!("'{}' > '{}'", v, bound)));
                    }
                }
                Ok(())
            }
            // Ranges are meaningless for booleans
            ValueType::Bool => Ok(()),
            _ => {
                if min.is_some() || max.is_some() {
                    return Err(DomainError::RangeUnsupported(declared));
                }
                Ok(())
            }
        }
    }
}

impl From<i32> for ConfigValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<u8>> for ConfigValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl TryFrom<ConfigValue> for i32 {
    type Error = ConfigValue;

    fn try_from(value: ConfigValue) -> std::result::Result<Self, Self::Error> {
        match value {
            ConfigValue::Int(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl TryFrom<ConfigValue> for i64 {
    type Error = ConfigValue;

    fn try_from(value: ConfigValue) -> std::result::Result<Self, Self::Error> {
        match value {
            ConfigValue::Int64(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl TryFrom<ConfigValue> for f64 {
    type Error = ConfigValue;

    fn try_from(value: ConfigValue) -> std::result::Result<Self, Self::Error> {
        match value {
            ConfigValue::Double(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl TryFrom<ConfigValue> for bool {
    type Error = ConfigValue;

    fn try_from(value: ConfigValue) -> std::result::Result<Self, Self::Error> {
        match value {
            ConfigValue::Bool(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl TryFrom<ConfigValue> for String {
    type Error = ConfigValue;

    fn try_from(value: ConfigValue) -> std::result::Result<Self, Self::Error> {
        match value {
            ConfigValue::String(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl TryFrom<ConfigValue> for Vec<u8> {
    type Error = ConfigValue;

    fn try_from(value: ConfigValue) -> std::result::Result<Self, Self::Error> {
        match value {
            ConfigValue::Bytes(v) => Ok(v),
            other => Err(other),
        }
    }
}
