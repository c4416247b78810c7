//! Values of the replay runtime

use std::collections::HashMap;
use std::fmt;

use crate::common::{Error, Result};
use crate::runtime::{CallableId, ScriptValue};

/// A script value as produced by a trace or by the evaluator
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Compound value with named members, in declaration order
    Object(Vec<(String, ReplayValue)>),
    Function { id: CallableId, name: String },
    /// A thrown error; displays as its message
    Error(String),
}

impl ReplayValue {
    /// Convert a YAML value from a trace
    ///
    /// Strings of the form `&name` refer to the trace function `name`.
    pub fn from_yaml(value: &serde_yaml::Value, functions: &HashMap<String, CallableId>) -> Result<Self> {
        use serde_yaml::Value;

        let converted = match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => match s.strip_prefix('&') {
                Some(name) => {
                    let id = functions
                        .get(name)
                        .copied()
                        .ok_or_else(|| Error::UnknownFunction(name.to_string()))?;
                    Self::Function {
                        id,
                        name: name.to_string(),
                    }
                }
                None => Self::String(s.clone()),
            },
            Value::Sequence(items) => Self::Object(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| Ok((i.to_string(), Self::from_yaml(item, functions)?)))
                    .collect::<Result<_>>()?,
            ),
            Value::Mapping(mapping) => Self::Object(
                mapping
                    .iter()
                    .map(|(key, item)| Ok((yaml_key(key)?, Self::from_yaml(item, functions)?)))
                    .collect::<Result<_>>()?,
            ),
            Value::Tagged(tagged) => {
                return Err(Error::invalid_trace(format!(
                    "unsupported tagged value {}",
                    tagged.tag
                )))
            }
        };
        Ok(converted)
    }

    /// Optional YAML value, absent meaning undefined
    pub fn from_optional_yaml(
        value: Option<&serde_yaml::Value>,
        functions: &HashMap<String, CallableId>,
    ) -> Result<Self> {
        value.map_or(Ok(Self::Undefined), |value| Self::from_yaml(value, functions))
    }
}

/// Mapping keys must be plain scalars
pub(crate) fn yaml_key(key: &serde_yaml::Value) -> Result<String> {
    match key {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(Error::invalid_trace(format!("unsupported mapping key {other:?}"))),
    }
}

impl fmt::Display for ReplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) if n.is_nan() => write!(f, "NaN"),
            Self::Number(n) if n.is_infinite() => {
                write!(f, "{}Infinity", if *n < 0.0 { "-" } else { "" })
            }
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e21 => write!(f, "{n:.0}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Object(_) => write!(f, "[object Object]"),
            Self::Function { name, .. } => write!(f, "function {name}() {{ [code] }}"),
            Self::Error(message) => write!(f, "{message}"),
        }
    }
}

impl ScriptValue for ReplayValue {
    fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    fn is_object(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Function { .. } | Self::Error(_))
    }

    fn callable_id(&self) -> Option<CallableId> {
        match self {
            Self::Function { id, .. } => Some(*id),
            _ => None,
        }
    }
}
