//! Parameter resolution for node calls
//!
//! Every lookup reads `inputs` first and falls back to `config`; `null`
//! counts as absent. Values are coerced into typed parameters here so the
//! handlers never see loosely typed JSON.

use serde_json::Value;

use super::traits::NodeError;
use super::types::ValueMap;
use crate::media::layout::Offset;

#[derive(Debug, Clone, Copy)]
pub struct Params<'a> {
    inputs: &'a ValueMap,
    config: &'a ValueMap,
}

impl<'a> Params<'a> {
    pub fn new(inputs: &'a ValueMap, config: &'a ValueMap) -> Self {
        Self { inputs, config }
    }

    /// Raw value for `key`, inputs first
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.inputs
            .get(key)
            .filter(|v| !v.is_null())
            .or_else(|| self.config.get(key).filter(|v| !v.is_null()))
    }

    pub fn string(&self, key: &str) -> Result<Option<String>, NodeError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(invalid(key, "a string", other)),
        }
    }

    pub fn string_or(&self, key: &str, default: &str) -> Result<String, NodeError> {
        Ok(self.string(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// Non-empty string, `MissingInput` otherwise
    pub fn required_string(&self, key: &str, what: &str) -> Result<String, NodeError> {
        match self.string(key)? {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => Err(NodeError::MissingInput(format!("{what} is required ({key})"))),
        }
    }

    pub fn f64(&self, key: &str) -> Result<Option<f64>, NodeError> {
        let value = match self.get(key) {
            None => return Ok(None),
            Some(v) => v,
        };

        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };

        match parsed {
            Some(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(invalid(key, "a number", value)),
        }
    }

    pub fn f64_or(&self, key: &str, default: f64) -> Result<f64, NodeError> {
        Ok(self.f64(key)?.unwrap_or(default))
    }

    /// Non-negative integer; whole floats and numeric strings are accepted
    pub fn u32(&self, key: &str) -> Result<Option<u32>, NodeError> {
        let value = match self.get(key) {
            None => return Ok(None),
            Some(v) => v,
        };

        let parsed = match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };

        parsed
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| invalid(key, "a non-negative integer", value))
    }

    pub fn offset(&self, key: &str) -> Result<Offset, NodeError> {
        match self.get(key) {
            None => Ok(Offset::default()),
            Some(value) => Offset::from_value(value)
                .map_err(|msg| NodeError::InvalidParameter(format!("{key}: {msg}"))),
        }
    }

    /// List of strings; a single string is read as a one-element list
    pub fn string_list(&self, key: &str) -> Result<Option<Vec<String>>, NodeError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(vec![s.clone()])),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(invalid(key, "a list of strings", other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(other) => Err(invalid(key, "a list of strings", other)),
        }
    }
}

fn invalid(key: &str, expected: &str, value: &Value) -> NodeError {
    NodeError::InvalidParameter(format!("{key} must be {expected}, got {value}"))
}
