//! Value types for stratified models
//!
//! This module defines:
//! - RawValue: the tagged union stored in a stratum for one trait
//! - ObjectValue: the map form used by Object traits and ObjectArray elements
//!
//! ## Value Model
//!
//! RawValue has exactly 7 variants, the JSON data model with integers and
//! floats kept apart:
//! - Null, Bool, Int, Float, String, Array, Object
//!
//! ### Type Rules
//!
//! - No implicit coercions: a string is never read back as a number
//! - `Int(1) != Float(1.0)`: different variants are never equal
//! - Float equality is IEEE-754: `NaN != NaN`, `-0.0 == 0.0`
//! - Object keys are ordered, so serialization is deterministic

use crate::limits::LimitError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field map of an object value
pub type ObjectValue = BTreeMap<String, RawValue>;

/// A trait value as stored in a stratum
///
/// RawValue carries no schema information. Its shape is checked against a
/// trait definition at the write boundary, never later.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Explicit null (distinct from an absent value)
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Array of values
    Array(Vec<RawValue>),
    /// Object with string keys
    Object(ObjectValue),
}

impl PartialEq for RawValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RawValue::Null, RawValue::Null) => true,
            (RawValue::Bool(a), RawValue::Bool(b)) => a == b,
            (RawValue::Int(a), RawValue::Int(b)) => a == b,
            // IEEE-754: NaN != NaN, -0.0 == 0.0
            (RawValue::Float(a), RawValue::Float(b)) => a == b,
            (RawValue::String(a), RawValue::String(b)) => a == b,
            (RawValue::Array(a), RawValue::Array(b)) => a == b,
            (RawValue::Object(a), RawValue::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl RawValue {
    /// Runtime type name, as reported in schema violations
    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Bool(_) => "boolean",
            RawValue::Int(_) => "integer",
            RawValue::Float(_) => "number",
            RawValue::String(_) => "string",
            RawValue::Array(_) => "array",
            RawValue::Object(_) => "object",
        }
    }

    /// Empty object value
    pub fn object() -> Self {
        RawValue::Object(ObjectValue::new())
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Check if this is an object value
    pub fn is_object(&self) -> bool {
        matches!(self, RawValue::Object(_))
    }

    /// Check if this is an array value
    pub fn is_array(&self) -> bool {
        matches!(self, RawValue::Array(_))
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RawValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            RawValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is an Int or Float value
    ///
    /// Integers widen to f64; this is the only numeric conversion performed.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Int(i) => Some(*i as f64),
            RawValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as a slice if this is an Array value
    pub fn as_array(&self) -> Option<&[RawValue]> {
        match self {
            RawValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get as an object map if this is an Object value
    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            RawValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Mutable object map if this is an Object value
    pub fn as_object_mut(&mut self) -> Option<&mut ObjectValue> {
        match self {
            RawValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Nesting depth (scalars are depth 0)
    pub fn nesting_depth(&self) -> usize {
        match self {
            RawValue::Array(items) => 1 + items.iter().map(Self::nesting_depth).max().unwrap_or(0),
            RawValue::Object(fields) => {
                1 + fields.values().map(Self::nesting_depth).max().unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// Convert a JSON document into a RawValue, rejecting deep nesting
    ///
    /// Depth is measured on the JSON input before any allocation of the
    /// converted tree.
    pub fn from_json_checked(
        value: &serde_json::Value,
        max_depth: usize,
    ) -> Result<Self, LimitError> {
        let depth = json_depth(value);
        if depth > max_depth {
            return Err(LimitError::NestingTooDeep {
                depth,
                max: max_depth,
            });
        }
        Ok(Self::from(value.clone()))
    }

    /// Convert into a JSON document
    ///
    /// Non-finite floats have no JSON form and become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(self.clone())
    }
}

/// Nesting depth of a JSON document (scalars are depth 0)
pub fn json_depth(value: &serde_json::Value) -> usize {
    match value {
        serde_json::Value::Array(items) => 1 + items.iter().map(json_depth).max().unwrap_or(0),
        serde_json::Value::Object(fields) => 1 + fields.values().map(json_depth).max().unwrap_or(0),
        _ => 0,
    }
}

impl Default for RawValue {
    fn default() -> Self {
        RawValue::Null
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::String(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::String(s)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Int(i)
    }
}

impl From<i32> for RawValue {
    fn from(i: i32) -> Self {
        RawValue::Int(i as i64)
    }
}

impl From<f64> for RawValue {
    fn from(f: f64) -> Self {
        RawValue::Float(f)
    }
}

impl From<Vec<RawValue>> for RawValue {
    fn from(a: Vec<RawValue>) -> Self {
        RawValue::Array(a)
    }
}

impl From<ObjectValue> for RawValue {
    fn from(o: ObjectValue) -> Self {
        RawValue::Object(o)
    }
}

impl From<()> for RawValue {
    fn from(_: ()) -> Self {
        RawValue::Null
    }
}

// ============================================================================
// serde_json interop
// ============================================================================

impl From<serde_json::Value> for RawValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => RawValue::Null,
            serde_json::Value::Bool(b) => RawValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    RawValue::Int(i)
                } else {
                    // u64 beyond i64 range also lands here
                    RawValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => RawValue::String(s),
            serde_json::Value::Array(arr) => {
                RawValue::Array(arr.into_iter().map(RawValue::from).collect())
            }
            serde_json::Value::Object(obj) => {
                RawValue::Object(obj.into_iter().map(|(k, v)| (k, RawValue::from(v))).collect())
            }
        }
    }
}

impl From<RawValue> for serde_json::Value {
    fn from(v: RawValue) -> Self {
        match v {
            RawValue::Null => serde_json::Value::Null,
            RawValue::Bool(b) => serde_json::Value::Bool(b),
            RawValue::Int(i) => serde_json::Value::Number(i.into()),
            RawValue::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            RawValue::String(s) => serde_json::Value::String(s),
            RawValue::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(serde_json::Value::from).collect())
            }
            RawValue::Object(obj) => serde_json::Value::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_int_and_float_never_equal() {
        assert_ne!(RawValue::Int(1), RawValue::Float(1.0));
        assert_eq!(RawValue::Float(-0.0), RawValue::Float(0.0));
        assert_ne!(RawValue::Float(f64::NAN), RawValue::Float(f64::NAN));
    }

    #[test]
    fn test_json_numbers_keep_integer_variant() {
        assert_eq!(RawValue::from(json!(3)), RawValue::Int(3));
        assert_eq!(RawValue::from(json!(3.5)), RawValue::Float(3.5));
        assert_eq!(RawValue::from(json!(3.0)), RawValue::Float(3.0));
    }

    #[test]
    fn test_object_json_interop() {
        let value = RawValue::from(json!({"b": [1, "x"], "a": null}));
        let obj = value.as_object().unwrap();
        assert_eq!(obj.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(obj["a"].is_null());
        assert_eq!(value.to_json(), json!({"a": null, "b": [1, "x"]}));
    }

    #[test]
    fn test_non_finite_float_serializes_as_null() {
        assert_eq!(RawValue::Float(f64::INFINITY).to_json(), json!(null));
    }

    #[test]
    fn test_as_number_widens_int() {
        assert_eq!(RawValue::Int(2).as_number(), Some(2.0));
        assert_eq!(RawValue::from("2").as_number(), None);
    }

    #[test]
    fn test_nesting_depth() {
        assert_eq!(RawValue::Int(1).nesting_depth(), 0);
        assert_eq!(RawValue::from(json!({"a": [1]})).nesting_depth(), 2);
    }

    #[test]
    fn test_from_json_checked_rejects_deep_documents() {
        let mut doc = json!(1);
        for _ in 0..10 {
            doc = json!([doc]);
        }
        let err = RawValue::from_json_checked(&doc, 5).unwrap_err();
        assert_eq!(err, LimitError::NestingTooDeep { depth: 10, max: 5 });
        assert!(RawValue::from_json_checked(&doc, 10).is_ok());
    }

    #[test]
    fn test_untagged_serde_matches_json_shape() {
        let value: RawValue = serde_json::from_str(r#"{"x": [true, 1, 1.5, "s", null]}"#).unwrap();
        let back = serde_json::to_string(&value).unwrap();
        assert_eq!(back, r#"{"x":[true,1,1.5,"s",null]}"#);
    }
}
