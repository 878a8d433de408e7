//! Arg values
//!
//! Provides [`ArgValue`], the tagged value type carried by story args, and
//! the [`Args`] mapping.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::fmt::{self, Display, Formatter};

/// Ordered mapping from arg name to value
pub type Args = IndexMap<String, ArgValue>;

/// JSON key used to encode [`ArgValue::Opaque`]
pub const OPAQUE_KEY: &str = "$opaque";

/// A single arg value
///
/// Scalars (`Null`, `Bool`, `Number`, `String`) compare by value, `Mapping`
/// and `Sequence` compare structurally, `Opaque` values (callbacks, actions,
/// anything the host cannot serialize) compare by their name.
///
/// Mapping equality ignores key order. NaN numbers equal each other.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(from = "JsonValue", into = "JsonValue")]
pub enum ArgValue {
    /// Explicit null
    #[default]
    Null,

    /// Boolean scalar
    Bool(bool),

    /// Numeric scalar
    Number(f64),

    /// String scalar
    String(String),

    /// Nested mapping
    Mapping(Args),

    /// Ordered sequence
    Sequence(Vec<ArgValue>),

    /// Named non-serializable value
    Opaque(String),
}

/// Structural kind of an [`ArgValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `Null`, `Bool`, `Number` or `String`
    Scalar,
    /// `Mapping`
    Mapping,
    /// `Sequence`
    Sequence,
    /// `Opaque`
    Opaque,
}

impl ArgValue {
    /// Create opaque value
    #[inline]
    #[must_use]
    pub fn opaque(name: impl Into<String>) -> Self {
        Self::Opaque(name.into())
    }

    /// Structural kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::String(_) => ValueKind::Scalar,
            Self::Mapping(_) => ValueKind::Mapping,
            Self::Sequence(_) => ValueKind::Sequence,
            Self::Opaque(_) => ValueKind::Opaque,
        }
    }

    /// Check if value is a scalar
    #[inline]
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.kind() == ValueKind::Scalar
    }

    /// Check if value is null
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// String content, if this is a string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric content, if this is a number
    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean content, if this is a boolean
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Mapping content, if this is a mapping
    #[inline]
    #[must_use]
    pub fn as_mapping(&self) -> Option<&Args> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Sequence content, if this is a sequence
    #[inline]
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[ArgValue]> {
        match self {
            Self::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to JSON
    ///
    /// Integral numbers are emitted as JSON integers. Non-finite numbers
    /// become `null`.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Mapping(m) => JsonValue::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Self::Sequence(s) => JsonValue::Array(s.iter().map(Self::to_json).collect()),
            Self::Opaque(name) => {
                let mut map = serde_json::Map::new();
                map.insert(OPAQUE_KEY.to_string(), JsonValue::String(name.clone()));
                JsonValue::Object(map)
            }
        }
    }
}

impl PartialEq for ArgValue {
    #[allow(clippy::float_cmp)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::String(a), Self::String(b)) | (Self::Opaque(a), Self::Opaque(b)) => a == b,
            (Self::Mapping(a), Self::Mapping(b)) => a == b,
            (Self::Sequence(a), Self::Sequence(b)) => a == b,
            _ => false,
        }
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn number_to_json(n: f64) -> JsonValue {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return JsonValue::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
}

impl From<JsonValue> for ArgValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Self::String(s),
            JsonValue::Array(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            JsonValue::Object(map) => {
                if map.len() == 1 {
                    if let Some(JsonValue::String(name)) = map.get(OPAQUE_KEY) {
                        return Self::Opaque(name.clone());
                    }
                }
                Self::Mapping(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<ArgValue> for JsonValue {
    fn from(value: ArgValue) -> Self {
        value.to_json()
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for ArgValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<ArgValue>> for ArgValue {
    fn from(value: Vec<ArgValue>) -> Self {
        Self::Sequence(value)
    }
}

impl From<Args> for ArgValue {
    fn from(value: Args) -> Self {
        Self::Mapping(value)
    }
}

impl Display for ArgValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Opaque(name) => write!(f, "[{name}]"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

/// Build [`Args`] from a JSON object
///
/// Non-object input yields empty args.
#[must_use]
pub fn args_from_json(value: JsonValue) -> Args {
    match ArgValue::from(value) {
        ArgValue::Mapping(args) => args,
        _ => Args::new(),
    }
}

/// Convert [`Args`] to a JSON object
#[must_use]
pub fn args_to_json(args: &Args) -> JsonValue {
    ArgValue::Mapping(args.clone()).to_json()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_round_trip_keeps_integers() {
        let value = ArgValue::from(json!({"count": 3, "ratio": 0.5, "tags": ["a", "b"]}));
        assert_eq!(value.to_json(), json!({"count": 3, "ratio": 0.5, "tags": ["a", "b"]}));
    }

    #[test]
    fn opaque_encodes_as_marker_object() {
        let value = ArgValue::opaque("onClick");
        assert_eq!(value.to_json(), json!({"$opaque": "onClick"}));
        assert_eq!(ArgValue::from(json!({"$opaque": "onClick"})), value);
    }

    #[test]
    fn mapping_equality_ignores_key_order() {
        let a = args_from_json(json!({"x": 1, "y": 2}));
        let b = args_from_json(json!({"y": 2, "x": 1}));
        assert_eq!(ArgValue::Mapping(a), ArgValue::Mapping(b));
    }

    #[test]
    fn kinds() {
        assert_eq!(ArgValue::from(1).kind(), ValueKind::Scalar);
        assert_eq!(ArgValue::Sequence(vec![]).kind(), ValueKind::Sequence);
        assert_eq!(ArgValue::Mapping(Args::new()).kind(), ValueKind::Mapping);
        assert_eq!(ArgValue::opaque("f").kind(), ValueKind::Opaque);
    }

    #[test]
    fn serde_uses_json_representation() {
        let args = args_from_json(json!({"label": "Hi", "on": {"$opaque": "action"}}));
        let text = serde_json::to_string(&args).unwrap();
        let back: Args = serde_json::from_str(&text).unwrap();
        assert_eq!(back, args);
        assert_eq!(back["on"], ArgValue::opaque("action"));
    }

    #[test]
    fn nan_equals_itself() {
        let value = ArgValue::from(f64::NAN);
        assert_eq!(value, value.clone());
        assert_ne!(value, ArgValue::from(0.0));
        assert_ne!(ArgValue::String("a".into()), ArgValue::opaque("a"));
    }

    #[test]
    fn display_is_raw_for_strings() {
        assert_eq!(ArgValue::from("hi").to_string(), "hi");
        assert_eq!(ArgValue::from(2).to_string(), "2");
        assert_eq!(ArgValue::Bool(true).to_string(), "true");
    }
}
