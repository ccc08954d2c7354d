use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

use crate::error::TypeError;

/// Structured context attached to an entry.
///
/// Keys are kept sorted so the serialized form is identical across runs,
/// which the checksum depends on.
pub type Context = BTreeMap<String, ContextValue>;

/// A JSON-compatible context value.
///
/// Mappings are `BTreeMap`s, so every nested object serializes with sorted
/// keys. Numbers keep the integer/float distinction of their source.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum ContextValue {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<ContextValue>),
    Object(BTreeMap<String, ContextValue>),
}

impl ContextValue {
    /// Name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ContextValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, ContextValue>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Convert into a `serde_json::Value`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Build a [`Context`] from a JSON object. Anything else is rejected.
pub fn context_from_json(value: Value) -> Result<Context, TypeError> {
    match ContextValue::from(value) {
        ContextValue::Object(map) => Ok(map),
        other => Err(TypeError::NotAnObject(other.kind())),
    }
}

impl From<Value> for ContextValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<ContextValue> for Value {
    fn from(value: ContextValue) -> Self {
        value.to_json()
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ContextValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for ContextValue {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

/// Non-finite floats have no JSON form and become `Null`.
impl From<f64> for ContextValue {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Self::Null, Self::Number)
    }
}

impl<T: Into<ContextValue>> From<Vec<T>> for ContextValue {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ContextValue>> From<Option<T>> for ContextValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<BTreeMap<String, ContextValue>> for ContextValue {
    fn from(map: BTreeMap<String, ContextValue>) -> Self {
        Self::Object(map)
    }
}

impl Serialize for ContextValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => items.serialize(serializer),
            Self::Object(map) => map.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ContextValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_conversion_roundtrip() {
        let source = json!({
            "reason": "async",
            "weight": 0.5,
            "count": 3,
            "tags": ["a", "b"],
            "nested": {"ok": true, "missing": null}
        });
        let value = ContextValue::from(source.clone());
        assert_eq!(value.to_json(), source);
    }

    #[test]
    fn objects_serialize_with_sorted_keys() {
        let value = ContextValue::from(json!({"zeta": 1, "alpha": {"y": 2, "b": 3}}));
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(text, r#"{"alpha":{"b":3,"y":2},"zeta":1}"#);
    }

    #[test]
    fn integers_stay_integers() {
        let value = ContextValue::from(json!(42));
        assert_eq!(serde_json::to_string(&value).unwrap(), "42");
        let float = ContextValue::from(json!(42.0));
        assert_eq!(serde_json::to_string(&float).unwrap(), "42.0");
    }

    #[test]
    fn non_finite_float_is_null() {
        assert!(ContextValue::from(f64::NAN).is_null());
        assert!(ContextValue::from(f64::INFINITY).is_null());
    }

    #[test]
    fn context_from_json_requires_object() {
        assert!(context_from_json(json!({"k": "v"})).is_ok());
        assert_eq!(
            context_from_json(json!([1, 2])),
            Err(TypeError::NotAnObject("array"))
        );
    }

    #[test]
    fn deserialize_from_text() {
        let value: ContextValue = serde_json::from_str(r#"[null, true, "x", 1.5]"#).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 4);
        assert!(items[0].is_null());
        assert_eq!(items[1], ContextValue::Bool(true));
        assert_eq!(items[2].as_str(), Some("x"));
        assert_eq!(items[3].kind(), "number");
    }

    #[test]
    fn vec_and_option_conversions() {
        let v = ContextValue::from(vec!["UserDB", "RedisCache"]);
        assert_eq!(v.to_json(), json!(["UserDB", "RedisCache"]));
        let none: Option<&str> = None;
        assert!(ContextValue::from(none).is_null());
    }
}
