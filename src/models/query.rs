//! Query parameter values.
//!
//! Named arguments are resolved into [`QueryParam`]s before they are bound to a
//! statement or rendered for diagnostics.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// A parameter value for parameterized queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryParam {
    /// NULL value
    Null,
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    Float(f64),
    String(String),
    /// Binary data (base64 encoded when serialized)
    #[serde(serialize_with = "base64_bytes::serialize")]
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Json(JsonValue),
}

impl QueryParam {
    /// Whether diagnostics render this value inside single quotes.
    pub fn is_string_like(&self) -> bool {
        matches!(self, Self::String(_) | Self::Bytes(_) | Self::Uuid(_))
    }

    /// Convert a JSON value taken from a serialized record.
    ///
    /// Scalars keep their JSON type; arrays and objects are bound as JSON.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Self::String(s.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => Self::Json(value.clone()),
        }
    }
}

impl std::fmt::Display for QueryParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
            Self::Bytes(v) => write!(f, "{}", String::from_utf8_lossy(v)),
            Self::Uuid(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{v}"),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for QueryParam {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => String,
    &str => String,
    Vec<u8> => Bytes,
    &[u8] => Bytes,
    Uuid => Uuid,
    DateTime<Utc> => Timestamp,
}

impl From<JsonValue> for QueryParam {
    fn from(v: JsonValue) -> Self {
        Self::from_json(&v)
    }
}

impl<T: Into<QueryParam>> From<Option<T>> for QueryParam {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Serialization for binary data as base64.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Serialize, Serializer};

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(QueryParam::from_json(&json!(null)), QueryParam::Null);
        assert_eq!(QueryParam::from_json(&json!(true)), QueryParam::Bool(true));
        assert_eq!(QueryParam::from_json(&json!(42)), QueryParam::Int(42));
        assert_eq!(QueryParam::from_json(&json!(1.5)), QueryParam::Float(1.5));
        assert_eq!(
            QueryParam::from_json(&json!("abc")),
            QueryParam::String("abc".to_string())
        );
    }

    #[test]
    fn test_from_json_compound_is_json() {
        let value = json!({"a": [1, 2]});
        assert_eq!(QueryParam::from_json(&value), QueryParam::Json(value));
    }

    #[test]
    fn test_from_option() {
        assert_eq!(QueryParam::from(None::<i32>), QueryParam::Null);
        assert_eq!(QueryParam::from(Some("x")), QueryParam::String("x".into()));
    }

    #[test]
    fn test_string_like() {
        assert!(QueryParam::from("a").is_string_like());
        assert!(QueryParam::from(vec![1u8]).is_string_like());
        assert!(QueryParam::from(Uuid::nil()).is_string_like());
        assert!(!QueryParam::from(1).is_string_like());
        assert!(!QueryParam::Null.is_string_like());
    }

    #[test]
    fn test_bytes_serialize_as_base64() {
        let value = serde_json::to_value(QueryParam::Bytes(b"hello".to_vec())).unwrap();
        assert_eq!(value, json!("aGVsbG8="));
    }
}
