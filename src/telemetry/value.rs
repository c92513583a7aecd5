use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::PersistError;

/// A JSON-compatible value with a closed set of shapes, used for the
/// free-form payloads stored beside a probe (assertions, audit targets,
/// audit metadata).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<AttributeValue>),
    Map(Attributes),
}

/// Ordered string-keyed map of [`AttributeValue`]s.
pub type Attributes = BTreeMap<String, AttributeValue>;

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Text(v)
    }
}

/// Encodes an optional payload to its column text. Absent stays absent;
/// it never becomes an empty string.
pub fn encode_json<T: Serialize>(
    field: &'static str,
    value: Option<&T>,
) -> Result<Option<String>, PersistError> {
    value
        .map(|v| serde_json::to_string(v).map_err(|source| PersistError::Encode { field, source }))
        .transpose()
}

/// Inverse of [`encode_json`].
pub fn decode_json<T: DeserializeOwned>(
    field: &'static str,
    column: Option<&str>,
) -> Result<Option<T>, PersistError> {
    column
        .map(|raw| serde_json::from_str(raw).map_err(|source| PersistError::Encode { field, source }))
        .transpose()
}
